//! Outline drawn while a selection gesture is in progress.

use tracing::debug;

use crate::view::surface::{
    LayerKind, LayerSpec, OverlayShape, RenderSurface, SourceKind, SourceSpec, SurfaceError,
    OVERLAY_FILL_LAYER, OVERLAY_SOURCE, OVERLAY_STROKE_LAYER,
};

/// Single-owner handle on the overlay source and its two layers.
///
/// Acquired once, then only its data changes until [`SelectionOverlay::release`].
#[derive(Debug, Default)]
pub struct SelectionOverlay {
    acquired: bool,
}

impl SelectionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Create the source and layers. No-op when already acquired.
    pub fn acquire(&mut self, surface: &mut dyn RenderSurface) -> Result<(), SurfaceError> {
        if self.acquired {
            return Ok(());
        }

        if !surface.has_source(OVERLAY_SOURCE) {
            surface.add_source(SourceSpec {
                id: OVERLAY_SOURCE.to_string(),
                kind: SourceKind::GeoJson {
                    data: OverlayShape::Empty,
                },
            })?;
        }
        if !surface.has_layer(OVERLAY_FILL_LAYER) {
            surface.add_layer(
                LayerSpec::new(OVERLAY_FILL_LAYER, OVERLAY_SOURCE, LayerKind::Fill)
                    .with_paint("fill-color", "#3b82f6")
                    .with_paint("fill-opacity", "0.1"),
            )?;
        }
        if !surface.has_layer(OVERLAY_STROKE_LAYER) {
            surface.add_layer(
                LayerSpec::new(
                    OVERLAY_STROKE_LAYER,
                    OVERLAY_SOURCE,
                    LayerKind::Line { dashed: true },
                )
                .with_paint("line-color", "#3b82f6")
                .with_paint("line-width", "2"),
            )?;
        }

        self.acquired = true;
        Ok(())
    }

    /// Redraw the outline.
    pub fn update(
        &self,
        surface: &mut dyn RenderSurface,
        shape: OverlayShape,
    ) -> Result<(), SurfaceError> {
        if !self.acquired {
            return Err(SurfaceError::SourceNotFound(OVERLAY_SOURCE.to_string()));
        }
        surface.set_geojson(OVERLAY_SOURCE, shape)
    }

    /// Reset to an empty collection. Errors are dropped.
    pub fn clear(&self, surface: &mut dyn RenderSurface) {
        if !self.acquired || !surface.is_alive() {
            return;
        }
        if let Err(e) = surface.set_geojson(OVERLAY_SOURCE, OverlayShape::Empty) {
            debug!(error = %e, "Failed to clear selection overlay");
        }
    }

    /// Clear and remove the layers and source.
    pub fn release(&mut self, surface: &mut dyn RenderSurface) {
        if !self.acquired {
            return;
        }
        self.clear(surface);
        for id in [OVERLAY_STROKE_LAYER, OVERLAY_FILL_LAYER] {
            if let Err(e) = surface.remove_layer(id) {
                debug!(layer = id, error = %e, "Overlay layer removal failed");
            }
        }
        if let Err(e) = surface.remove_source(OVERLAY_SOURCE) {
            debug!(error = %e, "Overlay source removal failed");
        }
        self.acquired = false;
    }
}
