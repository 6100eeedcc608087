//! Pushes the selection set into renderer feature state.
//!
//! Tiles render asynchronously, so a sync runs on the next animation frame
//! and keeps waiting while the style is still loading.

use tracing::{error, warn};

use super::selection::SelectionSet;
use super::surface::{
    QueryRegion, RenderSurface, EQUIPMENT_SOURCE, LAYER_POINTS, SELECTED_STATE,
};
use crate::tile::TILE_LAYER;

/// Frames to wait for the style before giving up.
pub const MAX_FRAME_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing pending.
    Idle,
    /// Style not loaded yet; another frame was requested.
    Waiting,
    /// Feature state written for this many rendered features.
    Applied(usize),
    GaveUp,
}

#[derive(Debug, Default)]
pub struct FeatureStateSynchronizer {
    pending: bool,
    attempts: u32,
}

impl FeatureStateSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Mark a sync pending and ask for a frame.
    pub fn schedule(&mut self, surface: &mut dyn RenderSurface) {
        if !surface.is_alive() {
            return;
        }
        self.pending = true;
        self.attempts = 0;
        surface.request_frame();
    }

    pub fn on_frame(
        &mut self,
        surface: &mut dyn RenderSurface,
        selection: &SelectionSet,
    ) -> SyncOutcome {
        if !self.pending {
            return SyncOutcome::Idle;
        }
        if !surface.is_alive() {
            self.pending = false;
            return SyncOutcome::Idle;
        }

        if !surface.is_loaded() {
            self.attempts += 1;
            if self.attempts >= MAX_FRAME_ATTEMPTS {
                warn!(attempts = self.attempts, "Style never loaded, skipping selection sync");
                self.pending = false;
                return SyncOutcome::GaveUp;
            }
            surface.request_frame();
            return SyncOutcome::Waiting;
        }

        self.pending = false;
        let features = match surface.query_rendered_features(&[LAYER_POINTS], QueryRegion::Viewport) {
            Ok(features) => features,
            Err(e) => {
                if surface.is_loaded() {
                    error!(error = %e, "Failed to query rendered equipment");
                }
                return SyncOutcome::Applied(0);
            }
        };

        let mut applied = 0;
        for feature in &features {
            let selected = selection.contains(&feature.id);
            match surface.set_feature_state(
                EQUIPMENT_SOURCE,
                TILE_LAYER,
                &feature.id,
                SELECTED_STATE,
                selected,
            ) {
                Ok(()) => applied += 1,
                Err(_) if !surface.is_loaded() => break,
                Err(e) => error!(id = %feature.id, error = %e, "Failed to set feature state"),
            }
        }
        SyncOutcome::Applied(applied)
    }
}
