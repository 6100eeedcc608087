//! Box and lasso gesture state machine.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::coord::GeoPoint;
use crate::view::geometry::{closed_ring, point_in_polygon, rectangle_ring, ScreenBox, ScreenPoint};
use crate::view::surface::{OverlayShape, QueryRegion, RenderSurface, RenderedFeature, LAYER_POINTS};

use super::overlay::SelectionOverlay;

/// Which gesture, if any, pointer drags perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Off,
    Box,
    Lasso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Where the engine is in the gesture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Armed(SelectionMode),
    Dragging(SelectionMode),
}

/// In-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    pub anchor: ScreenPoint,
    pub current: ScreenPoint,
    /// Geographic path, starting at the anchor.
    pub path: Vec<GeoPoint>,
}

/// Result of a pointer or keyboard event.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    Started,
    Updated,
    /// Gesture resolved to these ids; they replace the selection.
    Selected(Vec<String>),
    /// Gesture ended without a usable result.
    Unchanged,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct SelectionEngine {
    mode: SelectionMode,
    gesture: Option<GestureState>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn gesture(&self) -> Option<&GestureState> {
        self.gesture.as_ref()
    }

    pub fn phase(&self) -> GesturePhase {
        match (self.mode, &self.gesture) {
            (SelectionMode::Off, _) => GesturePhase::Idle,
            (mode, None) => GesturePhase::Armed(mode),
            (mode, Some(_)) => GesturePhase::Dragging(mode),
        }
    }

    /// Arm a mode. Any gesture in progress is cancelled first.
    pub fn set_mode(
        &mut self,
        surface: &mut dyn RenderSurface,
        overlay: &SelectionOverlay,
        mode: SelectionMode,
    ) {
        if self.gesture.is_some() {
            self.finish(surface, overlay);
        }
        self.mode = mode;
    }

    pub fn pointer_down(
        &mut self,
        surface: &mut dyn RenderSurface,
        point: ScreenPoint,
        button: PointerButton,
    ) -> GestureOutcome {
        if self.mode == SelectionMode::Off || button != PointerButton::Primary {
            return GestureOutcome::Ignored;
        }

        self.gesture = Some(GestureState {
            anchor: point,
            current: point,
            path: vec![surface.unproject(point)],
        });
        surface.set_pan_enabled(false);
        GestureOutcome::Started
    }

    pub fn pointer_move(
        &mut self,
        surface: &mut dyn RenderSurface,
        overlay: &SelectionOverlay,
        point: ScreenPoint,
    ) -> GestureOutcome {
        let Some(gesture) = self.gesture.as_mut() else {
            return GestureOutcome::Ignored;
        };

        gesture.current = point;
        let geo = surface.unproject(point);
        let shape = match self.mode {
            SelectionMode::Box => {
                let anchor = surface.unproject(gesture.anchor);
                Some(OverlayShape::Polygon(rectangle_ring(anchor, geo)))
            }
            SelectionMode::Lasso => {
                gesture.path.push(geo);
                (gesture.path.len() >= 2).then(|| OverlayShape::Polygon(closed_ring(&gesture.path)))
            }
            SelectionMode::Off => None,
        };

        if let Some(shape) = shape {
            if let Err(e) = overlay.update(surface, shape) {
                debug!(error = %e, "Failed to redraw selection overlay");
            }
        }
        GestureOutcome::Updated
    }

    pub fn pointer_up(
        &mut self,
        surface: &mut dyn RenderSurface,
        overlay: &SelectionOverlay,
        point: ScreenPoint,
    ) -> GestureOutcome {
        let Some(mut gesture) = self.gesture.take() else {
            return GestureOutcome::Ignored;
        };
        gesture.current = point;

        let ids = match self.mode {
            SelectionMode::Box => Self::resolve_box(surface, &gesture),
            SelectionMode::Lasso => Self::resolve_lasso(surface, &gesture),
            SelectionMode::Off => Vec::new(),
        };

        self.finish(surface, overlay);

        if ids.is_empty() {
            GestureOutcome::Unchanged
        } else {
            debug!(mode = ?self.mode, count = ids.len(), "Gesture selected equipment");
            GestureOutcome::Selected(ids)
        }
    }

    /// Abort a gesture without touching the selection.
    pub fn escape(
        &mut self,
        surface: &mut dyn RenderSurface,
        overlay: &SelectionOverlay,
    ) -> GestureOutcome {
        if self.gesture.is_none() {
            return GestureOutcome::Ignored;
        }
        self.finish(surface, overlay);
        GestureOutcome::Cancelled
    }

    fn finish(&mut self, surface: &mut dyn RenderSurface, overlay: &SelectionOverlay) {
        self.gesture = None;
        overlay.clear(surface);
        surface.set_pan_enabled(true);
    }

    fn resolve_box(surface: &dyn RenderSurface, gesture: &GestureState) -> Vec<String> {
        let bounds = ScreenBox::from_corners(gesture.anchor, gesture.current);
        if bounds.is_degenerate() {
            return Vec::new();
        }
        match surface.query_rendered_features(&[LAYER_POINTS], QueryRegion::Box(bounds)) {
            Ok(features) => unique_feature_ids(features.iter()),
            Err(e) => {
                warn!(error = %e, "Box selection query failed");
                Vec::new()
            }
        }
    }

    fn resolve_lasso(surface: &dyn RenderSurface, gesture: &GestureState) -> Vec<String> {
        if gesture.path.len() <= 2 {
            return Vec::new();
        }
        match surface.query_rendered_features(&[LAYER_POINTS], QueryRegion::Viewport) {
            Ok(features) => unique_feature_ids(
                features
                    .iter()
                    .filter(|f| point_in_polygon(f.position, &gesture.path)),
            ),
            Err(e) => {
                warn!(error = %e, "Lasso selection query failed");
                Vec::new()
            }
        }
    }
}

/// Feature ids in render order; a feature split across tiles appears once.
fn unique_feature_ids<'a>(features: impl Iterator<Item = &'a RenderedFeature>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ids = Vec::new();
    for feature in features {
        if seen.insert(feature.id.as_str()) {
            ids.push(feature.id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::headless::HeadlessSurface;
    use crate::view::surface::{
        LayerKind, LayerSpec, SourceKind, SourceSpec, OVERLAY_SOURCE,
    };

    fn setup() -> (HeadlessSurface, HeadlessSurface, SelectionOverlay) {
        let handle = HeadlessSurface::pixel_aligned(200.0, 200.0);
        let mut surface = handle.clone();
        surface
            .add_source(SourceSpec {
                id: "equipment".to_string(),
                kind: SourceKind::GeoJson {
                    data: OverlayShape::Empty,
                },
            })
            .unwrap();
        surface
            .add_layer(LayerSpec::new(LAYER_POINTS, "equipment", LayerKind::Circle))
            .unwrap();

        let mut overlay = SelectionOverlay::new();
        overlay.acquire(&mut surface).unwrap();

        handle.render_point("a", ScreenPoint::new(10.0, 10.0));
        handle.render_point("b", ScreenPoint::new(50.0, 50.0));
        handle.render_point("c", ScreenPoint::new(90.0, 90.0));
        (handle, surface, overlay)
    }

    fn drag(
        engine: &mut SelectionEngine,
        surface: &mut dyn RenderSurface,
        overlay: &SelectionOverlay,
        points: &[(f64, f64)],
    ) -> GestureOutcome {
        let (first, rest) = points.split_first().unwrap();
        engine.pointer_down(surface, ScreenPoint::new(first.0, first.1), PointerButton::Primary);
        for (x, y) in rest {
            engine.pointer_move(surface, overlay, ScreenPoint::new(*x, *y));
        }
        let (x, y) = points[points.len() - 1];
        engine.pointer_up(surface, overlay, ScreenPoint::new(x, y))
    }

    #[test]
    fn test_off_mode_ignores_pointer() {
        let (_, mut surface, _) = setup();
        let mut engine = SelectionEngine::new();
        assert_eq!(
            engine.pointer_down(&mut surface, ScreenPoint::new(1.0, 1.0), PointerButton::Primary),
            GestureOutcome::Ignored
        );
        assert_eq!(engine.phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_secondary_button_ignored() {
        let (handle, mut surface, _) = setup();
        let mut engine = SelectionEngine::new();
        engine.mode = SelectionMode::Box;
        assert_eq!(
            engine.pointer_down(&mut surface, ScreenPoint::new(1.0, 1.0), PointerButton::Secondary),
            GestureOutcome::Ignored
        );
        assert!(handle.pan_enabled());
    }

    #[test]
    fn test_box_drag_disables_then_restores_panning() {
        let (handle, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Box);
        assert_eq!(engine.phase(), GesturePhase::Armed(SelectionMode::Box));

        engine.pointer_down(&mut surface, ScreenPoint::new(0.0, 0.0), PointerButton::Primary);
        assert!(!handle.pan_enabled());
        assert_eq!(engine.phase(), GesturePhase::Dragging(SelectionMode::Box));

        engine.pointer_move(&mut surface, &overlay, ScreenPoint::new(60.0, 60.0));
        assert!(matches!(
            handle.geojson(OVERLAY_SOURCE),
            Some(OverlayShape::Polygon(ring)) if ring.len() == 5
        ));

        let outcome = engine.pointer_up(&mut surface, &overlay, ScreenPoint::new(60.0, 60.0));
        assert_eq!(outcome, GestureOutcome::Selected(vec!["a".into(), "b".into()]));
        assert!(handle.pan_enabled());
        assert_eq!(handle.geojson(OVERLAY_SOURCE), Some(OverlayShape::Empty));
    }

    #[test]
    fn test_zero_area_box_is_unchanged() {
        let (handle, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Box);

        let outcome = drag(&mut engine, &mut surface, &overlay, &[(50.0, 50.0), (50.0, 50.0)]);
        assert_eq!(outcome, GestureOutcome::Unchanged);
        assert!(handle.pan_enabled());
    }

    #[test]
    fn test_empty_box_is_unchanged() {
        let (_, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Box);

        let outcome = drag(&mut engine, &mut surface, &overlay, &[(150.0, 150.0), (190.0, 190.0)]);
        assert_eq!(outcome, GestureOutcome::Unchanged);
    }

    #[test]
    fn test_short_lasso_is_unchanged() {
        let (_, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Lasso);

        let outcome = drag(&mut engine, &mut surface, &overlay, &[(0.0, 0.0), (100.0, 100.0)]);
        assert_eq!(outcome, GestureOutcome::Unchanged);
    }

    #[test]
    fn test_lasso_triangle() {
        let (handle, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Lasso);

        let outcome = drag(
            &mut engine,
            &mut surface,
            &overlay,
            &[(0.0, 0.0), (90.0, 0.0), (0.0, 90.0)],
        );
        assert_eq!(outcome, GestureOutcome::Selected(vec!["a".into()]));
        assert!(handle.pan_enabled());
    }

    #[test]
    fn test_escape_cancels() {
        let (handle, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Lasso);

        engine.pointer_down(&mut surface, ScreenPoint::new(0.0, 0.0), PointerButton::Primary);
        engine.pointer_move(&mut surface, &overlay, ScreenPoint::new(30.0, 0.0));

        assert_eq!(engine.escape(&mut surface, &overlay), GestureOutcome::Cancelled);
        assert!(engine.gesture().is_none());
        assert!(handle.pan_enabled());
        assert_eq!(handle.geojson(OVERLAY_SOURCE), Some(OverlayShape::Empty));
        assert_eq!(engine.escape(&mut surface, &overlay), GestureOutcome::Ignored);
    }

    #[test]
    fn test_switching_mode_cancels_gesture() {
        let (handle, mut surface, overlay) = setup();
        let mut engine = SelectionEngine::new();
        engine.set_mode(&mut surface, &overlay, SelectionMode::Box);
        engine.pointer_down(&mut surface, ScreenPoint::new(0.0, 0.0), PointerButton::Primary);

        engine.set_mode(&mut surface, &overlay, SelectionMode::Lasso);

        assert!(engine.gesture().is_none());
        assert!(handle.pan_enabled());
        assert_eq!(engine.phase(), GesturePhase::Armed(SelectionMode::Lasso));
        assert_eq!(
            engine.pointer_up(&mut surface, &overlay, ScreenPoint::new(60.0, 60.0)),
            GestureOutcome::Ignored
        );
    }

    #[test]
    fn test_unique_feature_ids() {
        let feature = |id: &str| RenderedFeature {
            id: id.to_string(),
            layer: LAYER_POINTS.to_string(),
            position: GeoPoint::default(),
            cluster_id: None,
        };
        let features = [feature("a"), feature("b"), feature("a")];
        assert_eq!(unique_feature_ids(features.iter()), vec!["a", "b"]);

        let features = [feature("c"), feature("a"), feature("c"), feature("b"), feature("a")];
        assert_eq!(unique_feature_ids(features.iter()), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_unique_feature_ids_many_duplicates() {
        let features: Vec<RenderedFeature> = (0..2000)
            .map(|i| RenderedFeature {
                id: format!("eq-{}", i % 500),
                layer: LAYER_POINTS.to_string(),
                position: GeoPoint::default(),
                cluster_id: None,
            })
            .collect();
        let ids = unique_feature_ids(features.iter());
        assert_eq!(ids.len(), 500);
        assert_eq!(ids[0], "eq-0");
        assert_eq!(ids[499], "eq-499");
    }
}
