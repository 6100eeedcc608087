//! Interactive map view engine.
//!
//! Drives a [`RenderSurface`] from host events: attaches the filtered
//! equipment tile source, runs box and lasso selection gestures, and keeps
//! the renderer's per-feature `selected` state in step with the
//! [`SelectionSet`].
//!
//! | Component | Role |
//! |-----------|------|
//! | [`TileSourceManager`] | Source/layer lifecycle and filter rebuilds |
//! | [`SelectionEngine`] | Box and lasso gestures |
//! | [`SelectionOverlay`] | Gesture outline |
//! | [`FeatureStateSynchronizer`] | Frame-deferred feature-state sync |
//! | [`MapView`] | Owns all of the above for one mount |
//!
//! Everything runs on the host's UI thread through `&mut self`.

mod geometry;
mod headless;
mod map_view;
pub mod selection;
mod source;
mod surface;
mod sync;

pub use geometry::{closed_ring, point_in_polygon, rectangle_ring, ScreenBox, ScreenPoint};
pub use headless::{HeadlessSurface, SurfaceOp};
pub use map_view::{MapView, MapViewConfig, ViewError};
pub use selection::{
    GestureOutcome, GesturePhase, PointerButton, SelectionEngine, SelectionMode, SelectionOverlay,
    SelectionSet,
};
pub use source::{
    FilterChange, MapEvent, SourceState, TileSourceManager, PROMOTE_ID, RETRY_DELAY,
    SOURCE_MAX_ZOOM, SOURCE_MIN_ZOOM,
};
pub use surface::{
    LayerFilter, LayerKind, LayerSpec, OverlayShape, QueryRegion, RenderSurface, RenderedFeature,
    SourceKind, SourceSpec, SurfaceError, EQUIPMENT_SOURCE, LAYER_CLUSTERS, LAYER_CLUSTER_COUNT,
    LAYER_POINTS, OVERLAY_FILL_LAYER, OVERLAY_SOURCE, OVERLAY_STROKE_LAYER, SELECTED_STATE,
};
pub use sync::{FeatureStateSynchronizer, SyncOutcome, MAX_FRAME_ATTEMPTS};
