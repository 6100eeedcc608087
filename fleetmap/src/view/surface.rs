//! The rendering surface seam.
//!
//! [`RenderSurface`] is the narrow interface the view engine drives: sources,
//! layers, feature state, camera, projection and rendered-feature queries.
//! A browser map widget, a native renderer, or [`super::HeadlessSurface`]
//! can sit behind it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::coord::GeoPoint;

use super::geometry::{ScreenBox, ScreenPoint};

/// Vector source holding equipment tiles.
pub const EQUIPMENT_SOURCE: &str = "equipment";
/// Unclustered equipment points.
pub const LAYER_POINTS: &str = "equipment-points";
/// Cluster circles.
pub const LAYER_CLUSTERS: &str = "equipment-clusters";
/// Cluster count labels.
pub const LAYER_CLUSTER_COUNT: &str = "equipment-cluster-count";
/// GeoJSON source drawing the gesture outline.
pub const OVERLAY_SOURCE: &str = "selection-overlay";
pub const OVERLAY_FILL_LAYER: &str = "selection-overlay-fill";
pub const OVERLAY_STROKE_LAYER: &str = "selection-overlay-stroke";

/// Feature-state key toggled by selection sync.
pub const SELECTED_STATE: &str = "selected";

/// Errors reported by a surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("Source '{0}' already exists")]
    SourceExists(String),

    #[error("Source '{0}' not found")]
    SourceNotFound(String),

    #[error("Source '{source_id}' is still used by layer '{layer}'")]
    SourceInUse { source_id: String, layer: String },

    #[error("Layer '{0}' already exists")]
    LayerExists(String),

    #[error("Layer '{0}' not found")]
    LayerNotFound(String),

    #[error("Style is not loaded")]
    NotLoaded,

    #[error("Surface has been disposed")]
    Disposed,

    #[error("Renderer error: {0}")]
    Renderer(String),
}

/// Source kinds the engine creates.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Tiled vector source fetched from a URL template.
    Vector {
        tiles: Vec<String>,
        min_zoom: u8,
        max_zoom: u8,
        /// Feature property promoted to the feature id.
        promote_id: String,
    },
    /// Inline geometry.
    GeoJson { data: OverlayShape },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub id: String,
    pub kind: SourceKind,
}

impl SourceSpec {
    /// URL templates of a vector source, empty otherwise.
    pub fn tile_templates(&self) -> &[String] {
        match &self.kind {
            SourceKind::Vector { tiles, .. } => tiles,
            SourceKind::GeoJson { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Circle,
    Symbol,
    Fill,
    Line { dashed: bool },
}

/// Which features of the source a layer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerFilter {
    #[default]
    All,
    Clustered,
    Unclustered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub source_layer: Option<String>,
    pub kind: LayerKind,
    pub filter: LayerFilter,
    /// Renderer paint properties, passed through untouched.
    pub paint: BTreeMap<String, String>,
}

impl LayerSpec {
    pub fn new(id: &str, source: &str, kind: LayerKind) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            source_layer: None,
            kind,
            filter: LayerFilter::All,
            paint: BTreeMap::new(),
        }
    }

    pub fn with_source_layer(mut self, layer: &str) -> Self {
        self.source_layer = Some(layer.to_string());
        self
    }

    pub fn with_filter(mut self, filter: LayerFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_paint(mut self, key: &str, value: &str) -> Self {
        self.paint.insert(key.to_string(), value.to_string());
        self
    }
}

/// Data of the selection overlay source.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverlayShape {
    /// Empty feature collection.
    #[default]
    Empty,
    /// Closed polygon ring.
    Polygon(Vec<GeoPoint>),
}

impl OverlayShape {
    pub fn is_empty(&self) -> bool {
        matches!(self, OverlayShape::Empty)
    }
}

/// Where to look for rendered features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryRegion {
    Point(ScreenPoint),
    Box(ScreenBox),
    Viewport,
}

/// A feature the surface has currently materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    /// Promoted feature id.
    pub id: String,
    pub layer: String,
    pub position: GeoPoint,
    /// Set for cluster features.
    pub cluster_id: Option<u64>,
}

/// Renderer operations the view engine relies on.
///
/// Mutating calls follow the renderer's ordering rules: a layer needs its
/// source, and a source cannot be removed while layers use it.
pub trait RenderSurface {
    /// True once the style is loaded and sources can be queried.
    fn is_loaded(&self) -> bool;

    /// False after [`RenderSurface::dispose`].
    fn is_alive(&self) -> bool;

    fn add_source(&mut self, spec: SourceSpec) -> Result<(), SurfaceError>;
    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError>;
    fn has_source(&self, id: &str) -> bool;

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), SurfaceError>;
    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;
    fn has_layer(&self, id: &str) -> bool;

    /// Replace the data of a GeoJSON source.
    fn set_geojson(&mut self, source: &str, data: OverlayShape) -> Result<(), SurfaceError>;

    /// Features of `layers` rendered within `region`.
    fn query_rendered_features(
        &self,
        layers: &[&str],
        region: QueryRegion,
    ) -> Result<Vec<RenderedFeature>, SurfaceError>;

    fn set_feature_state(
        &mut self,
        source: &str,
        source_layer: &str,
        feature_id: &str,
        key: &str,
        value: bool,
    ) -> Result<(), SurfaceError>;

    fn project(&self, point: GeoPoint) -> ScreenPoint;
    fn unproject(&self, point: ScreenPoint) -> GeoPoint;

    fn set_pan_enabled(&mut self, enabled: bool);

    /// Ask for an animation-frame callback.
    fn request_frame(&mut self);

    fn zoom(&self) -> f64;
    fn ease_to(&mut self, center: GeoPoint, zoom: f64);

    /// Zoom at which `cluster_id` splits apart.
    fn cluster_expansion_zoom(&self, source: &str, cluster_id: u64) -> Result<f64, SurfaceError>;

    fn dispose(&mut self);
}
