//! In-process surface without a renderer.
//!
//! Keeps sources, layers, feature state and camera in memory, enforces the
//! renderer's ordering rules, and records every mutation. The host decides
//! which features are "rendered" via [`HeadlessSurface::render_point`] and
//! [`HeadlessSurface::render_cluster`]. Handles are cheap clones sharing one
//! state, so a test can keep a handle after moving one into a view.
//!
//! Projection is linear (equirectangular) around the camera center.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::coord::GeoPoint;

use super::geometry::ScreenPoint;
use super::surface::{
    LayerSpec, OverlayShape, QueryRegion, RenderSurface, RenderedFeature, SourceKind, SourceSpec,
    SurfaceError, LAYER_CLUSTERS, LAYER_POINTS,
};

/// Pick radius for point queries, in pixels.
const CLICK_TOLERANCE_PX: f64 = 3.0;

/// A recorded surface mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AddSource(String),
    RemoveSource(String),
    AddLayer(String),
    RemoveLayer(String),
    SetData(String),
    SetFeatureState { feature_id: String, value: bool },
    EaseTo { center: GeoPoint, zoom: f64 },
}

#[derive(Debug)]
struct HeadlessState {
    width: f64,
    height: f64,
    center: GeoPoint,
    pixels_per_degree: f64,
    zoom: f64,
    loaded: bool,
    alive: bool,
    pan_enabled: bool,
    frame_requests: usize,
    sources: Vec<SourceSpec>,
    layers: Vec<LayerSpec>,
    rendered: Vec<RenderedFeature>,
    feature_state: HashMap<(String, String), bool>,
    cluster_zooms: HashMap<u64, f64>,
    failing_source_adds: usize,
    ops: Vec<SurfaceOp>,
}

impl HeadlessState {
    fn check_alive(&self) -> Result<(), SurfaceError> {
        if self.alive {
            Ok(())
        } else {
            Err(SurfaceError::Disposed)
        }
    }

    fn check_queryable(&self) -> Result<(), SurfaceError> {
        self.check_alive()?;
        if self.loaded {
            Ok(())
        } else {
            Err(SurfaceError::NotLoaded)
        }
    }

    fn project(&self, point: GeoPoint) -> ScreenPoint {
        ScreenPoint::new(
            self.width / 2.0 + (point.lon - self.center.lon) * self.pixels_per_degree,
            self.height / 2.0 - (point.lat - self.center.lat) * self.pixels_per_degree,
        )
    }

    fn unproject(&self, point: ScreenPoint) -> GeoPoint {
        GeoPoint::new(
            self.center.lon + (point.x - self.width / 2.0) / self.pixels_per_degree,
            self.center.lat - (point.y - self.height / 2.0) / self.pixels_per_degree,
        )
    }

    fn in_region(&self, position: GeoPoint, region: &QueryRegion) -> bool {
        let screen = self.project(position);
        match region {
            QueryRegion::Point(p) => {
                (screen.x - p.x).hypot(screen.y - p.y) <= CLICK_TOLERANCE_PX
            }
            QueryRegion::Box(b) => b.contains(screen),
            QueryRegion::Viewport => {
                screen.x >= 0.0
                    && screen.x <= self.width
                    && screen.y >= 0.0
                    && screen.y <= self.height
            }
        }
    }
}

/// Shared handle to an in-memory surface.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessSurface {
    /// A `width` × `height` viewport centered on `center`.
    pub fn new(width: f64, height: f64, center: GeoPoint, pixels_per_degree: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                width,
                height,
                center,
                pixels_per_degree,
                zoom: 6.0,
                loaded: true,
                alive: true,
                pan_enabled: true,
                frame_requests: 0,
                sources: Vec::new(),
                layers: Vec::new(),
                rendered: Vec::new(),
                feature_state: HashMap::new(),
                cluster_zooms: HashMap::new(),
                failing_source_adds: 0,
                ops: Vec::new(),
            })),
        }
    }

    /// One pixel per degree with screen `(x, y)` at geographic `(x, -y)`.
    pub fn pixel_aligned(width: f64, height: f64) -> Self {
        Self::new(width, height, GeoPoint::new(width / 2.0, -height / 2.0), 1.0)
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.state.lock().loaded = loaded;
    }

    /// Materialize an unclustered equipment point at a screen position.
    pub fn render_point(&self, id: &str, at: ScreenPoint) {
        let mut state = self.state.lock();
        let position = state.unproject(at);
        state.rendered.push(RenderedFeature {
            id: id.to_string(),
            layer: LAYER_POINTS.to_string(),
            position,
            cluster_id: None,
        });
    }

    /// Materialize a cluster; `expansion_zoom` of `None` makes the lookup fail.
    pub fn render_cluster(&self, cluster_id: u64, at: ScreenPoint, expansion_zoom: Option<f64>) {
        let mut state = self.state.lock();
        let position = state.unproject(at);
        state.rendered.push(RenderedFeature {
            id: format!("cluster-{}", cluster_id),
            layer: LAYER_CLUSTERS.to_string(),
            position,
            cluster_id: Some(cluster_id),
        });
        if let Some(zoom) = expansion_zoom {
            state.cluster_zooms.insert(cluster_id, zoom);
        }
    }

    pub fn clear_rendered(&self) {
        self.state.lock().rendered.clear();
    }

    /// Make the next `count` `add_source` calls fail.
    pub fn fail_next_source_adds(&self, count: usize) {
        self.state.lock().failing_source_adds = count;
    }

    pub fn operations(&self) -> Vec<SurfaceOp> {
        self.state.lock().ops.clone()
    }

    pub fn count_ops(&self, op: &SurfaceOp) -> usize {
        self.state.lock().ops.iter().filter(|o| *o == op).count()
    }

    pub fn clear_operations(&self) {
        self.state.lock().ops.clear();
    }

    pub fn source(&self, id: &str) -> Option<SourceSpec> {
        self.state.lock().sources.iter().find(|s| s.id == id).cloned()
    }

    /// Layer ids in stacking order.
    pub fn layer_ids(&self) -> Vec<String> {
        self.state.lock().layers.iter().map(|l| l.id.clone()).collect()
    }

    /// Current data of a GeoJSON source.
    pub fn geojson(&self, source: &str) -> Option<OverlayShape> {
        self.source(source).and_then(|s| match s.kind {
            SourceKind::GeoJson { data } => Some(data),
            SourceKind::Vector { .. } => None,
        })
    }

    pub fn feature_state(&self, source: &str, feature_id: &str) -> Option<bool> {
        self.state
            .lock()
            .feature_state
            .get(&(source.to_string(), feature_id.to_string()))
            .copied()
    }

    pub fn pan_enabled(&self) -> bool {
        self.state.lock().pan_enabled
    }

    pub fn frame_requests(&self) -> usize {
        self.state.lock().frame_requests
    }

    pub fn center(&self) -> GeoPoint {
        self.state.lock().center
    }
}

impl RenderSurface for HeadlessSurface {
    fn is_loaded(&self) -> bool {
        let state = self.state.lock();
        state.alive && state.loaded
    }

    fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    fn add_source(&mut self, spec: SourceSpec) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_alive()?;
        if state.failing_source_adds > 0 {
            state.failing_source_adds -= 1;
            return Err(SurfaceError::Renderer(format!(
                "failed to create source '{}'",
                spec.id
            )));
        }
        if state.sources.iter().any(|s| s.id == spec.id) {
            return Err(SurfaceError::SourceExists(spec.id));
        }
        state.ops.push(SurfaceOp::AddSource(spec.id.clone()));
        state.sources.push(spec);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_alive()?;
        if let Some(layer) = state.layers.iter().find(|l| l.source == id) {
            return Err(SurfaceError::SourceInUse {
                source_id: id.to_string(),
                layer: layer.id.clone(),
            });
        }
        let index = state
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SurfaceError::SourceNotFound(id.to_string()))?;
        state.sources.remove(index);
        state.feature_state.retain(|(source, _), _| source != id);
        state.ops.push(SurfaceOp::RemoveSource(id.to_string()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.lock().sources.iter().any(|s| s.id == id)
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_alive()?;
        if !state.sources.iter().any(|s| s.id == spec.source) {
            return Err(SurfaceError::SourceNotFound(spec.source));
        }
        if state.layers.iter().any(|l| l.id == spec.id) {
            return Err(SurfaceError::LayerExists(spec.id));
        }
        state.ops.push(SurfaceOp::AddLayer(spec.id.clone()));
        state.layers.push(spec);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_alive()?;
        let index = state
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| SurfaceError::LayerNotFound(id.to_string()))?;
        state.layers.remove(index);
        state.ops.push(SurfaceOp::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.lock().layers.iter().any(|l| l.id == id)
    }

    fn set_geojson(&mut self, source: &str, data: OverlayShape) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_alive()?;
        let spec = state
            .sources
            .iter_mut()
            .find(|s| s.id == source)
            .ok_or_else(|| SurfaceError::SourceNotFound(source.to_string()))?;
        match &mut spec.kind {
            SourceKind::GeoJson { data: current } => *current = data,
            SourceKind::Vector { .. } => {
                return Err(SurfaceError::Renderer(format!(
                    "source '{}' is not a GeoJSON source",
                    source
                )))
            }
        }
        state.ops.push(SurfaceOp::SetData(source.to_string()));
        Ok(())
    }

    fn query_rendered_features(
        &self,
        layers: &[&str],
        region: QueryRegion,
    ) -> Result<Vec<RenderedFeature>, SurfaceError> {
        let state = self.state.lock();
        state.check_queryable()?;
        Ok(state
            .rendered
            .iter()
            .filter(|f| layers.contains(&f.layer.as_str()))
            .filter(|f| state.layers.iter().any(|l| l.id == f.layer))
            .filter(|f| state.in_region(f.position, &region))
            .cloned()
            .collect())
    }

    fn set_feature_state(
        &mut self,
        source: &str,
        _source_layer: &str,
        feature_id: &str,
        _key: &str,
        value: bool,
    ) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.check_queryable()?;
        if !state.sources.iter().any(|s| s.id == source) {
            return Err(SurfaceError::SourceNotFound(source.to_string()));
        }
        state
            .feature_state
            .insert((source.to_string(), feature_id.to_string()), value);
        state.ops.push(SurfaceOp::SetFeatureState {
            feature_id: feature_id.to_string(),
            value,
        });
        Ok(())
    }

    fn project(&self, point: GeoPoint) -> ScreenPoint {
        self.state.lock().project(point)
    }

    fn unproject(&self, point: ScreenPoint) -> GeoPoint {
        self.state.lock().unproject(point)
    }

    fn set_pan_enabled(&mut self, enabled: bool) {
        self.state.lock().pan_enabled = enabled;
    }

    fn request_frame(&mut self) {
        self.state.lock().frame_requests += 1;
    }

    fn zoom(&self) -> f64 {
        self.state.lock().zoom
    }

    fn ease_to(&mut self, center: GeoPoint, zoom: f64) {
        let mut state = self.state.lock();
        state.center = center;
        state.zoom = zoom;
        state.ops.push(SurfaceOp::EaseTo { center, zoom });
    }

    fn cluster_expansion_zoom(&self, source: &str, cluster_id: u64) -> Result<f64, SurfaceError> {
        let state = self.state.lock();
        state.check_queryable()?;
        if !state.sources.iter().any(|s| s.id == source) {
            return Err(SurfaceError::SourceNotFound(source.to_string()));
        }
        state
            .cluster_zooms
            .get(&cluster_id)
            .copied()
            .ok_or_else(|| SurfaceError::Renderer(format!("unknown cluster {}", cluster_id)))
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock();
        state.alive = false;
        state.layers.clear();
        state.sources.clear();
        state.rendered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::surface::LayerKind;

    fn geojson_source(id: &str) -> SourceSpec {
        SourceSpec {
            id: id.to_string(),
            kind: SourceKind::GeoJson {
                data: OverlayShape::Empty,
            },
        }
    }

    #[test]
    fn test_pixel_aligned_projection() {
        let surface = HeadlessSurface::pixel_aligned(200.0, 100.0);
        let geo = surface.unproject(ScreenPoint::new(10.0, 20.0));
        assert!((geo.lon - 10.0).abs() < 1e-9);
        assert!((geo.lat + 20.0).abs() < 1e-9);

        let back = surface.project(geo);
        assert!((back.x - 10.0).abs() < 1e-9);
        assert!((back.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_layer_requires_source() {
        let mut surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        let layer = LayerSpec::new("fill", "overlay", LayerKind::Fill);

        assert_eq!(
            surface.add_layer(layer.clone()),
            Err(SurfaceError::SourceNotFound("overlay".to_string()))
        );

        surface.add_source(geojson_source("overlay")).unwrap();
        surface.add_layer(layer.clone()).unwrap();
        assert_eq!(
            surface.add_layer(layer),
            Err(SurfaceError::LayerExists("fill".to_string()))
        );
    }

    #[test]
    fn test_source_in_use_cannot_be_removed() {
        let mut surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        surface.add_source(geojson_source("overlay")).unwrap();
        surface
            .add_layer(LayerSpec::new("fill", "overlay", LayerKind::Fill))
            .unwrap();

        assert!(matches!(
            surface.remove_source("overlay"),
            Err(SurfaceError::SourceInUse { .. })
        ));

        surface.remove_layer("fill").unwrap();
        surface.remove_source("overlay").unwrap();
        assert!(!surface.has_source("overlay"));
    }

    #[test]
    fn test_injected_source_failures() {
        let mut surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        surface.fail_next_source_adds(1);

        assert!(surface.add_source(geojson_source("a")).is_err());
        assert!(surface.add_source(geojson_source("a")).is_ok());
    }

    #[test]
    fn test_queries_require_loaded_style() {
        let surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        surface.set_loaded(false);
        assert_eq!(
            surface.query_rendered_features(&[LAYER_POINTS], QueryRegion::Viewport),
            Err(SurfaceError::NotLoaded)
        );
    }

    #[test]
    fn test_rendered_features_need_their_layer() {
        let mut surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        surface.render_point("a", ScreenPoint::new(10.0, 10.0));

        let none = surface
            .query_rendered_features(&[LAYER_POINTS], QueryRegion::Viewport)
            .unwrap();
        assert!(none.is_empty());

        surface.add_source(geojson_source("equipment")).unwrap();
        surface
            .add_layer(LayerSpec::new(LAYER_POINTS, "equipment", LayerKind::Circle))
            .unwrap();

        let hit = surface
            .query_rendered_features(&[LAYER_POINTS], QueryRegion::Point(ScreenPoint::new(11.0, 11.0)))
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "a");

        let miss = surface
            .query_rendered_features(&[LAYER_POINTS], QueryRegion::Point(ScreenPoint::new(30.0, 30.0)))
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn test_dispose_rejects_mutations() {
        let mut surface = HeadlessSurface::pixel_aligned(100.0, 100.0);
        let handle = surface.clone();
        surface.add_source(geojson_source("overlay")).unwrap();

        surface.dispose();

        assert!(!handle.is_alive());
        assert!(!handle.has_source("overlay"));
        assert_eq!(
            surface.add_source(geojson_source("overlay")),
            Err(SurfaceError::Disposed)
        );
    }
}
