//! Lifecycle of the equipment tile source and its layers.
//!
//! A filter change swaps the source's tile URL template, which renderers
//! only accept at creation, so the source and its three layers are torn
//! down and rebuilt. Rebuild failures get one delayed retry.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::coord::GeoPoint;
use crate::tile::{FilterCriteria, TILE_LAYER};

use super::geometry::ScreenPoint;
use super::surface::{
    LayerFilter, LayerKind, LayerSpec, QueryRegion, RenderSurface, SourceKind, SourceSpec,
    SurfaceError, EQUIPMENT_SOURCE, LAYER_CLUSTERS, LAYER_CLUSTER_COUNT, LAYER_POINTS,
};

/// Delay before the single rebuild retry.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

pub const SOURCE_MIN_ZOOM: u8 = 6;
pub const SOURCE_MAX_ZOOM: u8 = 14;

/// Tile property promoted to the feature id.
pub const PROMOTE_ID: &str = "id";

/// Layers in creation order.
const LAYERS: [&str; 3] = [LAYER_POINTS, LAYER_CLUSTERS, LAYER_CLUSTER_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Uninitialized,
    Attached,
    Rebuilding,
    Detached,
}

/// Result of [`TileSourceManager::apply_filter`] and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Same criteria as last applied.
    Unchanged,
    /// Recorded; applied when the surface becomes ready.
    Deferred,
    Rebuilt,
    RetryScheduled,
    Failed,
}

/// Map interaction produced by a click on the equipment layers.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    PointActivated { id: String, position: GeoPoint },
    ClusterExpanded { position: GeoPoint, zoom: f64 },
}

#[derive(Debug)]
pub struct TileSourceManager {
    base_url: String,
    state: SourceState,
    desired: FilterCriteria,
    applied: Option<FilterCriteria>,
    retry_at: Option<Instant>,
    rebuilds: usize,
}

impl TileSourceManager {
    pub fn new(base_url: impl Into<String>, filter: FilterCriteria) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: SourceState::Uninitialized,
            desired: filter.normalized(),
            applied: None,
            retry_at: None,
            rebuilds: 0,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Criteria the current source was built with.
    pub fn applied_filter(&self) -> Option<&FilterCriteria> {
        self.applied.as_ref()
    }

    pub fn desired_filter(&self) -> &FilterCriteria {
        &self.desired
    }

    /// Rebuilds after the initial attach.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_at.is_some()
    }

    /// `{base}/tiles/{z}/{x}/{y}` plus the filter's query string.
    pub fn tile_template(&self, filter: &FilterCriteria) -> String {
        let template = format!("{}/tiles/{{z}}/{{x}}/{{y}}", self.base_url);
        match filter.to_query_string() {
            query if query.is_empty() => template,
            query => format!("{}?{}", template, query),
        }
    }

    /// Create source and layers on first surface readiness.
    pub fn attach(
        &mut self,
        surface: &mut dyn RenderSurface,
        filter: &FilterCriteria,
        now: Instant,
    ) -> FilterChange {
        if matches!(self.state, SourceState::Attached | SourceState::Rebuilding) {
            return self.apply_filter(surface, filter, now);
        }
        self.desired = filter.clone().normalized();
        self.rebuild(surface, now, false)
    }

    /// Swap the source when the criteria differ from the applied ones.
    pub fn apply_filter(
        &mut self,
        surface: &mut dyn RenderSurface,
        filter: &FilterCriteria,
        now: Instant,
    ) -> FilterChange {
        let filter = filter.clone().normalized();

        match self.state {
            SourceState::Uninitialized | SourceState::Detached => {
                if filter == self.desired {
                    return FilterChange::Unchanged;
                }
                self.desired = filter;
                FilterChange::Deferred
            }
            SourceState::Attached | SourceState::Rebuilding => {
                if self.applied.as_ref() == Some(&filter) && self.retry_at.is_none() {
                    return FilterChange::Unchanged;
                }
                self.desired = filter;
                self.rebuild(surface, now, false)
            }
        }
    }

    /// Run a scheduled retry once its delay has elapsed.
    pub fn poll_retry(&mut self, surface: &mut dyn RenderSurface, now: Instant) -> Option<FilterChange> {
        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                Some(self.rebuild(surface, now, true))
            }
            _ => None,
        }
    }

    /// Remove layers then source.
    pub fn detach(&mut self, surface: &mut dyn RenderSurface) {
        if surface.is_alive() {
            Self::teardown(surface);
        }
        self.state = SourceState::Detached;
        self.applied = None;
        self.retry_at = None;
    }

    /// Resolve a click against clusters first, then points.
    pub fn on_click(&self, surface: &mut dyn RenderSurface, point: ScreenPoint) -> Option<MapEvent> {
        if self.state != SourceState::Attached {
            return None;
        }

        let features = match surface
            .query_rendered_features(&[LAYER_CLUSTERS, LAYER_POINTS], QueryRegion::Point(point))
        {
            Ok(features) => features,
            Err(e) => {
                debug!(error = %e, "Click query failed");
                return None;
            }
        };

        if let Some(cluster) = features.iter().find(|f| f.layer == LAYER_CLUSTERS) {
            let cluster_id = cluster.cluster_id?;
            let zoom = surface
                .cluster_expansion_zoom(EQUIPMENT_SOURCE, cluster_id)
                .unwrap_or_else(|e| {
                    debug!(cluster_id, error = %e, "No expansion zoom, stepping in one level");
                    surface.zoom() + 1.0
                });
            surface.ease_to(cluster.position, zoom);
            return Some(MapEvent::ClusterExpanded {
                position: cluster.position,
                zoom,
            });
        }

        features
            .into_iter()
            .find(|f| f.layer == LAYER_POINTS)
            .map(|f| MapEvent::PointActivated {
                id: f.id,
                position: f.position,
            })
    }

    fn rebuild(&mut self, surface: &mut dyn RenderSurface, now: Instant, is_retry: bool) -> FilterChange {
        let initial = self.state == SourceState::Uninitialized || self.state == SourceState::Detached;
        self.state = SourceState::Rebuilding;

        Self::teardown(surface);
        let filter = self.desired.clone();
        match self.build(surface, &filter) {
            Ok(()) => {
                self.state = SourceState::Attached;
                self.applied = Some(filter);
                self.retry_at = None;
                if initial {
                    info!(template = %self.tile_template(&self.desired), "Equipment tile source attached");
                } else {
                    self.rebuilds += 1;
                    info!(template = %self.tile_template(&self.desired), "Equipment tile source rebuilt");
                }
                FilterChange::Rebuilt
            }
            Err(_) if !surface.is_alive() => {
                self.state = SourceState::Detached;
                self.retry_at = None;
                FilterChange::Failed
            }
            Err(e) if !is_retry => {
                warn!(error = %e, delay_ms = RETRY_DELAY.as_millis() as u64, "Tile source rebuild failed, retrying");
                self.state = SourceState::Attached;
                self.applied = None;
                self.retry_at = Some(now + RETRY_DELAY);
                FilterChange::RetryScheduled
            }
            Err(e) => {
                error!(error = %e, "Tile source rebuild failed again, giving up");
                self.state = SourceState::Attached;
                self.applied = None;
                FilterChange::Failed
            }
        }
    }

    fn build(&self, surface: &mut dyn RenderSurface, filter: &FilterCriteria) -> Result<(), SurfaceError> {
        surface.add_source(SourceSpec {
            id: EQUIPMENT_SOURCE.to_string(),
            kind: SourceKind::Vector {
                tiles: vec![self.tile_template(filter)],
                min_zoom: SOURCE_MIN_ZOOM,
                max_zoom: SOURCE_MAX_ZOOM,
                promote_id: PROMOTE_ID.to_string(),
            },
        })?;

        surface.add_layer(
            LayerSpec::new(LAYER_POINTS, EQUIPMENT_SOURCE, LayerKind::Circle)
                .with_source_layer(TILE_LAYER)
                .with_filter(LayerFilter::Unclustered)
                .with_paint("circle-radius", "6")
                .with_paint("circle-color", "#3b82f6")
                .with_paint("circle-stroke-width", "2"),
        )?;
        surface.add_layer(
            LayerSpec::new(LAYER_CLUSTERS, EQUIPMENT_SOURCE, LayerKind::Circle)
                .with_source_layer(TILE_LAYER)
                .with_filter(LayerFilter::Clustered)
                .with_paint("circle-color", "#51bbd6"),
        )?;
        surface.add_layer(
            LayerSpec::new(LAYER_CLUSTER_COUNT, EQUIPMENT_SOURCE, LayerKind::Symbol)
                .with_source_layer(TILE_LAYER)
                .with_filter(LayerFilter::Clustered)
                .with_paint("text-color", "#fff"),
        )?;
        Ok(())
    }

    /// Remove whatever exists of the layers and source; errors are dropped.
    fn teardown(surface: &mut dyn RenderSurface) {
        for id in LAYERS.iter().rev() {
            if surface.has_layer(id) {
                if let Err(e) = surface.remove_layer(id) {
                    debug!(layer = id, error = %e, "Layer removal failed");
                }
            }
        }
        if surface.has_source(EQUIPMENT_SOURCE) {
            if let Err(e) = surface.remove_source(EQUIPMENT_SOURCE) {
                debug!(error = %e, "Source removal failed");
            }
        }
    }
}
