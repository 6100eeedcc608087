//! Integration tests for filter-driven tile source rebuilds.
//!
//! Run with: `cargo test --test tile_source_rebuild`

use std::time::Instant;

use fleetmap::tile::FilterCriteria;
use fleetmap::view::{
    FilterChange, HeadlessSurface, MapView, MapViewConfig, RenderSurface, SourceState, SurfaceOp,
    EQUIPMENT_SOURCE, LAYER_POINTS, RETRY_DELAY,
};

fn mount(filter: FilterCriteria) -> (HeadlessSurface, MapView) {
    let handle = HeadlessSurface::pixel_aligned(256.0, 256.0);
    let config = MapViewConfig {
        provider_token: Some("pk.test".to_string()),
        tile_base_url: "https://fleet.example.com/".to_string(),
    };
    let view = MapView::mount(Box::new(handle.clone()), &config, filter).expect("token is configured");
    (handle, view)
}

fn template(handle: &HeadlessSurface) -> String {
    handle
        .source(EQUIPMENT_SOURCE)
        .and_then(|s| s.tile_templates().first().cloned())
        .unwrap_or_default()
}

#[test]
fn test_first_render_builds_once() {
    let (handle, mut view) = mount(FilterCriteria::default());
    let now = Instant::now();

    view.on_surface_ready(now);
    assert_eq!(view.set_filter(&FilterCriteria::default(), now), FilterChange::Unchanged);
    view.on_surface_ready(now);

    assert_eq!(
        handle.count_ops(&SurfaceOp::AddSource(EQUIPMENT_SOURCE.to_string())),
        1
    );
    assert_eq!(view.tile_source().rebuild_count(), 0);
    assert_eq!(template(&handle), "https://fleet.example.com/tiles/{z}/{x}/{y}");
}

#[test]
fn test_status_filter_rebuilds_source_with_new_template() {
    let (handle, mut view) = mount(FilterCriteria::default());
    let now = Instant::now();
    view.on_surface_ready(now);

    let filter = FilterCriteria::default().with_status("A");
    assert_eq!(view.set_filter(&filter, now), FilterChange::Rebuilt);

    assert_eq!(view.tile_source().rebuild_count(), 1);
    assert_eq!(
        handle.count_ops(&SurfaceOp::AddSource(EQUIPMENT_SOURCE.to_string())),
        2
    );
    assert_eq!(
        handle.count_ops(&SurfaceOp::RemoveLayer(LAYER_POINTS.to_string())),
        1
    );
    assert!(template(&handle).contains("status=A"));

    // Same criteria again: nothing to do.
    assert_eq!(view.set_filter(&filter, now), FilterChange::Unchanged);
    assert_eq!(view.tile_source().rebuild_count(), 1);
}

#[test]
fn test_every_distinct_filter_rebuilds() {
    let (handle, mut view) = mount(FilterCriteria::default());
    let now = Instant::now();
    view.on_surface_ready(now);

    view.set_filter(&FilterCriteria::default().with_status("A"), now);
    view.set_filter(&FilterCriteria::default().with_status("A").with_region("North"), now);
    view.set_filter(&FilterCriteria::default(), now);

    assert_eq!(view.tile_source().rebuild_count(), 3);
    assert_eq!(template(&handle), "https://fleet.example.com/tiles/{z}/{x}/{y}");
}

#[test]
fn test_rebuild_failure_recovers_on_retry() {
    let (handle, mut view) = mount(FilterCriteria::default());
    let start = Instant::now();
    view.on_surface_ready(start);

    handle.fail_next_source_adds(1);
    let filter = FilterCriteria::default().with_kind("crane");
    assert_eq!(view.set_filter(&filter, start), FilterChange::RetryScheduled);
    assert!(!handle.has_source(EQUIPMENT_SOURCE));

    assert_eq!(view.tick(start), None);
    assert_eq!(view.tick(start + RETRY_DELAY), Some(FilterChange::Rebuilt));

    assert_eq!(view.source_state(), SourceState::Attached);
    assert!(template(&handle).ends_with("?type=crane"));
}

#[test]
fn test_unmount_detaches_source() {
    let (handle, mut view) = mount(FilterCriteria::default().with_status("A"));
    view.on_surface_ready(Instant::now());
    assert!(template(&handle).contains("status=A"));

    view.unmount();

    assert_eq!(view.source_state(), SourceState::Detached);
    assert!(!handle.has_source(EQUIPMENT_SOURCE));
    assert!(!handle.is_alive());
}
