//! One map view mount.
//!
//! [`MapView`] owns the surface and every engine component for the lifetime
//! of the mount. Host events are forwarded to its entry points; after
//! [`MapView::unmount`] (or drop) every call is a no-op.

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigFile, ENV_PROVIDER_TOKEN};
use crate::tile::FilterCriteria;

use super::geometry::ScreenPoint;
use super::selection::{
    GestureOutcome, PointerButton, SelectionEngine, SelectionMode, SelectionOverlay, SelectionSet,
};
use super::source::{FilterChange, MapEvent, SourceState, TileSourceManager};
use super::surface::RenderSurface;
use super::sync::{FeatureStateSynchronizer, SyncOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error(
        "Map provider token is not configured. Set [map] provider_token in config.ini or {}.",
        ENV_PROVIDER_TOKEN
    )]
    MissingProviderToken,
}

/// Settings a mount needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewConfig {
    pub provider_token: Option<String>,
    /// Base URL tile templates are built from.
    pub tile_base_url: String,
}

impl MapViewConfig {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            provider_token: config.map.provider_token.clone(),
            tile_base_url: config.map.tile_base_url.clone(),
        }
    }

    /// The token, if present and not blank.
    pub fn token(&self) -> Option<&str> {
        self.provider_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

pub struct MapView {
    surface: Box<dyn RenderSurface>,
    alive: bool,
    ready: bool,
    source: TileSourceManager,
    engine: SelectionEngine,
    overlay: SelectionOverlay,
    selection: SelectionSet,
    sync: FeatureStateSynchronizer,
}

impl MapView {
    /// Take ownership of `surface`. Refuses to mount without a provider token.
    pub fn mount(
        surface: Box<dyn RenderSurface>,
        config: &MapViewConfig,
        filter: FilterCriteria,
    ) -> Result<Self, ViewError> {
        if config.token().is_none() {
            warn!("Map provider token missing, not mounting map view");
            return Err(ViewError::MissingProviderToken);
        }

        debug!(base_url = %config.tile_base_url, "Mounting map view");
        Ok(Self {
            surface,
            alive: true,
            ready: false,
            source: TileSourceManager::new(config.tile_base_url.clone(), filter),
            engine: SelectionEngine::new(),
            overlay: SelectionOverlay::new(),
            selection: SelectionSet::new(),
            sync: FeatureStateSynchronizer::new(),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.engine.mode()
    }

    pub fn source_state(&self) -> SourceState {
        self.source.state()
    }

    pub fn tile_source(&self) -> &TileSourceManager {
        &self.source
    }

    /// Style loaded: attach the tile source and acquire the overlay.
    pub fn on_surface_ready(&mut self, now: Instant) {
        if !self.alive || self.ready {
            return;
        }
        self.ready = true;

        let filter = self.source.desired_filter().clone();
        self.source.attach(self.surface.as_mut(), &filter, now);
        if let Err(e) = self.overlay.acquire(self.surface.as_mut()) {
            warn!(error = %e, "Failed to create selection overlay");
        }
        self.sync.schedule(self.surface.as_mut());
    }

    pub fn on_tiles_loaded(&mut self) {
        if self.alive {
            self.sync.schedule(self.surface.as_mut());
        }
    }

    pub fn on_frame(&mut self) -> SyncOutcome {
        if !self.alive {
            return SyncOutcome::Idle;
        }
        self.sync.on_frame(self.surface.as_mut(), &self.selection)
    }

    /// Drive timers (the rebuild retry).
    pub fn tick(&mut self, now: Instant) -> Option<FilterChange> {
        if !self.alive {
            return None;
        }
        let change = self.source.poll_retry(self.surface.as_mut(), now)?;
        if change == FilterChange::Rebuilt {
            self.sync.schedule(self.surface.as_mut());
        }
        Some(change)
    }

    pub fn set_filter(&mut self, filter: &FilterCriteria, now: Instant) -> FilterChange {
        if !self.alive {
            return FilterChange::Unchanged;
        }
        let change = self.source.apply_filter(self.surface.as_mut(), filter, now);
        if change == FilterChange::Rebuilt {
            self.sync.schedule(self.surface.as_mut());
        }
        change
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.alive {
            self.engine
                .set_mode(self.surface.as_mut(), &self.overlay, mode);
        }
    }

    pub fn pointer_down(&mut self, point: ScreenPoint, button: PointerButton) -> GestureOutcome {
        if !self.alive {
            return GestureOutcome::Ignored;
        }
        self.engine.pointer_down(self.surface.as_mut(), point, button)
    }

    pub fn pointer_move(&mut self, point: ScreenPoint) -> GestureOutcome {
        if !self.alive {
            return GestureOutcome::Ignored;
        }
        self.engine
            .pointer_move(self.surface.as_mut(), &self.overlay, point)
    }

    /// Finish a gesture; a non-empty result replaces the selection.
    pub fn pointer_up(&mut self, point: ScreenPoint) -> GestureOutcome {
        if !self.alive {
            return GestureOutcome::Ignored;
        }
        let outcome = self
            .engine
            .pointer_up(self.surface.as_mut(), &self.overlay, point);
        if let GestureOutcome::Selected(ids) = &outcome {
            self.selection.replace(ids.iter().cloned());
            self.sync.schedule(self.surface.as_mut());
        }
        outcome
    }

    pub fn escape(&mut self) -> GestureOutcome {
        if !self.alive {
            return GestureOutcome::Ignored;
        }
        self.engine.escape(self.surface.as_mut(), &self.overlay)
    }

    /// Click on the equipment layers. A point toggles its selection; a
    /// cluster zooms in and leaves the selection alone.
    pub fn click(&mut self, point: ScreenPoint) -> Option<MapEvent> {
        if !self.alive || self.engine.gesture().is_some() {
            return None;
        }
        let event = self.source.on_click(self.surface.as_mut(), point)?;
        if let MapEvent::PointActivated { id, .. } = &event {
            self.selection.toggle(id);
            self.sync.schedule(self.surface.as_mut());
        }
        Some(event)
    }

    /// Add ids to the selection. Returns how many were new.
    pub fn select_ids<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.alive {
            return 0;
        }
        let added = self.selection.add(ids);
        self.sync.schedule(self.surface.as_mut());
        added
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.alive {
            return false;
        }
        let selected = self.selection.toggle(id);
        self.sync.schedule(self.surface.as_mut());
        selected
    }

    pub fn deselect<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.alive {
            return 0;
        }
        let removed = self.selection.remove(ids);
        self.sync.schedule(self.surface.as_mut());
        removed
    }

    pub fn clear_selection(&mut self) {
        if !self.alive {
            return;
        }
        self.selection.clear();
        self.sync.schedule(self.surface.as_mut());
    }

    /// Tear down layers and overlay, then dispose the surface.
    pub fn unmount(&mut self) {
        if !self.alive {
            return;
        }
        self.engine
            .set_mode(self.surface.as_mut(), &self.overlay, SelectionMode::Off);
        self.overlay.release(self.surface.as_mut());
        self.source.detach(self.surface.as_mut());
        self.alive = false;
        self.surface.dispose();
        info!(selected = self.selection.len(), "Map view unmounted");
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        self.unmount();
    }
}
