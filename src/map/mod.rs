// src/map/mod.rs
// Map interaction controller: clicks and search results become location
// lookups whose results land in the info modal.

pub mod view;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::config::PageConfig;
use crate::coords::Coordinate;
use crate::location_client::LocationLookup;
use crate::markdown::MarkdownRenderer;
use view::{
    render_location_html, render_lookup_error_html, LikePlaceForm, MapView, AI_UNAVAILABLE_HTML,
    DEFAULT_CENTER, DEFAULT_ZOOM, FETCHING_POPUP, LOADING_HTML, LOCATED_ZOOM,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Idle,
    /// A lookup is in flight; `token` identifies the newest one.
    Loading { token: u64 },
    ModalOpen,
}

/// How a single lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Rendered,
    Failed,
    /// AI service not configured; no request was made.
    Unavailable,
    /// A newer lookup was issued before this one finished.
    Stale,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Position unavailable")]
    PositionUnavailable,
    #[error("Timed out")]
    Timeout,
    #[error("Geolocation not supported")]
    Unsupported,
}

pub struct MapController<V: MapView> {
    view: Mutex<V>,
    state: Mutex<MapState>,
    lookup: Arc<dyn LocationLookup>,
    renderer: Arc<dyn MarkdownRenderer>,
    config: PageConfig,
    sequence: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl<V: MapView> MapController<V> {
    pub fn new(
        mut view: V,
        lookup: Arc<dyn LocationLookup>,
        renderer: Arc<dyn MarkdownRenderer>,
        config: PageConfig,
    ) -> Self {
        view.set_view(DEFAULT_CENTER, DEFAULT_ZOOM);
        Self {
            view: Mutex::new(view),
            state: Mutex::new(MapState::Idle),
            lookup,
            renderer,
            config,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> MapState {
        *lock(&self.state)
    }

    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&lock(&self.view))
    }

    pub async fn on_map_click(&self, at: Coordinate) -> LookupOutcome {
        self.process_location(at, None).await
    }

    pub async fn on_search_result(&self, at: Coordinate, label: &str) -> LookupOutcome {
        self.process_location(at, Some(label)).await
    }

    async fn process_location(&self, at: Coordinate, label: Option<&str>) -> LookupOutcome {
        let at = at.rounded();
        let token = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.state) = MapState::Loading { token };

        {
            let mut view = lock(&self.view);
            view.open_popup(at, FETCHING_POPUP);
            view.set_modal_content(LOADING_HTML);
            view.show_like_section(None);
        }

        if !self.config.ai_configured {
            tracing::warn!("AI service is not configured; skipping location lookup");
            let mut view = lock(&self.view);
            view.close_popup();
            view.set_modal_content(AI_UNAVAILABLE_HTML);
            view.open_modal();
            *lock(&self.state) = MapState::ModalOpen;
            return LookupOutcome::Unavailable;
        }

        let result = self.lookup.lookup(at).await;

        if self.sequence.load(Ordering::SeqCst) != token {
            tracing::debug!(token, "Discarding stale location lookup result");
            return LookupOutcome::Stale;
        }

        let mut view = lock(&self.view);
        view.close_popup();
        let outcome = match &result {
            Ok(info) => {
                view.set_modal_content(&render_location_html(info, self.renderer.as_ref()));
                if self.config.authenticated && view.has_like_section() {
                    view.show_like_section(Some(&LikePlaceForm::for_location(at, label)));
                }
                LookupOutcome::Rendered
            }
            Err(e) => {
                tracing::error!(latitude = at.latitude, longitude = at.longitude, "Location lookup failed: {}", e);
                view.set_modal_content(&render_lookup_error_html(e));
                LookupOutcome::Failed
            }
        };
        view.open_modal();
        *lock(&self.state) = MapState::ModalOpen;
        outcome
    }

    /// Also invalidates any lookup still in flight so it cannot reopen the modal.
    pub fn close_modal(&self) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        let mut view = lock(&self.view);
        view.close_popup();
        view.close_modal();
        *lock(&self.state) = MapState::Idle;
    }

    /// Recenter on the user's position; failures are only logged.
    pub fn on_geolocation(&self, position: Result<Coordinate, GeolocationError>) {
        match position {
            Ok(at) => lock(&self.view).set_view(at, LOCATED_ZOOM),
            Err(e) => tracing::warn!("Geolocation failed: {}", e),
        }
    }
}
