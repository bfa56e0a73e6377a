//! Per-map state owned by the host's map lifecycle.
//!
//! One [`MapContext`] exists per live map instance. It holds the
//! near-real-time refresh timestamps of each source, the single pending
//! bearing-nudge timer and the registry of sources answering map clicks.
//! Everything is released by [`MapContext::teardown`] (or on drop), and
//! [`MapContext::teardown_source`] prunes one source when it is removed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wms_common::WmsResult;

use crate::config::RefreshPolicy;
use crate::tooltip::Tooltip;

/// The host map as seen by a layer source.
pub trait MapHandle: Send + Sync {
    /// Whether the map still has a tile source with this id.
    fn has_source(&self, source_id: &str) -> bool;

    /// Visibility of the first layer drawing from the source, or `None`
    /// when no layer uses it any more.
    fn layer_visibility(&self, source_id: &str) -> Option<bool>;

    /// Whether the user is currently drawing a shape (filter creation).
    fn is_drawing(&self) -> bool;

    /// Screen point to `[lng, lat]`.
    fn unproject(&self, point: [f64; 2]) -> [f64; 2];

    /// Reset the map bearing. Any camera change makes the host re-run its
    /// source checks, which is all this is used for.
    fn reset_bearing(&self);

    /// Drop and re-request every cached tile of the source.
    fn reload_tile_cache(&self, source_id: &str);
}

/// A click on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub lng_lat: [f64; 2],
    /// Screen position in pixels.
    pub point: [f64; 2],
}

impl ClickEvent {
    /// Degrees of longitude covered by one pixel at the click.
    pub fn resolution(&self, map: &dyn MapHandle) -> f64 {
        let left = map.unproject([self.point[0] - 1.0, self.point[1]]);
        (self.lng_lat[0] - left[0]).abs()
    }
}

/// A source that answers map clicks.
#[async_trait]
pub trait ClickHandler: Send + Sync {
    async fn on_click(&self, map: &dyn MapHandle, click: &ClickEvent) -> WmsResult<Tooltip>;

    /// Called once when the source is unregistered.
    fn on_remove(&self);
}

pub struct MapContext {
    id: Uuid,
    map: Arc<dyn MapHandle>,
    policy: RefreshPolicy,
    last_refresh: Mutex<HashMap<String, Instant>>,
    nudge: Mutex<Option<JoinHandle<()>>>,
    click_handlers: Mutex<BTreeMap<String, Arc<dyn ClickHandler>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MapContext {
    pub fn new(map: Arc<dyn MapHandle>, policy: RefreshPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            map,
            policy,
            last_refresh: Mutex::new(HashMap::new()),
            nudge: Mutex::new(None),
            click_handlers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn map(&self) -> &dyn MapHandle {
        self.map.as_ref()
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn last_refresh(&self, source_id: &str) -> Option<Instant> {
        lock(&self.last_refresh).get(source_id).copied()
    }

    pub fn record_refresh(&self, source_id: &str, at: Instant) {
        lock(&self.last_refresh).insert(source_id.to_string(), at);
    }

    /// Schedule the one-shot bearing nudge unless one is already pending.
    ///
    /// Returns whether a new timer was armed. Outside a Tokio runtime no
    /// timer can be scheduled and the call is a no-op.
    pub fn arm_nudge(&self) -> bool {
        let mut slot = lock(&self.nudge);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(map_id = %self.id, "No async runtime, refresh nudge not scheduled");
            return false;
        };

        let map = Arc::clone(&self.map);
        let delay = self.policy.nudge_delay;
        let map_id = self.id;
        debug!(map_id = %map_id, delay_ms = delay.as_millis() as u64, "Setting refresh timer");
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            info!(map_id = %map_id, "Sending refresh nudge");
            map.reset_bearing();
        }));
        true
    }

    /// Whether a nudge is scheduled and has not fired yet.
    pub fn nudge_pending(&self) -> bool {
        lock(&self.nudge)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Register `handler` for clicks under `source_id`, replacing any
    /// handler previously registered for that id.
    pub fn register_click_handler(&self, source_id: &str, handler: Arc<dyn ClickHandler>) {
        let mut handlers = lock(&self.click_handlers);
        let replaced = handlers.insert(source_id.to_string(), handler);
        if replaced.is_none() {
            debug!(map_id = %self.id, source_id = %source_id, "Registered click handler");
        }
    }

    pub fn is_registered(&self, source_id: &str) -> bool {
        lock(&self.click_handlers).contains_key(source_id)
    }

    /// Dispatch a click to every registered source that is still on the
    /// map and visible.
    ///
    /// Sources whose tile source or layers have disappeared are
    /// unregistered. Nothing is dispatched while the user is drawing.
    pub async fn dispatch_click(&self, click: &ClickEvent) -> Vec<WmsResult<Tooltip>> {
        let handlers: Vec<(String, Arc<dyn ClickHandler>)> = lock(&self.click_handlers)
            .iter()
            .map(|(id, handler)| (id.clone(), Arc::clone(handler)))
            .collect();

        let drawing = self.map.is_drawing();
        let mut targets = Vec::new();
        for (source_id, handler) in handlers {
            if !self.map.has_source(&source_id) {
                debug!(source_id = %source_id, "Source removed from map, dropping click handler");
                self.unregister(&source_id);
                continue;
            }
            match self.map.layer_visibility(&source_id) {
                None => {
                    warn!(source_id = %source_id, "Orphaned source, dropping click handler");
                    self.unregister(&source_id);
                }
                Some(true) if !drawing => targets.push(handler),
                Some(_) => {}
            }
        }

        let map = self.map.as_ref();
        join_all(targets.iter().map(|handler| handler.on_click(map, click))).await
    }

    fn unregister(&self, source_id: &str) {
        let removed = lock(&self.click_handlers).remove(source_id);
        if let Some(handler) = removed {
            handler.on_remove();
        }
    }

    /// Forget everything held for one source.
    pub fn teardown_source(&self, source_id: &str) {
        lock(&self.last_refresh).remove(source_id);
        self.unregister(source_id);
    }

    /// Cancel the pending nudge and release every source.
    pub fn teardown(&self) {
        if let Some(handle) = lock(&self.nudge).take() {
            handle.abort();
        }
        lock(&self.last_refresh).clear();
        let handlers = std::mem::take(&mut *lock(&self.click_handlers));
        for handler in handlers.into_values() {
            handler.on_remove();
        }
        info!(map_id = %self.id, "Map context torn down");
    }
}

impl Drop for MapContext {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.nudge).take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory map for tests.
    #[derive(Default)]
    pub struct FakeMap {
        pub sources: Mutex<HashSet<String>>,
        pub visibility: Mutex<HashMap<String, bool>>,
        pub drawing: AtomicBool,
        pub bearing_resets: AtomicUsize,
        pub reloads: Mutex<Vec<String>>,
    }

    impl FakeMap {
        pub fn with_visible_source(source_id: &str) -> Arc<Self> {
            let map = Self::default();
            map.add_source(source_id, true);
            Arc::new(map)
        }

        pub fn add_source(&self, source_id: &str, visible: bool) {
            lock(&self.sources).insert(source_id.to_string());
            lock(&self.visibility).insert(source_id.to_string(), visible);
        }

        pub fn resets(&self) -> usize {
            self.bearing_resets.load(Ordering::SeqCst)
        }
    }

    impl MapHandle for FakeMap {
        fn has_source(&self, source_id: &str) -> bool {
            lock(&self.sources).contains(source_id)
        }

        fn layer_visibility(&self, source_id: &str) -> Option<bool> {
            lock(&self.visibility).get(source_id).copied()
        }

        fn is_drawing(&self) -> bool {
            self.drawing.load(Ordering::SeqCst)
        }

        fn unproject(&self, point: [f64; 2]) -> [f64; 2] {
            // 0.01 degrees per pixel, origin at (0, 0)
            [point[0] * 0.01, -point[1] * 0.01]
        }

        fn reset_bearing(&self) {
            self.bearing_resets.fetch_add(1, Ordering::SeqCst);
        }

        fn reload_tile_cache(&self, source_id: &str) {
            lock(&self.reloads).push(source_id.to_string());
        }
    }
}
