#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map viewport tracking.
//!
//! [`ViewportTracker`] receives map gesture events and, each time a pan or
//! zoom gesture completes, computes the visible [`Bounds`] and hands them to
//! every subscriber. Subscribing returns a [`Subscription`]; dropping it (or
//! calling [`Subscription::dispose`]) unregisters the listener.
//!
//! Events for gestures that are still in progress never notify. There is no
//! debouncing: each completed gesture produces exactly one notification per
//! subscriber.

pub mod bounds;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use sample_exchange_sample_models::Bounds;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use bounds::{Camera, bounds_for_camera, contains, filter_in_bounds, retain_in_bounds};

/// The kind of user gesture that moved the map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GestureKind {
    /// Drag or keyboard pan.
    Pan,
    /// Wheel, pinch, or button zoom.
    Zoom,
}

/// How far along a gesture is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GesturePhase {
    /// The gesture began.
    Started,
    /// The camera is moving.
    InProgress,
    /// The gesture ended and the camera is at rest.
    Completed,
}

/// A gesture event reported by the map widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapEvent {
    /// Which gesture.
    pub kind: GestureKind,
    /// Gesture phase.
    pub phase: GesturePhase,
    /// Camera position at the time of the event.
    pub camera: Camera,
}

type Listener = Arc<dyn Fn(Bounds) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for a registered bounds listener.
///
/// The listener stays registered until this handle is disposed or dropped.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Unregisters the listener.
    pub fn dispose(self) {
        drop(self);
    }

    /// Keeps the listener registered for the tracker's lifetime.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.remove(&self.id);
            log::trace!("Viewport listener {} disposed", self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Turns completed map gestures into bounds notifications.
#[derive(Default)]
pub struct ViewportTracker {
    registry: Arc<Mutex<Registry>>,
    current: Mutex<Option<Bounds>>,
}

impl ViewportTracker {
    /// Creates a tracker with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` to receive bounds after every completed gesture.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Bounds) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Feeds one map event into the tracker.
    ///
    /// Returns the new bounds when the event completed a gesture (after all
    /// listeners have been called), otherwise `None`. Listeners run outside
    /// the registry lock, so they may subscribe or dispose freely.
    pub fn handle_event(&self, event: &MapEvent) -> Option<Bounds> {
        if event.phase != GesturePhase::Completed {
            return None;
        }

        let bounds = bounds_for_camera(&event.camera);
        *lock(&self.current) = Some(bounds);

        let listeners: Vec<Listener> = lock(&self.registry).listeners.values().cloned().collect();
        log::debug!(
            "{} completed, notifying {} listener(s) with {bounds:?}",
            event.kind,
            listeners.len()
        );
        for listener in listeners {
            listener(bounds);
        }

        Some(bounds)
    }

    /// Bounds from the most recent completed gesture.
    #[must_use]
    pub fn current_bounds(&self) -> Option<Bounds> {
        *lock(&self.current)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}
