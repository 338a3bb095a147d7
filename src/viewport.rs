//! Viewport height tracking
//!
//! On mobile the visible height changes when the on-screen keyboard opens
//! and closes. The editor sizes itself from [`ViewportService`], which is
//! created once by the host and passed to whoever needs it. Heights come
//! from a [`ViewportSource`], so tests can drive the service with a fake.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Snapshot of the visible viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Visible height in CSS pixels
    pub height: f64,
}

impl ViewportState {
    /// Height as a CSS length, e.g. `"640px"`
    pub fn css_height(&self) -> String {
        format!("{}px", self.height)
    }
}

/// Provides the current visible height
pub trait ViewportSource {
    fn current_height(&self) -> f64;
}

type Listener = Arc<dyn Fn(ViewportState) + Send + Sync>;

struct Inner {
    state: ViewportState,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Shared viewport state with change notifications
#[derive(Clone)]
pub struct ViewportService {
    inner: Arc<Mutex<Inner>>,
}

impl ViewportService {
    pub fn new(initial_height: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ViewportState {
                    height: initial_height,
                },
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Start from the source's current height
    pub fn from_source(source: &impl ViewportSource) -> Self {
        Self::new(source.current_height())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    /// Current viewport state
    pub fn state(&self) -> ViewportState {
        self.lock().state
    }

    /// Register a listener called with the new state after every change
    pub fn subscribe(&self, listener: impl Fn(ViewportState) + Send + Sync + 'static) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Record a new height; listeners run only if it changed.
    ///
    /// Returns whether the height changed.
    pub fn update(&self, height: f64) -> bool {
        let (state, listeners) = {
            let mut inner = self.lock();
            if inner.state.height == height {
                return false;
            }
            inner.state = ViewportState { height };
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (inner.state, listeners)
        };

        log::debug!("Viewport height changed to {}", state.height);
        // called without the lock held so listeners may subscribe or unsubscribe
        for listener in listeners {
            listener(state);
        }
        true
    }

    /// Re-read the source, e.g. from a resize or scroll event handler
    pub fn refresh(&self, source: &impl ViewportSource) -> bool {
        self.update(source.current_height())
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle returned by [`ViewportService::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<Inner>>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            lock_inner(&inner).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
