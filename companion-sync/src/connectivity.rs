//! Edge-triggered online notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

type OnlineCallback = Arc<dyn Fn() + Send + Sync>;

struct MonitorInner {
    online: AtomicBool,
    subscribers: Mutex<HashMap<u64, OnlineCallback>>,
    next_id: AtomicU64,
}

/// Push-based connectivity signal, independent of any UI runtime.
///
/// Subscribers are invoked exactly once per offline→online transition.
/// Repeated online reports without an intervening offline period do not
/// re-fire. On platforms with no connectivity signal, use
/// [`ConnectivityMonitor::unavailable`]: subscribing is a safe no-op and
/// nothing ever fires.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Option<Arc<MonitorInner>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            inner: Some(Arc::new(MonitorInner {
                online: AtomicBool::new(initially_online),
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            })),
        }
    }

    /// Monitor for platforms without a connectivity signal.
    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    pub fn is_online(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.online.load(Ordering::SeqCst))
    }

    /// Registers `callback` for online transitions. Dropping the
    /// returned handle (or calling `unsubscribe`) deregisters it.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let Some(inner) = &self.inner else {
            return Subscription { registration: None };
        };

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        inner
            .subscribers
            .lock()
            .unwrap()
            .insert(id, Arc::new(callback));

        Subscription {
            registration: Some((Arc::downgrade(inner), id)),
        }
    }

    /// Feeds the current platform online state into the monitor.
    ///
    /// Only the offline→online edge notifies subscribers.
    pub fn set_online(&self, online: bool) {
        let Some(inner) = &self.inner else {
            return;
        };

        let was_online = inner.online.swap(online, Ordering::SeqCst);
        if !online || was_online {
            return;
        }

        debug!("connectivity transitioned online, notifying subscribers");
        // Snapshot so callbacks run without the subscriber lock held
        let callbacks: Vec<OnlineCallback> = inner
            .subscribers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

/// Unsubscribe handle returned by [`ConnectivityMonitor::subscribe`].
pub struct Subscription {
    registration: Option<(Weak<MonitorInner>, u64)>,
}

impl Subscription {
    /// Deregisters the callback. No further invocations occur.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some((monitor, id)) = self.registration.take() {
            if let Some(inner) = monitor.upgrade() {
                inner.subscribers.lock().unwrap().remove(&id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
