//! Application foreground/background signals with explicit subscriptions.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

new_key_type! {
    /// Handle to a foreground/background subscription
    pub struct SubscriptionId;
}

/// Whether the application is in front of the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AppState {
    /// Active and on screen
    Foreground,
    /// Suspended or hidden by the system
    Background,
}

/// Source of application lifecycle signals.
///
/// Controllers subscribe while they want to animate and release the handle
/// when they stop. Delivery of `on_app_state_changed` to subscribers is up to
/// the event loop that owns the source.
pub trait LifecycleSource {
    /// Whether the application is currently in the foreground.
    fn is_foreground(&self) -> bool;

    /// Register interest in foreground/background changes.
    fn subscribe(&mut self) -> SubscriptionId;

    /// Release a subscription. Unknown handles are ignored.
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// A lifecycle source keeping its subscriptions in an arena.
///
/// All methods take `&self`, so one hub can be shared as `Rc<LifecycleHub>`
/// by every controller on a thread. No borrow of the arena outlives a call,
/// which lets a controller subscribe, stop or be dropped while an event is
/// being delivered.
///
/// ## Example
///
/// ```rust
/// use animated_frames::{AppState, LifecycleHub, LifecycleSource};
///
/// let mut hub = LifecycleHub::new();
/// let id = hub.subscribe();
///
/// let mut delivered = Vec::new();
/// hub.notify(AppState::Background, |id| delivered.push(id));
/// assert_eq!(delivered, vec![id]);
///
/// hub.unsubscribe(id);
/// assert_eq!(hub.subscriber_count(), 0);
/// ```
#[derive(Debug)]
pub struct LifecycleHub {
    /// Current application state
    state: Cell<AppState>,
    /// Live subscription handles
    subscriptions: RefCell<SlotMap<SubscriptionId, ()>>,
}

impl Default for LifecycleHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleHub {
    /// Create a hub for an application that starts in the foreground.
    pub fn new() -> Self {
        Self {
            state: Cell::new(AppState::Foreground),
            subscriptions: RefCell::new(SlotMap::with_key()),
        }
    }

    /// Get the current application state.
    #[inline]
    pub fn state(&self) -> AppState {
        self.state.get()
    }

    /// Record a new application state.
    ///
    /// Returns true if the state changed, meaning subscribers should be told.
    pub fn set_state(&self, state: AppState) -> bool {
        let previous = self.state.replace(state);
        if previous == state {
            return false;
        }
        tracing::debug!("Application state {:?} -> {:?}", previous, state);
        true
    }

    /// Check whether a handle is still registered.
    #[inline]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow().contains_key(id)
    }

    /// Number of live subscriptions.
    #[inline]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Snapshot of the handles that should receive the next state change.
    ///
    /// The snapshot is owned, so subscribers may come and go while it is
    /// walked.
    pub fn subscribers(&self) -> Vec<SubscriptionId> {
        self.subscriptions.borrow().keys().collect()
    }

    /// Record a new state and hand each subscriber's handle to `deliver`.
    ///
    /// Subscribers are taken from a snapshot made before the first call.
    /// Handles released during delivery are skipped, and handles added
    /// during delivery wait for the next change. Returns the number of
    /// deliveries, which is zero when the state did not change.
    pub fn notify<F>(&self, state: AppState, mut deliver: F) -> usize
    where
        F: FnMut(SubscriptionId),
    {
        if !self.set_state(state) {
            return 0;
        }

        let mut delivered = 0;
        for id in self.subscribers() {
            if !self.is_subscribed(id) {
                tracing::trace!("Skipping subscription {:?} released during delivery", id);
                continue;
            }
            deliver(id);
            delivered += 1;
        }
        delivered
    }

    fn insert(&self) -> SubscriptionId {
        self.subscriptions.borrow_mut().insert(())
    }

    fn remove(&self, id: SubscriptionId) {
        if self.subscriptions.borrow_mut().remove(id).is_none() {
            tracing::trace!("Ignoring unknown subscription {:?}", id);
        }
    }
}

impl LifecycleSource for LifecycleHub {
    fn is_foreground(&self) -> bool {
        self.state() == AppState::Foreground
    }

    fn subscribe(&mut self) -> SubscriptionId {
        self.insert()
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.remove(id)
    }
}

/// Lets several controllers on one thread share a single hub.
impl LifecycleSource for Rc<LifecycleHub> {
    fn is_foreground(&self) -> bool {
        self.state() == AppState::Foreground
    }

    fn subscribe(&mut self) -> SubscriptionId {
        self.insert()
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.remove(id)
    }
}
