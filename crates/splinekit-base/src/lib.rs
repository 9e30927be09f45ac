use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;
use uuid::Uuid;

pub use cgmath::{One, Zero};

pub type Vector3 = cgmath::Vector3<f64>;
pub type Quaternion = cgmath::Quaternion<f64>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Normalizes `v`, mapping vectors with no usable length to zero instead of NaN.
pub fn normalize_or_zero(v: Vector3) -> Vector3 {
    let len = v.magnitude();
    if len <= f64::EPSILON {
        Vector3::zero()
    } else {
        v / len
    }
}

pub fn is_zero_vector(v: Vector3) -> bool {
    v.magnitude() <= f64::EPSILON
}

/// Handle returned by a subscription; unsubscribing with it removes exactly
/// that listener.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Listener = Rc<dyn Fn()>;

/// Synchronous, single-threaded change notification.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Calls every listener registered at the time of the call. The list is
    /// snapshotted first so listeners may subscribe or unsubscribe while running.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        trace!(count = listeners.len(), "dispatching change notification");
        for listener in listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(normalize_or_zero(Vector3::zero()), Vector3::zero());
        let n = normalize_or_zero(Vector3::new(3.0, 0.0, 4.0));
        assert!((n.magnitude() - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn unsubscribe_removes_only_matching_listener() {
        let notifier = ChangeNotifier::new();
        let hits = Rc::new(Cell::new(0));

        let first = {
            let hits = Rc::clone(&hits);
            notifier.subscribe(Rc::new(move || hits.set(hits.get() + 1)))
        };
        let _second = {
            let hits = Rc::clone(&hits);
            notifier.subscribe(Rc::new(move || hits.set(hits.get() + 10)))
        };

        notifier.notify();
        assert_eq!(hits.get(), 11);

        assert!(notifier.unsubscribe(first));
        assert!(!notifier.unsubscribe(first));
        assert_eq!(notifier.len(), 1);

        notifier.notify();
        assert_eq!(hits.get(), 21);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let notifier = Rc::new(ChangeNotifier::new());
        let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let id = {
            let handle = Rc::clone(&notifier);
            let slot = Rc::clone(&slot);
            notifier.subscribe(Rc::new(move || {
                if let Some(id) = slot.get() {
                    handle.unsubscribe(id);
                }
            }))
        };
        slot.set(Some(id));

        notifier.notify();
        assert!(notifier.is_empty());
    }
}
