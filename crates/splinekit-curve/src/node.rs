use splinekit_base::{ChangeNotifier, Listener, SubscriptionId, Vector3};
use std::cell::Cell;

/// An anchor a curve segment can be bound to.
///
/// `tangent_handle` is an absolute point, not an offset from `position`.
pub trait ControlPoint {
    fn position(&self) -> Vector3;
    fn tangent_handle(&self) -> Vector3;
    fn subscribe(&self, listener: Listener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Reference control point: plain storage plus change notification.
#[derive(Debug)]
pub struct SplineNode {
    position: Cell<Vector3>,
    tangent_handle: Cell<Vector3>,
    changed: ChangeNotifier,
}

impl SplineNode {
    pub fn new(position: Vector3, tangent_handle: Vector3) -> Self {
        Self {
            position: Cell::new(position),
            tangent_handle: Cell::new(tangent_handle),
            changed: ChangeNotifier::new(),
        }
    }

    pub fn set_position(&self, position: Vector3) {
        if self.position.replace(position) != position {
            self.changed.notify();
        }
    }

    pub fn set_tangent_handle(&self, tangent_handle: Vector3) {
        if self.tangent_handle.replace(tangent_handle) != tangent_handle {
            self.changed.notify();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.changed.len()
    }
}

impl ControlPoint for SplineNode {
    fn position(&self) -> Vector3 {
        self.position.get()
    }

    fn tangent_handle(&self) -> Vector3 {
        self.tangent_handle.get()
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.changed.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changed.unsubscribe(id)
    }
}
