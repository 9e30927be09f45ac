use cgmath::{InnerSpace, VectorSpace};
use serde::{Deserialize, Serialize};
use splinekit_base::{
    ChangeNotifier, Error, Listener, Result, SubscriptionId, Vector3, normalize_or_zero,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::node::ControlPoint;

/// Number of parametric steps used to discretize a segment. The table holds
/// one extra sample for `t = 1`.
pub const STEP_COUNT: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveSample {
    pub location: Vector3,
    pub tangent: Vector3,
    /// Distance travelled along the curve from its start.
    pub distance: f64,
}

/// Immutable arc-length table. A rebuild publishes a whole new table.
#[derive(Clone, Debug)]
struct SampleTable {
    samples: Rc<[CurveSample]>,
    length: f64,
}

impl SampleTable {
    fn empty() -> Self {
        Self {
            samples: Rc::from(Vec::new()),
            length: 0.0,
        }
    }

    fn sample_at_distance(&self, d: f64) -> Result<CurveSample> {
        if !(0.0..=self.length).contains(&d) {
            return Err(Error::InvalidArgument(format!(
                "distance must be between 0 and the curve length {}, got {d}",
                self.length
            )));
        }

        let Some(next_index) = self.samples.iter().position(|s| s.distance >= d) else {
            return Err(Error::InternalInvariant(format!(
                "no curve sample found for distance {d} ({} samples)",
                self.samples.len()
            )));
        };
        let next = &self.samples[next_index];
        let previous = &self.samples[next_index.saturating_sub(1)];

        let fraction = if next_index == 0 {
            0.0
        } else {
            (d - previous.distance) / (next.distance - previous.distance)
        };

        Ok(CurveSample {
            location: previous.location.lerp(next.location, fraction),
            tangent: normalize_or_zero(previous.tangent.lerp(next.tangent, fraction)),
            distance: d,
        })
    }
}

/// The four Bezier control points read from the bound nodes at one instant.
#[derive(Clone, Copy, Debug)]
struct Controls {
    p0: Vector3,
    h0: Vector3,
    h1: Vector3,
    p1: Vector3,
}

impl Controls {
    fn read(start: &dyn ControlPoint, end: &dyn ControlPoint) -> Self {
        Self {
            p0: start.position(),
            h0: start.tangent_handle(),
            h1: inverse_direction(end),
            p1: end.position(),
        }
    }

    fn location(&self, t: f64) -> Vector3 {
        let omt = 1.0 - t;
        let omt2 = omt * omt;
        let t2 = t * t;
        self.p0 * (omt2 * omt)
            + self.h0 * (3.0 * omt2 * t)
            + self.h1 * (3.0 * omt * t2)
            + self.p1 * (t2 * t)
    }

    fn derivative(&self, t: f64) -> Vector3 {
        let omt = 1.0 - t;
        ((self.h0 - self.p0) * (omt * omt)
            + (self.h1 - self.h0) * (2.0 * omt * t)
            + (self.p1 - self.h1) * (t * t))
            * 3.0
    }

    fn tangent(&self, t: f64) -> Vector3 {
        normalize_or_zero(self.derivative(t))
    }

    fn sample_table(&self) -> SampleTable {
        let mut samples = Vec::with_capacity(STEP_COUNT + 1);
        let mut length = 0.0;
        let mut previous = self.location(0.0);
        for step in 0..=STEP_COUNT {
            let t = step as f64 / STEP_COUNT as f64;
            let location = self.location(t);
            length += (location - previous).magnitude();
            samples.push(CurveSample {
                location,
                tangent: self.tangent(t),
                distance: length,
            });
            previous = location;
        }
        SampleTable {
            samples: Rc::from(samples),
            length,
        }
    }
}

/// The incoming handle at `end`: its stored outgoing handle mirrored across
/// its position.
fn inverse_direction(end: &dyn ControlPoint) -> Vector3 {
    end.position() * 2.0 - end.tangent_handle()
}

fn check_time(t: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&t) {
        return Err(Error::InvalidArgument(format!(
            "time must be between 0 and 1, got {t}"
        )));
    }
    Ok(())
}

struct Binding {
    node: Rc<dyn ControlPoint>,
    subscription: SubscriptionId,
}

impl Binding {
    fn attach(node: Rc<dyn ControlPoint>, state: &Weak<SegmentState>) -> Self {
        let subscription = node.subscribe(recompute_listener(state));
        Self { node, subscription }
    }

    fn detach(&self) {
        self.node.unsubscribe(self.subscription);
    }
}

fn recompute_listener(state: &Weak<SegmentState>) -> Listener {
    let state = state.clone();
    Rc::new(move || {
        if let Some(state) = state.upgrade() {
            state.recompute();
        }
    })
}

struct SegmentState {
    start: RefCell<Binding>,
    end: RefCell<Binding>,
    table: RefCell<SampleTable>,
    changed: ChangeNotifier,
    recomputing: Cell<bool>,
    pending: Cell<bool>,
}

impl SegmentState {
    fn controls(&self) -> Controls {
        let start = self.start.borrow();
        let end = self.end.borrow();
        Controls::read(start.node.as_ref(), end.node.as_ref())
    }

    fn table(&self) -> SampleTable {
        self.table.borrow().clone()
    }

    fn recompute(&self) {
        if self.recomputing.get() {
            debug!("curve recompute requested while one is running; deferring");
            self.pending.set(true);
            return;
        }

        self.recomputing.set(true);
        loop {
            self.pending.set(false);
            let table = self.controls().sample_table();
            debug!(
                length = table.length,
                samples = table.samples.len(),
                "rebuilt curve sample table"
            );
            *self.table.borrow_mut() = table;
            self.changed.notify();
            if !self.pending.get() {
                break;
            }
        }
        self.recomputing.set(false);
    }

    fn rebind(&self, side: &RefCell<Binding>, node: Rc<dyn ControlPoint>, this: &Weak<Self>) {
        {
            let mut binding = side.borrow_mut();
            binding.detach();
            *binding = Binding::attach(node, this);
        }
        self.recompute();
    }
}

impl Drop for SegmentState {
    fn drop(&mut self) {
        self.start.get_mut().detach();
        self.end.get_mut().detach();
    }
}

/// A cubic Bezier segment between two control points, with a cached
/// arc-length table that follows the points as they change.
///
/// The segment subscribes to both nodes and rebuilds its table whenever either
/// notifies; subscribers of the segment are notified after every rebuild.
pub struct CurveSegment {
    state: Rc<SegmentState>,
}

impl CurveSegment {
    pub fn new(start: Rc<dyn ControlPoint>, end: Rc<dyn ControlPoint>) -> Self {
        let state = Rc::new_cyclic(|weak| SegmentState {
            start: RefCell::new(Binding::attach(start, weak)),
            end: RefCell::new(Binding::attach(end, weak)),
            table: RefCell::new(SampleTable::empty()),
            changed: ChangeNotifier::new(),
            recomputing: Cell::new(false),
            pending: Cell::new(false),
        });
        state.recompute();
        Self { state }
    }

    pub fn start(&self) -> Rc<dyn ControlPoint> {
        Rc::clone(&self.state.start.borrow().node)
    }

    pub fn end(&self) -> Rc<dyn ControlPoint> {
        Rc::clone(&self.state.end.borrow().node)
    }

    pub fn connect_start(&self, node: Rc<dyn ControlPoint>) {
        let this = Rc::downgrade(&self.state);
        self.state.rebind(&self.state.start, node, &this);
    }

    pub fn connect_end(&self, node: Rc<dyn ControlPoint>) {
        let this = Rc::downgrade(&self.state);
        self.state.rebind(&self.state.end, node, &this);
    }

    pub fn length(&self) -> f64 {
        self.state.table.borrow().length
    }

    /// Snapshot of the current arc-length table, ordered by increasing distance.
    pub fn samples(&self) -> Rc<[CurveSample]> {
        Rc::clone(&self.state.table.borrow().samples)
    }

    pub fn inverse_direction(&self) -> Vector3 {
        inverse_direction(self.state.end.borrow().node.as_ref())
    }

    pub fn location(&self, t: f64) -> Result<Vector3> {
        check_time(t)?;
        Ok(self.state.controls().location(t))
    }

    /// Unit tangent at `t`; the zero vector where the derivative vanishes.
    pub fn tangent(&self, t: f64) -> Result<Vector3> {
        check_time(t)?;
        Ok(self.state.controls().tangent(t))
    }

    pub fn sample_at_distance(&self, d: f64) -> Result<CurveSample> {
        self.state.table().sample_at_distance(d)
    }

    pub fn location_at_distance(&self, d: f64) -> Result<Vector3> {
        Ok(self.sample_at_distance(d)?.location)
    }

    pub fn tangent_at_distance(&self, d: f64) -> Result<Vector3> {
        Ok(self.sample_at_distance(d)?.tangent)
    }

    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.state.changed.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.changed.unsubscribe(id)
    }
}

impl std::fmt::Debug for CurveSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.state.table();
        f.debug_struct("CurveSegment")
            .field("length", &table.length)
            .field("samples", &table.samples.len())
            .finish()
    }
}
