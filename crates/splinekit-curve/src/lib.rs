mod node;
mod orientation;
mod segment;

pub use node::{ControlPoint, SplineNode};
pub use orientation::orientation_from_tangent;
pub use segment::{CurveSample, CurveSegment, STEP_COUNT};
pub use splinekit_base::{Error, Result, Vector3};
