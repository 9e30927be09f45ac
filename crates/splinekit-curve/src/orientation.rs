use cgmath::{InnerSpace, Matrix3};
use splinekit_base::{One, Quaternion, Vector3, is_zero_vector};

/// Rotation taking local +Z onto `tangent`, with local +Y kept as close to
/// global up (+Y) as the tangent allows.
///
/// A zero tangent gives the identity. A vertical tangent has no unique up, so
/// global +X (made perpendicular to the tangent) is used as the side axis.
pub fn orientation_from_tangent(tangent: Vector3) -> Quaternion {
    if is_zero_vector(tangent) {
        return Quaternion::one();
    }

    let forward = tangent.normalize();
    let mut side = Vector3::unit_y().cross(forward);
    if is_zero_vector(side) {
        let x = Vector3::unit_x();
        side = x - forward * forward.dot(x);
    }
    let side = side.normalize();
    let up = forward.cross(side);

    Quaternion::from(Matrix3::from_cols(side, up, forward))
}
