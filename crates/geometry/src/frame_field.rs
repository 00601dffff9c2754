//! Orthonormal frames attached to a point of a trajectory

use nalgebra::{Matrix3, Rotation3};

use crate::frame::{Frame, Frenet};
use crate::rotation::Rotation;
use crate::vector::{Acceleration, Velocity};

/// The Frenet trihedron of a trajectory with the given `velocity` and
/// `acceleration`, as the rotation mapping its axes to `F`.
///
/// The tangent is along the velocity, the normal along the part of the
/// acceleration orthogonal to it, and the binormal completes a direct
/// basis. `None` if the velocity vanishes or if the acceleration is parallel
/// to it, since the normal is then undefined.
///
/// # Examples
///
/// ```
/// use geometry::{frenet_trihedron, Acceleration, Barycentric, Vector, Velocity};
///
/// // Counterclockwise circular motion seen from +z, at (1, 0, 0).
/// let trihedron = frenet_trihedron(
///     Velocity::<Barycentric>::new(0.0, 2.0, 0.0),
///     Acceleration::new(-4.0, 0.0, 0.0),
/// )
/// .unwrap();
/// let binormal = trihedron.apply_vector(Vector::new(0.0, 0.0, 1.0));
/// assert!((binormal.coordinates().z - 1.0).abs() < 1e-15);
/// ```
pub fn frenet_trihedron<F: Frame>(
    velocity: Velocity<F>,
    acceleration: Acceleration<F>,
) -> Option<Rotation<Frenet, F>> {
    let tangent = velocity.coordinates().try_normalize(0.0)?;
    let a = acceleration.coordinates();
    let orthogonal = a - tangent * a.dot(&tangent);
    let normal = orthogonal.try_normalize(f64::EPSILON * a.norm())?;
    let binormal = tangent.cross(&normal);
    Some(Rotation::from_matrix(Rotation3::from_matrix_unchecked(
        Matrix3::from_columns(&[tangent, normal, binormal]),
    )))
}
