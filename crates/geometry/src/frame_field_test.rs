use approx::assert_relative_eq;
use nalgebra::Vector3;

use crate::{frenet_trihedron, Acceleration, Barycentric, Vector, Velocity};

#[test]
fn test_frenet_trihedron_of_a_helix() {
    // A helix about z, at the point where it crosses the x axis.
    let velocity = Velocity::<Barycentric>::new(0.0, 3.0, 4.0);
    let acceleration = Acceleration::new(-9.0, 0.0, 0.0);
    let trihedron = frenet_trihedron(velocity, acceleration).unwrap();

    let tangent = trihedron.apply_vector(Vector::new(1.0, 0.0, 0.0));
    let normal = trihedron.apply_vector(Vector::new(0.0, 1.0, 0.0));
    let binormal = trihedron.apply_vector(Vector::new(0.0, 0.0, 1.0));
    assert_relative_eq!(tangent.coordinates(), Vector3::new(0.0, 0.6, 0.8), epsilon = 1e-15);
    assert_relative_eq!(normal.coordinates(), Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-15);
    assert_relative_eq!(binormal.coordinates(), Vector3::new(0.0, -0.8, 0.6), epsilon = 1e-15);
}

#[test]
fn test_tangential_acceleration_does_not_tilt_the_normal() {
    let velocity = Velocity::<Barycentric>::new(2.0, 0.0, 0.0);
    let trihedron = frenet_trihedron(velocity, Acceleration::new(5.0, 0.0, -1.0)).unwrap();
    let normal = trihedron.apply_vector(Vector::new(0.0, 1.0, 0.0));
    assert_relative_eq!(normal.coordinates(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-15);
}

#[test]
fn test_degenerate_trihedra() {
    let still = Velocity::<Barycentric>::zero();
    let moving = Velocity::<Barycentric>::new(1.0, 0.0, 0.0);
    assert!(frenet_trihedron(still, Acceleration::new(1.0, 0.0, 0.0)).is_none());
    assert!(frenet_trihedron(moving, Acceleration::zero()).is_none());
    assert!(frenet_trihedron(moving, Acceleration::new(-3.0, 0.0, 0.0)).is_none());
}
