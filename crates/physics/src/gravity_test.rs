use approx::assert_relative_eq;
use nalgebra::Vector3;
use units::{Angle, AngularFrequency, GravitationalParameter, Instant, Length, Time};

use crate::body::{MassiveBody, RotationParameters};
use crate::gravity::{
    compute_massless_acceleration, compute_mutual_accelerations, point_mass_potential_energy,
};

fn make_sphere(mu: f64) -> MassiveBody {
    MassiveBody::new(GravitationalParameter::from_m3_per_s2(mu)).unwrap()
}

fn make_oblate(mu: f64, j2: f64, radius: f64, declination_degrees: f64) -> MassiveBody {
    make_sphere(mu)
        .with_rotation(RotationParameters {
            mean_radius: Length::from_meters(radius),
            reference_angle: Angle::zero(),
            reference_instant: Instant::J2000,
            angular_frequency: AngularFrequency::from_period(Time::from_hours(10.0)),
            right_ascension_of_pole: Angle::from_degrees(30.0),
            declination_of_pole: Angle::from_degrees(declination_degrees),
        })
        .with_oblateness(j2, Length::from_meters(radius))
        .unwrap()
}

fn total_force(bodies: &[MassiveBody], accelerations: &[f64]) -> Vector3<f64> {
    bodies
        .iter()
        .zip(accelerations.chunks_exact(3))
        .map(|(body, a)| {
            Vector3::from_column_slice(a) * body.gravitational_parameter().to_m3_per_s2()
        })
        .fold(Vector3::zeros(), |acc, f| acc + f)
}

#[test]
fn test_two_point_masses() {
    let bodies = vec![make_sphere(4.0), make_sphere(1.0)];
    let positions = [0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
    let mut accelerations = [0.0; 6];
    compute_mutual_accelerations(&bodies, &positions, &mut accelerations);

    assert_relative_eq!(accelerations[1], 0.25);
    assert_relative_eq!(accelerations[4], -1.0);
    assert_eq!(accelerations[0], 0.0);
    assert_eq!(accelerations[5], 0.0);
}

#[test]
fn test_momentum_is_conserved_with_oblateness() {
    let bodies = vec![
        make_oblate(3.0e14, 1.0e-3, 6.0e6, 60.0),
        make_sphere(5.0e12),
        make_oblate(1.0e13, 5.0e-2, 2.0e6, -20.0),
        make_sphere(1.0e10),
    ];
    let positions = [
        0.0, 0.0, 0.0, //
        7.0e6, 1.0e6, 2.0e6, //
        -3.0e7, 2.0e7, -1.0e7, //
        1.0e6, -9.0e6, 4.0e6,
    ];
    let mut accelerations = [0.0; 12];
    compute_mutual_accelerations(&bodies, &positions, &mut accelerations);

    let force = total_force(&bodies, &accelerations);
    let scale: f64 = bodies
        .iter()
        .zip(accelerations.chunks_exact(3))
        .map(|(body, a)| {
            Vector3::from_column_slice(a).norm() * body.gravitational_parameter().to_m3_per_s2()
        })
        .sum();
    assert!(force.norm() < 1e-13 * scale);
}

#[test]
fn test_oblateness_on_the_equator_strengthens_gravity() {
    let oblate = make_oblate(1.0, 1.0e-2, 1.0, 90.0);
    let sphere = make_sphere(1.0);
    let position = Vector3::new(2.0, 0.0, 0.0);

    let a_oblate = compute_massless_acceleration(&[oblate], &[Vector3::zeros()], &position);
    let a_sphere = compute_massless_acceleration(&[sphere], &[Vector3::zeros()], &position);

    // -μ/r² (1 + 3/2 J2 (R/r)²) on the equator.
    assert_relative_eq!(a_sphere.x, -0.25);
    assert_relative_eq!(a_oblate.x, -0.25 * (1.0 + 1.5 * 1.0e-2 * 0.25), epsilon = 1e-15);
    assert_relative_eq!(a_oblate.z, 0.0, epsilon = 1e-18);
}

#[test]
fn test_oblateness_over_the_pole_weakens_gravity() {
    let oblate = make_oblate(1.0, 1.0e-2, 1.0, 90.0);
    let position = Vector3::new(0.0, 0.0, 2.0);
    let a = compute_massless_acceleration(&[oblate], &[Vector3::zeros()], &position);

    // -μ/r² (1 - 3 J2 (R/r)²) along the axis.
    assert_relative_eq!(a.z, -0.25 * (1.0 - 3.0 * 1.0e-2 * 0.25), epsilon = 1e-15);
}

#[test]
fn test_massless_acceleration_matches_mutual() {
    let bodies = vec![make_sphere(2.0), make_oblate(3.0, 2.0e-2, 0.5, 45.0)];
    let body_positions = [Vector3::new(1.0, 0.0, 0.0), Vector3::new(-1.0, 0.5, 0.2)];
    let probe = Vector3::new(0.3, 2.0, -0.7);

    // A very light third body sees almost the same field as a massless one.
    let mut with_probe = bodies.clone();
    with_probe.push(make_sphere(1e-300));
    let positions: Vec<f64> = body_positions
        .iter()
        .chain(std::iter::once(&probe))
        .flat_map(|q| q.iter().copied().collect::<Vec<_>>())
        .collect();
    let mut accelerations = vec![0.0; 9];
    compute_mutual_accelerations(&with_probe, &positions, &mut accelerations);

    let massless = compute_massless_acceleration(&bodies, &body_positions, &probe);
    for k in 0..3 {
        assert_relative_eq!(accelerations[6 + k], massless[k], max_relative = 1e-14);
    }
}

#[test]
fn test_potential_energy() {
    let bodies = vec![make_sphere(2.0), make_sphere(3.0), make_sphere(5.0)];
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];
    let energy = point_mass_potential_energy(&bodies, &positions);
    let expected = -(2.0 * 3.0 / 1.0 + 2.0 * 5.0 / 2.0 + 3.0 * 5.0 / 5.0_f64.sqrt());
    assert_relative_eq!(energy, expected, epsilon = 1e-14);
}
