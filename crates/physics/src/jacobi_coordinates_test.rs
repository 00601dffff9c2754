use approx::assert_relative_eq;
use geometry::{Barycentre, Barycentric, Displacement, RelativeDegreesOfFreedom, Velocity};
use nalgebra::Vector3;
use units::{Angle, GravitationalParameter, Length};

use crate::body::MassiveBody;
use crate::error::OrbitError;
use crate::jacobi_coordinates::{HierarchicalSystem, JacobiCoordinates, SystemBody};
use crate::kepler_orbit::KeplerianElements;

const SUN_MU: f64 = 1.327_124_400_18e20;
const EARTH_MU: f64 = 3.986_004_418e14;
const MOON_MU: f64 = 4.904_869_5e12;
const VENUS_MU: f64 = 3.248_59e14;

fn gm(mu: f64) -> GravitationalParameter {
    GravitationalParameter::from_m3_per_s2(mu)
}

fn body(mu: f64) -> MassiveBody {
    MassiveBody::new(gm(mu)).unwrap()
}

fn circular(semimajor_axis: f64, mean_anomaly_degrees: f64) -> KeplerianElements {
    KeplerianElements {
        eccentricity: 0.0,
        semimajor_axis: Length::from_meters(semimajor_axis),
        inclination: Angle::zero(),
        longitude_of_ascending_node: Angle::zero(),
        argument_of_periapsis: Angle::zero(),
        mean_anomaly: Angle::from_degrees(mean_anomaly_degrees),
    }
}

fn find(
    system: &[SystemBody<&'static str, Barycentric>],
    key: &str,
) -> SystemBody<&'static str, Barycentric> {
    system.iter().find(|body| body.key == key).cloned().unwrap()
}

#[test]
fn test_bodies_are_placed_about_the_barycentre_so_far() {
    let mut jacobi = JacobiCoordinates::<Barycentric>::new(gm(3.0));
    let second = RelativeDegreesOfFreedom::new(
        Displacement::new(4.0, 0.0, 0.0),
        Velocity::new(0.0, 4.0, 0.0),
    );
    jacobi.add(gm(1.0), second);
    let third = jacobi.add(
        gm(4.0),
        RelativeDegreesOfFreedom::new(Displacement::new(0.0, 2.0, 0.0), Velocity::zero()),
    );
    assert_eq!(third.position.from_origin(), Displacement::new(1.0, 2.0, 0.0));
    assert_eq!(third.velocity, Velocity::new(0.0, 1.0, 0.0));
    assert_relative_eq!(jacobi.system_gravitational_parameter().to_m3_per_s2(), 8.0);
    let barycentre = jacobi.barycentre();
    assert_relative_eq!(barycentre.position.coordinates(), Vector3::new(1.0, 1.0, 0.0));
    assert_relative_eq!(barycentre.velocity.coordinates(), Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_keplerian_orbit_uses_the_total_gravitational_parameter() {
    let mut jacobi = JacobiCoordinates::<Barycentric>::new(gm(EARTH_MU));
    let moon = jacobi.add_keplerian(gm(MOON_MU), &circular(3.844e8, 0.0)).unwrap();
    assert_relative_eq!(moon.position.from_origin().norm(), 3.844e8, max_relative = 1e-14);
    assert_relative_eq!(
        moon.velocity.norm(),
        ((EARTH_MU + MOON_MU) / 3.844e8).sqrt(),
        max_relative = 1e-14
    );

    let hyperbolic = KeplerianElements {
        eccentricity: 1.5,
        ..circular(1.0, 0.0)
    };
    assert_eq!(
        jacobi.add_keplerian(gm(1.0), &hyperbolic),
        Err(OrbitError::UnboundEccentricity(1.5))
    );
}

#[test]
fn test_hierarchical_system() {
    let mut system = HierarchicalSystem::<&'static str, Barycentric>::new("sun", body(SUN_MU));
    system.add("earth", "sun", circular(1.496e11, 0.0), body(EARTH_MU)).unwrap();
    system.add("moon", "earth", circular(3.844e8, 90.0), body(MOON_MU)).unwrap();
    system.add("venus", "sun", circular(1.082e11, 180.0), body(VENUS_MU)).unwrap();
    assert_eq!(system.len(), 4);
    assert_eq!(system.primary(), "sun");

    let bodies = system.barycentric_system().unwrap();
    let keys: Vec<_> = bodies.iter().map(|body| body.key).collect();
    assert_eq!(keys, vec!["sun", "venus", "earth", "moon"]);
    assert_eq!(find(&bodies, "moon").parent, Some("earth"));
    assert_eq!(find(&bodies, "sun").parent, None);

    // The whole system is at rest at the origin.
    let mut barycentre = Barycentre::<Barycentric>::new();
    for body in &bodies {
        let mu = body.body.gravitational_parameter().to_m3_per_s2();
        barycentre.add(&body.degrees_of_freedom, mu);
    }
    let centre = barycentre.get().unwrap();
    assert_relative_eq!(centre.position.coordinates(), Vector3::zeros(), epsilon = 1e-3);
    assert_relative_eq!(centre.velocity.coordinates(), Vector3::zeros(), epsilon = 1e-9);

    // The moon is on its orbit about the earth.
    let earth = find(&bodies, "earth").degrees_of_freedom;
    let moon = find(&bodies, "moon").degrees_of_freedom;
    let relative = moon - earth;
    assert_relative_eq!(relative.displacement.norm(), 3.844e8, max_relative = 1e-9);
    assert_relative_eq!(
        relative.velocity.norm(),
        ((EARTH_MU + MOON_MU) / 3.844e8).sqrt(),
        max_relative = 1e-9
    );

    // The earth-moon barycentre orbits the barycentre of the sun and venus.
    let mut inner = Barycentre::<Barycentric>::new();
    inner.add(&find(&bodies, "sun").degrees_of_freedom, SUN_MU);
    inner.add(&find(&bodies, "venus").degrees_of_freedom, VENUS_MU);
    let mut outer = Barycentre::<Barycentric>::new();
    outer.add(&earth, EARTH_MU);
    outer.add(&moon, MOON_MU);
    let separation = outer.get().unwrap() - inner.get().unwrap();
    assert_relative_eq!(separation.displacement.norm(), 1.496e11, max_relative = 1e-9);
    assert_relative_eq!(
        separation.velocity.norm(),
        ((SUN_MU + VENUS_MU + EARTH_MU + MOON_MU) / 1.496e11).sqrt(),
        max_relative = 1e-9
    );
}

#[test]
fn test_hierarchical_system_errors() {
    let mut system = HierarchicalSystem::<u8, Barycentric>::new(0, body(SUN_MU));
    assert_eq!(
        system.add(0, 0, circular(1.0e11, 0.0), body(EARTH_MU)),
        Err(OrbitError::DuplicateBody)
    );
    assert_eq!(
        system.add(1, 7, circular(1.0e11, 0.0), body(EARTH_MU)),
        Err(OrbitError::UnknownParent)
    );
    assert_eq!(
        system.add(1, 0, circular(0.0, 0.0), body(EARTH_MU)),
        Err(OrbitError::NonPositiveSemimajorAxis(0.0))
    );
    assert!(!system.contains(&1));
    assert_eq!(system.barycentric_system().unwrap().len(), 1);
}
