use std::f64::consts::PI;

use approx::assert_relative_eq;
use geometry::Barycentric;
use nalgebra::Vector3;
use units::{Angle, GravitationalParameter, Length};

use crate::error::OrbitError;
use crate::kepler_orbit::{solve_kepler_equation, KeplerianElements};

const EARTH_MU: f64 = 3.986_004_418e14;

fn make_elements(eccentricity: f64, mean_anomaly_degrees: f64) -> KeplerianElements {
    KeplerianElements {
        eccentricity,
        semimajor_axis: Length::from_km(10_000.0),
        inclination: Angle::from_degrees(30.0),
        longitude_of_ascending_node: Angle::from_degrees(40.0),
        argument_of_periapsis: Angle::from_degrees(50.0),
        mean_anomaly: Angle::from_degrees(mean_anomaly_degrees),
    }
}

fn mu() -> GravitationalParameter {
    GravitationalParameter::from_m3_per_s2(EARTH_MU)
}

#[test]
fn test_kepler_equation() {
    for eccentricity in [0.0, 0.1, 0.5, 0.9, 0.99] {
        for mean_anomaly in [-7.0, -PI, -0.3, 0.0, 1e-6, 1.0, 3.0, PI, 20.0] {
            let eccentric_anomaly = solve_kepler_equation(mean_anomaly, eccentricity);
            assert_relative_eq!(
                eccentric_anomaly - eccentricity * eccentric_anomaly.sin(),
                mean_anomaly,
                epsilon = 1e-12
            );
        }
    }
}

#[test]
fn test_circular_orbit() {
    let elements = KeplerianElements {
        eccentricity: 0.0,
        inclination: Angle::zero(),
        longitude_of_ascending_node: Angle::zero(),
        argument_of_periapsis: Angle::zero(),
        ..make_elements(0.0, 90.0)
    };
    let state = elements.state_vectors::<Barycentric>(mu()).unwrap();
    let speed = (EARTH_MU / 1.0e7).sqrt();
    assert_relative_eq!(
        state.displacement.coordinates(),
        Vector3::new(0.0, 1.0e7, 0.0),
        epsilon = 1e-6
    );
    assert_relative_eq!(
        state.velocity.coordinates(),
        Vector3::new(-speed, 0.0, 0.0),
        epsilon = 1e-9
    );
}

#[test]
fn test_apsides() {
    let e = 0.3;
    let a = 1.0e7;
    let periapsis = make_elements(e, 0.0).state_vectors::<Barycentric>(mu()).unwrap();
    assert_relative_eq!(periapsis.displacement.norm(), a * (1.0 - e), max_relative = 1e-14);
    assert_relative_eq!(
        periapsis.velocity.norm(),
        (EARTH_MU * (1.0 + e) / (a * (1.0 - e))).sqrt(),
        max_relative = 1e-14
    );

    let apoapsis = make_elements(e, 180.0).state_vectors::<Barycentric>(mu()).unwrap();
    assert_relative_eq!(apoapsis.displacement.norm(), a * (1.0 + e), max_relative = 1e-14);
}

#[test]
fn test_energy_and_angular_momentum() {
    let e = 0.6;
    let a = 1.0e7;
    for mean_anomaly in [0.0, 45.0, 170.0, 300.0] {
        let state = make_elements(e, mean_anomaly).state_vectors::<Barycentric>(mu()).unwrap();
        let r = state.displacement.coordinates();
        let v = state.velocity.coordinates();
        let energy = v.norm_squared() / 2.0 - EARTH_MU / r.norm();
        assert_relative_eq!(energy, -EARTH_MU / (2.0 * a), max_relative = 1e-12);

        let (i, node) = (30.0_f64.to_radians(), 40.0_f64.to_radians());
        let expected = Vector3::new(node.sin() * i.sin(), -node.cos() * i.sin(), i.cos())
            * (EARTH_MU * a * (1.0 - e * e)).sqrt();
        assert_relative_eq!(r.cross(&v), expected, max_relative = 1e-12);
    }
}

#[test]
fn test_invalid_elements() {
    for e in [-0.1, 1.0, 2.0, f64::INFINITY] {
        assert_eq!(
            make_elements(e, 0.0).state_vectors::<Barycentric>(mu()).unwrap_err(),
            OrbitError::UnboundEccentricity(e)
        );
    }
    assert!(matches!(
        make_elements(f64::NAN, 0.0).validate(),
        Err(OrbitError::UnboundEccentricity(e)) if e.is_nan()
    ));
    let elements = KeplerianElements {
        semimajor_axis: Length::from_meters(-1.0),
        ..make_elements(0.1, 0.0)
    };
    assert_eq!(elements.validate(), Err(OrbitError::NonPositiveSemimajorAxis(-1.0)));
    let elements = KeplerianElements {
        mean_anomaly: Angle::from_radians(f64::INFINITY),
        ..make_elements(0.1, 0.0)
    };
    assert_eq!(elements.validate(), Err(OrbitError::NonFiniteAngle("mean anomaly")));
}
