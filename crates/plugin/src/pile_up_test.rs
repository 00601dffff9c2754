use std::collections::BTreeSet;

use approx::assert_relative_eq;
use geometry::{Acceleration, Barycentric, DegreesOfFreedom, Position, Velocity};
use integrators::{AdaptiveStepParameters, FixedStepParameters, SymplecticScheme};
use physics::{default_fitting_tolerance, Ephemeris, EphemerisBuilder, MassiveBody};
use units::{GravitationalParameter, Instant, Mass, Time};
use uuid::Uuid;

use crate::error::PluginError;
use crate::pile_up::{BubbleMember, PileUp};
use crate::vessel::VesselId;

const EARTH_MU: f64 = 3.986_004_418e14;
const RADIUS: f64 = 7.0e6;

fn id(n: u128) -> VesselId {
    VesselId::from(Uuid::from_u128(n))
}

fn member(tonnes: f64, acceleration: (f64, f64, f64)) -> BubbleMember {
    BubbleMember {
        mass: Mass::from_tonnes(tonnes),
        intrinsic_acceleration: Acceleration::new(acceleration.0, acceleration.1, acceleration.2),
    }
}

fn dof(position: (f64, f64, f64), velocity: (f64, f64, f64)) -> DegreesOfFreedom<Barycentric> {
    DegreesOfFreedom::new(
        Position::new(position.0, position.1, position.2),
        Velocity::new(velocity.0, velocity.1, velocity.2),
    )
}

fn make_earth_alone() -> Ephemeris<Barycentric> {
    let mut builder = EphemerisBuilder::new();
    builder.add_body(
        MassiveBody::new(GravitationalParameter::from_m3_per_s2(EARTH_MU)).unwrap(),
        DegreesOfFreedom::new(Position::origin(), Velocity::zero()),
    );
    builder
        .build(
            Instant::J2000,
            FixedStepParameters::new(SymplecticScheme::default(), Time::from_minutes(10.0))
                .unwrap(),
            default_fitting_tolerance(),
        )
        .unwrap()
}

#[test]
fn test_merge_conserves_momentum() {
    let members = [
        (id(1), member(1.0, (0.0, 0.0, 0.0)), dof((10.0, 0.0, 0.0), (1.0, 2.0, 0.0))),
        (id(2), member(3.0, (0.0, 0.0, 0.0)), dof((0.0, 4.0, 0.0), (-3.0, 0.0, 5.0))),
    ];
    let pile_up = PileUp::new(Instant::J2000, &members).unwrap();

    let expected = members.iter().fold(nalgebra::Vector3::zeros(), |momentum, (_, bubble, dof)| {
        momentum + dof.velocity.coordinates() * bubble.mass.to_kg()
    });
    let momentum = pile_up.momentum().unwrap();
    assert_relative_eq!(momentum, expected, max_relative = 1e-12);

    // The centre of mass moves with the total momentum over the total mass.
    let centre_of_mass = pile_up.centre_of_mass().unwrap();
    assert_eq!(centre_of_mass.time, Instant::J2000);
    assert_relative_eq!(
        centre_of_mass.degrees_of_freedom.velocity.coordinates(),
        expected / 4000.0,
        max_relative = 1e-12
    );
    assert_relative_eq!(pile_up.total_mass().to_kg(), 4000.0);
}

#[test]
fn test_members_keep_their_states_at_formation() {
    let members = [
        (id(1), member(2.0, (0.0, 0.0, 0.0)), dof((1.0, 2.0, 3.0), (4.0, 5.0, 6.0))),
        (id(2), member(5.0, (0.0, 0.0, 0.0)), dof((-1.0, 0.0, 7.0), (0.0, -5.0, 1.0))),
        (id(3), member(1.0, (0.0, 0.0, 0.0)), dof((0.0, 9.0, 0.0), (2.0, 2.0, 2.0))),
    ];
    let pile_up = PileUp::new(Instant::J2000, &members).unwrap();
    for (id, _, dof) in &members {
        let sample = pile_up.member_degrees_of_freedom(id).unwrap();
        assert_eq!(sample.time, Instant::J2000);
        assert_relative_eq!(
            sample.degrees_of_freedom.position.coordinates(),
            dof.position.coordinates(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            sample.degrees_of_freedom.velocity.coordinates(),
            dof.velocity.coordinates(),
            epsilon = 1e-12
        );
    }
    assert_eq!(
        pile_up.member_degrees_of_freedom(&id(4)),
        Err(PluginError::NotPiledUp(id(4)))
    );
}

#[test]
fn test_intrinsic_acceleration_is_mass_weighted() {
    let members = [
        (id(1), member(1.0, (1.0, 0.0, 0.0)), dof((0.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
        (id(2), member(3.0, (0.0, 2.0, 0.0)), dof((1.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
    ];
    let mut pile_up = PileUp::new(Instant::J2000, &members).unwrap();
    assert_relative_eq!(
        pile_up.intrinsic_acceleration().coordinates(),
        nalgebra::Vector3::new(0.25, 1.5, 0.0),
        epsilon = 1e-15
    );

    pile_up.update_member(id(2), member(3.0, (0.0, 0.0, 0.0))).unwrap();
    assert_relative_eq!(
        pile_up.intrinsic_acceleration().coordinates(),
        nalgebra::Vector3::new(0.25, 0.0, 0.0),
        epsilon = 1e-15
    );
    assert_eq!(
        pile_up.update_member(id(3), member(1.0, (0.0, 0.0, 0.0))),
        Err(PluginError::NotPiledUp(id(3)))
    );
}

#[test]
fn test_non_positive_mass_is_rejected() {
    let members = [
        (id(1), member(1.0, (0.0, 0.0, 0.0)), dof((0.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
        (id(2), member(0.0, (0.0, 0.0, 0.0)), dof((1.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
    ];
    assert_eq!(
        PileUp::new(Instant::J2000, &members).unwrap_err(),
        PluginError::NonPositiveMass(0.0)
    );
}

#[test]
fn test_membership() {
    let members = [
        (id(1), member(1.0, (0.0, 0.0, 0.0)), dof((0.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
        (id(2), member(1.0, (0.0, 0.0, 0.0)), dof((1.0, 0.0, 0.0), (0.0, 0.0, 0.0))),
    ];
    let pile_up = PileUp::new(Instant::J2000, &members).unwrap();
    assert!(pile_up.contains(&id(1)));
    assert!(!pile_up.contains(&id(3)));
    assert_eq!(pile_up.vessels().copied().collect::<Vec<_>>(), vec![id(1), id(2)]);
    assert!(pile_up.has_members(&BTreeSet::from([id(1), id(2)])));
    assert!(!pile_up.has_members(&BTreeSet::from([id(1)])));
    assert!(!pile_up.has_members(&BTreeSet::from([id(1), id(3)])));
}

#[test]
fn test_advance_moves_the_aggregate_rigidly() {
    let speed = (EARTH_MU / RADIUS).sqrt();
    let members = [
        (id(1), member(1.0, (0.0, 0.0, 0.0)), dof((RADIUS + 5.0, 0.0, 0.0), (0.0, speed, 0.0))),
        (id(2), member(1.0, (0.0, 0.0, 0.0)), dof((RADIUS - 5.0, 0.0, 0.0), (0.0, speed, 0.0))),
    ];
    let mut ephemeris = make_earth_alone();
    let mut pile_up = PileUp::new(Instant::J2000, &members).unwrap();
    let time = Instant::J2000 + Time::from_seconds(60.0);

    assert!(pile_up
        .advance_time(&mut ephemeris, time, &AdaptiveStepParameters::default())
        .unwrap());

    let centre_of_mass = pile_up.centre_of_mass().unwrap();
    assert_eq!(centre_of_mass.time, time);
    assert_relative_eq!(
        centre_of_mass.degrees_of_freedom.position.from_origin().norm(),
        RADIUS,
        max_relative = 1e-8
    );

    let first = pile_up.member_degrees_of_freedom(&id(1)).unwrap();
    let second = pile_up.member_degrees_of_freedom(&id(2)).unwrap();
    let separation = first.degrees_of_freedom.position - second.degrees_of_freedom.position;
    assert_relative_eq!(
        separation.coordinates(),
        nalgebra::Vector3::new(10.0, 0.0, 0.0),
        epsilon = 1e-6
    );
    assert_eq!(first.time, time);
}
