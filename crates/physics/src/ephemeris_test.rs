use approx::assert_relative_eq;
use geometry::{Acceleration, Barycentric, DegreesOfFreedom, Position, Velocity};
use integrators::{AdaptiveStepParameters, FixedStepParameters, SymplecticScheme};
use units::{Angle, AngularFrequency, GravitationalParameter, Instant, Length, Speed, Time};

use crate::body::{BodyIndex, MassiveBody, RotationParameters};
use crate::discrete_trajectory::{DiscreteTrajectoryTree, Sample};
use crate::ephemeris::{
    default_fitting_tolerance, Ephemeris, EphemerisBuilder, EphemerisMessage,
    UNLIMITED_MAX_EPHEMERIS_STEPS,
};
use crate::error::EphemerisError;

const SUN_MU: f64 = 1.327_124_400_18e20;
const EARTH_MU: f64 = 3.986_004_418e14;
const AU: f64 = 1.495_978_707e11;

fn at(seconds: f64) -> Instant {
    Instant::J2000 + Time::from_seconds(seconds)
}

fn no_thrust(_: Instant) -> Acceleration<Barycentric> {
    Acceleration::zero()
}

fn make_earth() -> MassiveBody {
    MassiveBody::new(GravitationalParameter::from_m3_per_s2(EARTH_MU))
        .unwrap()
        .with_rotation(RotationParameters {
            mean_radius: Length::from_km(6_371.0),
            reference_angle: Angle::zero(),
            reference_instant: Instant::J2000,
            angular_frequency: AngularFrequency::from_period(Time::from_hours(23.934)),
            right_ascension_of_pole: Angle::zero(),
            declination_of_pole: Angle::from_degrees(66.56),
        })
        .with_oblateness(1.082_63e-3, Length::from_km(6_378.137))
        .unwrap()
}

/// The Sun and an oblate Earth on a circular orbit.
fn make_sun_earth() -> Ephemeris<Barycentric> {
    let speed = ((SUN_MU + EARTH_MU) / AU).sqrt();
    let mut builder = EphemerisBuilder::new();
    builder.add_body(
        MassiveBody::new(GravitationalParameter::from_m3_per_s2(SUN_MU)).unwrap(),
        DegreesOfFreedom::new(Position::origin(), Velocity::zero()),
    );
    builder.add_body(
        make_earth(),
        DegreesOfFreedom::new(Position::new(AU, 0.0, 0.0), Velocity::new(0.0, speed, 0.0)),
    );
    builder
        .build(Instant::J2000, FixedStepParameters::default(), default_fitting_tolerance())
        .unwrap()
}

/// A single Earth at rest at the origin, with a 10 minute step.
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

fn make_adaptive(max_steps: usize) -> AdaptiveStepParameters {
    AdaptiveStepParameters::new(max_steps, Length::from_mm(1.0), Speed::from_mm_per_second(1.0))
        .unwrap()
}

fn circular_orbit(radius: f64) -> DegreesOfFreedom<Barycentric> {
    DegreesOfFreedom::new(
        Position::new(radius, 0.0, 0.0),
        Velocity::new(0.0, (EARTH_MU / radius).sqrt(), 0.0),
    )
}

/// State on a Keplerian orbit about a body of parameter `mu` at the origin,
/// periapsis on the x axis, at mean anomaly `mean_anomaly`.
fn kepler(mu: f64, a: f64, e: f64, mean_anomaly: f64) -> DegreesOfFreedom<Barycentric> {
    let mut eccentric_anomaly = mean_anomaly;
    for _ in 0..50 {
        eccentric_anomaly -= (eccentric_anomaly - e * eccentric_anomaly.sin() - mean_anomaly)
            / (1.0 - e * eccentric_anomaly.cos());
    }
    let (s, c) = eccentric_anomaly.sin_cos();
    let b = a * (1.0 - e * e).sqrt();
    let n = (mu / (a * a * a)).sqrt();
    let rate = n / (1.0 - e * c);
    DegreesOfFreedom::new(
        Position::new(a * (c - e), b * s, 0.0),
        Velocity::new(-a * s * rate, b * c * rate, 0.0),
    )
}

#[test]
fn test_builder_errors() {
    let body = || MassiveBody::new(GravitationalParameter::from_m3_per_s2(1.0)).unwrap();
    let dof = DegreesOfFreedom::<Barycentric>::new(Position::origin(), Velocity::zero());

    let empty = EphemerisBuilder::<Barycentric>::new();
    assert!(matches!(
        empty.build(Instant::J2000, FixedStepParameters::default(), default_fitting_tolerance()),
        Err(EphemerisError::NoBodies)
    ));

    let mut builder = EphemerisBuilder::new();
    builder.insert_body(BodyIndex(0), body(), dof).unwrap();
    assert_eq!(
        builder.insert_body(BodyIndex(0), body(), dof),
        Err(EphemerisError::DuplicateBody(0))
    );
    builder.insert_body(BodyIndex(2), body(), dof).unwrap();
    assert!(matches!(
        builder
            .clone()
            .build(Instant::J2000, FixedStepParameters::default(), default_fitting_tolerance()),
        Err(EphemerisError::UnknownBody(1))
    ));
    builder.insert_body(BodyIndex(1), body(), dof).unwrap();
    assert_eq!(builder.len(), 3);
    assert!(matches!(
        builder.build(Instant::J2000, FixedStepParameters::default(), Length::from_mm(0.0)),
        Err(EphemerisError::NonPositiveFittingTolerance)
    ));
}

#[test]
fn test_prolong_keeps_earth_on_its_orbit() {
    let mut ephemeris = make_sun_earth();
    let end = at(Time::from_days(30.0).to_seconds());
    ephemeris.prolong(end).unwrap();
    assert!(ephemeris.t_max() >= end);

    for days in [0.3, 7.0, 15.5, 29.9] {
        let t = at(Time::from_days(days).to_seconds());
        let sun = ephemeris.evaluate_position(BodyIndex(0), t).unwrap();
        let earth = ephemeris.evaluate_position(BodyIndex(1), t).unwrap();
        assert_relative_eq!((earth - sun).norm(), AU, max_relative = 1e-8);
    }
}

#[test]
fn test_gravitational_acceleration_on_massive_body() {
    let ephemeris = make_sun_earth();
    let earth = ephemeris
        .compute_gravitational_acceleration_on_massive_body(BodyIndex(1), Instant::J2000)
        .unwrap();
    assert_relative_eq!(earth.coordinates().x, -SUN_MU / (AU * AU), max_relative = 1e-9);
    assert!(earth.coordinates().y.abs() < 1e-12);

    let sun = ephemeris
        .compute_gravitational_acceleration_on_massive_body(BodyIndex(0), Instant::J2000)
        .unwrap();
    assert_relative_eq!(sun.coordinates().x, EARTH_MU / (AU * AU), max_relative = 1e-9);

    assert_eq!(
        ephemeris.compute_gravitational_acceleration_on_massive_body(BodyIndex(2), Instant::J2000),
        Err(EphemerisError::UnknownBody(2))
    );
}

#[test]
fn test_prolong_does_not_depend_on_how_calls_are_split() {
    let end = at(Time::from_days(10.0).to_seconds());
    let mut once = make_sun_earth();
    once.prolong(end).unwrap();

    let mut in_pieces = make_sun_earth();
    for days in [0.1, 0.1, 2.0, 3.7, 10.0] {
        in_pieces.prolong(at(Time::from_days(days).to_seconds())).unwrap();
    }
    // Already covered: nothing happens.
    in_pieces.prolong(at(Time::from_days(1.0).to_seconds())).unwrap();

    assert_eq!(once.to_message(), in_pieces.to_message());
    assert!(once.prolong(Instant::INFINITE_FUTURE).is_err());
}

#[test]
fn test_forget_before() {
    let mut ephemeris = make_sun_earth();
    ephemeris.prolong(at(Time::from_days(5.0).to_seconds())).unwrap();
    let t_max = ephemeris.t_max();

    assert_eq!(
        ephemeris.forget_before(t_max + Time::from_seconds(1.0)),
        Err(EphemerisError::ForgetBeyondCoverage(t_max + Time::from_seconds(1.0)))
    );

    let horizon = at(Time::from_days(2.0).to_seconds());
    ephemeris.forget_before(horizon).unwrap();
    let t_min = ephemeris.t_min();
    assert!(t_min <= horizon);
    assert!(t_min > Instant::J2000);
    assert!(ephemeris.evaluate_position(BodyIndex(1), Instant::J2000).is_err());

    ephemeris.forget_before(at(Time::from_days(1.0).to_seconds())).unwrap();
    assert_eq!(ephemeris.t_min(), t_min);
}

#[test]
fn test_flow_with_adaptive_step_closes_a_circular_orbit() {
    let mut ephemeris = make_earth_alone();
    let radius = 7.0e6;
    let speed = (EARTH_MU / radius).sqrt();
    let period = 2.0 * std::f64::consts::PI * radius / speed;

    let mut tree = DiscreteTrajectoryTree::new();
    let vessel = tree.new_root();
    let initial =
        DegreesOfFreedom::new(Position::new(radius, 0.0, 0.0), Velocity::new(0.0, speed, 0.0));
    tree.append(vessel, Instant::J2000, initial).unwrap();

    let end = at(period);
    let reached = ephemeris
        .flow_with_adaptive_step(
            &mut tree,
            vessel,
            &no_thrust,
            end,
            &make_adaptive(10_000),
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )
        .unwrap();

    assert!(reached);
    let last = tree.last(vessel).unwrap().unwrap();
    assert_eq!(last.time, end);
    assert!((last.degrees_of_freedom.position - initial.position).norm() < 10.0);
    assert!(ephemeris.t_max() >= end);
    assert_eq!(ephemeris.take_severe_integration_failure(), None);

    // Flowing to the last time is a no-op, flowing backwards an error.
    let samples = tree.len(vessel).unwrap();
    assert!(ephemeris
        .flow_with_adaptive_step(&mut tree, vessel, &no_thrust, end, &make_adaptive(10), 0)
        .unwrap());
    assert_eq!(tree.len(vessel).unwrap(), samples);
    assert!(matches!(
        ephemeris.flow_with_adaptive_step(
            &mut tree,
            vessel,
            &no_thrust,
            at(1.0),
            &make_adaptive(10),
            0,
        ),
        Err(EphemerisError::FlowBackwards { .. })
    ));
}

#[test]
fn test_intrinsic_acceleration_is_applied() {
    let mut ephemeris = make_earth_alone();
    let radius = 4.0e7;
    let speed = (EARTH_MU / radius).sqrt();

    let mut coasting_tree = DiscreteTrajectoryTree::new();
    let coasting = coasting_tree.new_root();
    let mut thrusting_tree = DiscreteTrajectoryTree::new();
    let thrusting = thrusting_tree.new_root();
    let initial =
        DegreesOfFreedom::new(Position::new(radius, 0.0, 0.0), Velocity::new(0.0, speed, 0.0));
    coasting_tree.append(coasting, Instant::J2000, initial).unwrap();
    thrusting_tree.append(thrusting, Instant::J2000, initial).unwrap();

    let prograde = |_: Instant| Acceleration::<Barycentric>::new(0.0, 0.1, 0.0);
    let end = at(60.0);
    let parameters = make_adaptive(1_000);
    ephemeris
        .flow_with_adaptive_step(
            &mut coasting_tree,
            coasting,
            &no_thrust,
            end,
            &parameters,
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )
        .unwrap();
    ephemeris
        .flow_with_adaptive_step(
            &mut thrusting_tree,
            thrusting,
            &prograde,
            end,
            &parameters,
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )
        .unwrap();

    let dv = thrusting_tree.last(thrusting).unwrap().unwrap().degrees_of_freedom.velocity
        - coasting_tree.last(coasting).unwrap().unwrap().degrees_of_freedom.velocity;
    assert_relative_eq!(dv.norm(), 6.0, max_relative = 1e-3);
}

#[test]
fn test_step_budget_exhaustion_is_not_severe() {
    let mut ephemeris = make_earth_alone();
    let radius = 7.0e6;
    let mut tree = DiscreteTrajectoryTree::new();
    let vessel = tree.new_root();
    tree.append(vessel, Instant::J2000, circular_orbit(radius)).unwrap();

    let reached = ephemeris
        .flow_with_adaptive_step(
            &mut tree,
            vessel,
            &no_thrust,
            at(86_400.0),
            &make_adaptive(5),
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )
        .unwrap();

    assert!(!reached);
    assert_eq!(tree.len(vessel).unwrap(), 6);
    assert_eq!(ephemeris.take_severe_integration_failure(), None);
}

#[test]
fn test_ephemeris_step_cap_stops_the_flow() {
    let mut ephemeris = make_earth_alone();
    let radius = 7.0e6;
    let mut tree = DiscreteTrajectoryTree::new();
    let vessel = tree.new_root();
    tree.append(vessel, Instant::J2000, circular_orbit(radius)).unwrap();

    // 8 steps of 10 minutes fit one segment.
    let reached = ephemeris
        .flow_with_adaptive_step(
            &mut tree,
            vessel,
            &no_thrust,
            at(86_400.0),
            &make_adaptive(10_000),
            8,
        )
        .unwrap();

    assert!(!reached);
    assert_eq!(ephemeris.t_max(), at(4_800.0));
    assert_eq!(tree.last_time(vessel).unwrap(), Some(at(4_800.0)));
    assert_eq!(ephemeris.take_severe_integration_failure(), None);
}

#[test]
fn test_collision_course_latches_severe_failure() {
    let mut ephemeris = make_earth_alone();
    let mut tree = DiscreteTrajectoryTree::new();
    let vessel = tree.new_root();
    tree.append(
        vessel,
        Instant::J2000,
        DegreesOfFreedom::new(Position::new(1.0e6, 0.0, 0.0), Velocity::zero()),
    )
    .unwrap();

    // Free fall to the centre takes about 56 s.
    let reached = ephemeris
        .flow_with_adaptive_step(
            &mut tree,
            vessel,
            &no_thrust,
            at(100.0),
            &make_adaptive(1_000_000),
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )
        .unwrap();

    assert!(!reached);
    let last = tree.last_time(vessel).unwrap().unwrap();
    assert!(last > at(50.0) && last < at(60.0));
    let failure = ephemeris.take_severe_integration_failure().unwrap();
    assert!(failure.contains("underflow"));
    assert_eq!(ephemeris.take_severe_integration_failure(), None);
}

#[test]
fn test_flow_with_fixed_step() {
    let mut ephemeris = make_earth_alone();
    let mut tree = DiscreteTrajectoryTree::new();
    let radii = [7.0e6, 1.0e7];
    let vessels: Vec<_> = radii
        .iter()
        .map(|r| {
            let id = tree.new_root();
            tree.append(id, Instant::J2000, circular_orbit(*r)).unwrap();
            id
        })
        .collect();
    let parameters =
        FixedStepParameters::new(SymplecticScheme::default(), Time::from_seconds(10.0)).unwrap();

    ephemeris
        .flow_with_fixed_step(&mut tree, &vessels, at(95.0), &parameters)
        .unwrap();

    for (vessel, radius) in vessels.iter().zip(radii) {
        let times: Vec<_> = tree.iter(*vessel).unwrap().map(|s| s.time).collect();
        assert_eq!(times.len(), 10);
        assert_relative_eq!(times[9].seconds_since_j2000(), 90.0, epsilon = 1e-9);
        let last = tree.last(*vessel).unwrap().unwrap();
        assert_relative_eq!(
            last.degrees_of_freedom.position.from_origin().norm(),
            radius,
            max_relative = 1e-9
        );
    }

    // Trajectories that do not end together cannot be flowed together.
    let third = tree.new_root();
    let dof = DegreesOfFreedom::new(Position::new(8.0e6, 0.0, 0.0), Velocity::zero());
    tree.append(third, at(5.0), dof).unwrap();
    assert_eq!(
        ephemeris.flow_with_fixed_step(&mut tree, &[vessels[0], third], at(200.0), &parameters),
        Err(EphemerisError::InconsistentTrajectoryTimes)
    );
}

#[test]
fn test_apsides_of_eccentric_orbit() {
    let mut ephemeris = make_earth_alone();
    let (a, e) = (1.0e7, 0.3);
    let n = (EARTH_MU / (a * a * a)).sqrt();
    let period = 2.0 * std::f64::consts::PI / n;
    let offset = 0.1;

    let samples: Vec<Sample<Barycentric>> = (0..=400)
        .map(|i| {
            let t = period * i as f64 / 200.0;
            Sample::new(at(t), kepler(EARTH_MU, a, e, n * t + offset))
        })
        .collect();
    ephemeris.prolong(samples[400].time).unwrap();

    let apsides = ephemeris.compute_apsides(BodyIndex(0), &samples).unwrap();
    assert_eq!(apsides.apoapsides.len(), 2);
    assert_eq!(apsides.periapsides.len(), 2);

    for apoapsis in &apsides.apoapsides {
        let r = apoapsis.degrees_of_freedom.position.from_origin().norm();
        assert_relative_eq!(r, a * (1.0 + e), max_relative = 1e-4);
    }
    for periapsis in &apsides.periapsides {
        let r = periapsis.degrees_of_freedom.position.from_origin().norm();
        assert_relative_eq!(r, a * (1.0 - e), max_relative = 1e-4);
    }
    let first_periapsis = (2.0 * std::f64::consts::PI - offset) / n;
    assert_relative_eq!(
        apsides.periapsides[0].time.seconds_since_j2000(),
        first_periapsis,
        epsilon = 1.0
    );
    assert!(apsides.apoapsides[0].time < apsides.apoapsides[1].time);
}

#[test]
fn test_apsides_of_circular_orbit() {
    let mut ephemeris = make_earth_alone();
    let a = 1.0e7;
    let n = (EARTH_MU / (a * a * a)).sqrt();
    let period = 2.0 * std::f64::consts::PI / n;

    let samples: Vec<Sample<Barycentric>> = (0..=400)
        .map(|i| {
            let t = period * i as f64 / 200.0;
            Sample::new(at(t), kepler(EARTH_MU, a, 0.0, n * t))
        })
        .collect();
    ephemeris.prolong(samples[400].time).unwrap();

    let apsides = ephemeris.compute_apsides(BodyIndex(0), &samples).unwrap();
    assert!(apsides.apoapsides.is_empty());
    assert!(apsides.periapsides.is_empty());
}

#[test]
fn test_message_round_trip() {
    let mut ephemeris = make_sun_earth();
    ephemeris.prolong(at(Time::from_days(3.3).to_seconds())).unwrap();

    let json = serde_json::to_string(&ephemeris.to_message()).unwrap();
    let message: EphemerisMessage<Barycentric> = serde_json::from_str(&json).unwrap();
    let mut restored = Ephemeris::from_message(&message).unwrap();

    assert_eq!(restored.t_max(), ephemeris.t_max());
    assert!(restored.bodies()[1].is_oblate());

    // Both continue identically.
    let end = at(Time::from_days(7.0).to_seconds());
    ephemeris.prolong(end).unwrap();
    restored.prolong(end).unwrap();
    assert_eq!(
        restored.evaluate_degrees_of_freedom(BodyIndex(1), end).unwrap(),
        ephemeris.evaluate_degrees_of_freedom(BodyIndex(1), end).unwrap()
    );
}

#[test]
fn test_message_without_parameters_uses_defaults() {
    let ephemeris = make_earth_alone();
    let mut value = serde_json::to_value(ephemeris.to_message()).unwrap();
    let object = value.as_object_mut().unwrap();
    object.remove("fixed_step_parameters");
    object.remove("fitting_tolerance");

    let message: EphemerisMessage<Barycentric> = serde_json::from_value(value).unwrap();
    let restored = Ephemeris::from_message(&message).unwrap();
    assert_eq!(*restored.fixed_step_parameters(), FixedStepParameters::default());
    assert_eq!(restored.fitting_tolerance(), default_fitting_tolerance());
}
