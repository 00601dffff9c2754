use integrators::IntegratorError;
use thiserror::Error;
use units::Instant;

use crate::discrete_trajectory::TrajectoryId;

/// Errors raised by discrete and continuous trajectories.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("handle {0:?} does not refer to a live trajectory")]
    StaleHandle(TrajectoryId),

    #[error("cannot append at {time}: the trajectory already extends to {last}")]
    NonMonotonicAppend { time: Instant, last: Instant },

    #[error("no sample at {0} to fork from")]
    NoSampleAt(Instant),

    #[error("cannot delete the root of a trajectory tree")]
    CannotDeleteRoot,

    #[error("{0:?} is a fork, not the root of a tree")]
    NotARoot(TrajectoryId),

    #[error("the trajectory is empty")]
    Empty,

    #[error("{time} is outside of [{t_min}, {t_max}]")]
    OutOfRange {
        time: Instant,
        t_min: Instant,
        t_max: Instant,
    },

    #[error("least squares fit failed: {0}")]
    FittingFailed(&'static str),

    #[error("no fork at path {0:?}")]
    InvalidForkPath(Vec<usize>),
}

/// Errors raised when constructing bodies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BodyError {
    #[error("gravitational parameter must be positive and finite, got {0} m³/s²")]
    NonPositiveGravitationalParameter(f64),

    #[error("an oblate body needs a rotation to define its axis")]
    OblatenessWithoutRotation,

    #[error("invalid oblateness: J2 = {j2}, reference radius = {reference_radius} m")]
    InvalidOblateness { j2: f64, reference_radius: f64 },
}

/// Errors raised by the ephemeris.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error(transparent)]
    Integrator(#[from] IntegratorError),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("an ephemeris needs at least one massive body")]
    NoBodies,

    #[error("unknown body {0}")]
    UnknownBody(usize),

    #[error("body {0} is already registered")]
    DuplicateBody(usize),

    #[error("{0} is not a finite instant")]
    NonFiniteTime(Instant),

    #[error("fitting tolerance must be positive and finite")]
    NonPositiveFittingTolerance,

    #[error("cannot flow a trajectory without samples")]
    EmptyTrajectory,

    #[error("cannot flow backwards from {last} to {target}")]
    FlowBackwards { last: Instant, target: Instant },

    #[error("trajectories flowed together must end at the same time")]
    InconsistentTrajectoryTimes,

    #[error("cannot forget before {0}: the ephemeris does not cover it yet")]
    ForgetBeyondCoverage(Instant),

    #[error("malformed ephemeris message: {0}")]
    MalformedMessage(String),
}

/// Errors raised when placing bodies from orbital elements.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitError {
    #[error("eccentricity must be in [0, 1), got {0}")]
    UnboundEccentricity(f64),

    #[error("semimajor axis must be positive and finite, got {0} m")]
    NonPositiveSemimajorAxis(f64),

    #[error("{0} is not finite")]
    NonFiniteAngle(&'static str),

    #[error("the parent of a body must be added before it")]
    UnknownParent,

    #[error("the body is already in the system")]
    DuplicateBody,
}
