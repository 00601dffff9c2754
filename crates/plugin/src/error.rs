use integrators::IntegratorError;
use physics::{EphemerisError, OrbitError, TrajectoryError};
use thiserror::Error;
use units::Instant;

use crate::celestial::CelestialIndex;
use crate::vessel::VesselId;

/// Errors raised by the plugin facade.
///
/// Every variant except the wrapped lower-level errors is detected before
/// the plugin state is modified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Integrator(#[from] IntegratorError),

    #[error(transparent)]
    Orbit(#[from] OrbitError),

    #[error("the plugin is still initializing")]
    Initializing,

    #[error("the plugin is no longer initializing")]
    AlreadyInitialized,

    #[error("celestial {0} is already inserted")]
    DuplicateCelestial(CelestialIndex),

    #[error("unknown celestial {0}")]
    UnknownCelestial(CelestialIndex),

    #[error("celestial {0} would be a second sun")]
    SecondSun(CelestialIndex),

    #[error("celestials cannot be inserted both from states and from orbital elements")]
    MixedInitialization,

    #[error("celestial {0} needs both a parent and orbital elements, or neither")]
    InconsistentKeplerianInsertion(CelestialIndex),

    #[error("no sun was inserted")]
    NoSun,

    #[error("celestial {0} is the sun and has no parent")]
    NoParent(CelestialIndex),

    #[error("making {parent} the parent of {celestial} would create a cycle")]
    CyclicHierarchy {
        celestial: CelestialIndex,
        parent: CelestialIndex,
    },

    #[error("celestial {0} does not rotate")]
    NotRotating(CelestialIndex),

    #[error("invalid vessel id {0:?}")]
    InvalidVesselId(String),

    #[error("unknown vessel {0}")]
    UnknownVessel(VesselId),

    #[error("vessel {0} was not given an initial state")]
    VesselNotInitialized(VesselId),

    #[error("vessel {0} already has a trajectory")]
    VesselAlreadyInitialized(VesselId),

    #[error("vessel {0} was not kept since the last advance")]
    VesselNotKept(VesselId),

    #[error("vessel {0} is not in the next physics bubble")]
    NotInPhysicsBubble(VesselId),

    #[error("the Frenet frame of vessel {0} is undefined")]
    DegenerateFrenetFrame(VesselId),

    #[error("vessel {0} is not in a pile-up")]
    NotPiledUp(VesselId),

    #[error("vessel {vessel} ends at {time} but the rest of its pile-up ends at {expected}")]
    PileUpTimesDiffer {
        vessel: VesselId,
        time: Instant,
        expected: Instant,
    },

    #[error("mass must be positive and finite, got {0} kg")]
    NonPositiveMass(f64),

    #[error("prediction length must be positive and finite, got {0} s")]
    NonPositivePredictionLength(f64),

    #[error("cannot advance to {time}: current time is {current}")]
    TimeNotAfter { time: Instant, current: Instant },

    #[error("cannot forget before {time}: current time is {current}")]
    ForgetNotBefore { time: Instant, current: Instant },

    #[error("malformed plugin message: {0}")]
    MalformedMessage(String),
}
