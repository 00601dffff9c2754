//! Physics of the simulation core.
//!
//! - [`body`]: massive and massless bodies.
//! - [`gravity`]: mutual accelerations of the massive bodies, with J2.
//! - [`continuous_trajectory`]: Chebyshev trajectories of the massive bodies.
//! - [`discrete_trajectory`]: forking, time-sampled trajectories of vessels.
//! - [`ephemeris`]: integration of the massive bodies, and of massless
//!   bodies in their field.
//! - [`kepler_orbit`] and [`jacobi_coordinates`]: initial states of bodies
//!   from their orbits.

pub mod body;
pub mod chebyshev;
pub mod continuous_trajectory;
pub mod discrete_trajectory;
pub mod ephemeris;
pub mod error;
pub mod gravity;
pub mod jacobi_coordinates;
pub mod kepler_orbit;

#[cfg(test)]
mod ephemeris_test;
#[cfg(test)]
mod gravity_test;
#[cfg(test)]
mod jacobi_coordinates_test;
#[cfg(test)]
mod kepler_orbit_test;

pub use body::{Body, BodyIndex, BodyMessage, MassiveBody, Oblateness, RotationParameters};
pub use continuous_trajectory::ContinuousTrajectory;
pub use discrete_trajectory::{
    DiscreteTrajectoryMessage, DiscreteTrajectoryTree, ForkMessage, Sample, TrajectoryId,
};
pub use ephemeris::{
    default_fitting_tolerance, Apsides, Ephemeris, EphemerisBuilder, EphemerisMessage,
    UNLIMITED_MAX_EPHEMERIS_STEPS,
};
pub use error::{BodyError, EphemerisError, OrbitError, TrajectoryError};
pub use jacobi_coordinates::{HierarchicalSystem, JacobiCoordinates, SystemBody};
pub use kepler_orbit::{solve_kepler_equation, KeplerianElements};
