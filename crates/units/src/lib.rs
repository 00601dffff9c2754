//! Scalar quantities used throughout the simulation core.
//!
//! Every quantity is a `#[serde(transparent)]` newtype over `f64` in SI base
//! units, so that messages carry plain numbers while the code cannot mix a
//! length with a speed.

pub mod angle;
pub mod angular_frequency;
pub mod gravitational_parameter;
pub mod length;
pub mod mass;
pub mod speed;
pub mod time;

#[cfg(test)]
mod angle_test;

pub use angle::Angle;
pub use angular_frequency::AngularFrequency;
pub use gravitational_parameter::{GravitationalParameter, GRAVITATIONAL_CONSTANT};
pub use length::Length;
pub use mass::Mass;
pub use speed::Speed;
pub use time::{Instant, Time, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
