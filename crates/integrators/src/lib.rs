//! Numerical integrators for the simulation core.
//!
//! - [`symplectic`]: fixed-step symplectic partitioned Runge–Kutta methods,
//!   used for the massive bodies of the ephemeris and for vessel histories.
//! - [`embedded_runge_kutta`]: the Dormand–Prince 5(4) pair with step size
//!   control, used for prolongations, predictions and pile-ups.
//! - [`hermite3`]: cubic Hermite interpolation and its extrema, used for
//!   apsides and for evaluating discrete trajectories between samples.

pub mod embedded_runge_kutta;
pub mod error;
pub mod hermite3;
pub mod parameters;
pub mod symplectic;


pub use embedded_runge_kutta::{AdaptiveStepOutcome, DormandPrince54, SecondOrderProblem};
pub use error::IntegratorError;
pub use hermite3::Hermite3;
pub use parameters::{AdaptiveStepParameters, FixedStepParameters};
pub use symplectic::{
    Composition, SeparableProblem, SymplecticPartitionedRungeKutta, SymplecticScheme, SystemState,
};
