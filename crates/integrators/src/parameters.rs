//! Integration parameters shared by the ephemeris and the vessels.
//!
//! Parameters are validated when constructed through `new`; the serde
//! representation is validated again by the components that consume it.

use serde::{Deserialize, Serialize};
use units::{Length, Speed, Time};

/// Step of the ephemeris unless configured otherwise.
pub const DEFAULT_EPHEMERIS_STEP_MINUTES: f64 = 45.0;

/// Step budget of a single adaptive flow unless configured otherwise.
pub const DEFAULT_MAX_STEPS: usize = 1000;

use crate::error::IntegratorError;
use crate::symplectic::SymplecticScheme;

/// A symplectic scheme and its fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedStepParameters {
    pub scheme: SymplecticScheme,
    pub step: Time,
}

impl FixedStepParameters {
    pub fn new(scheme: SymplecticScheme, step: Time) -> Result<Self, IntegratorError> {
        let parameters = Self { scheme, step };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<(), IntegratorError> {
        let step = self.step.to_seconds();
        if !(step.is_finite() && step > 0.0) {
            return Err(IntegratorError::NonPositiveStep(step));
        }
        Ok(())
    }
}

/// The ephemeris defaults: the order 5 McLachlan–Atela method every 45
/// minutes.
impl Default for FixedStepParameters {
    fn default() -> Self {
        Self {
            scheme: SymplecticScheme::default(),
            step: Time::from_minutes(DEFAULT_EPHEMERIS_STEP_MINUTES),
        }
    }
}

/// Step budget and tolerances of the embedded Runge–Kutta integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveStepParameters {
    /// Maximum number of accepted steps in one call.
    pub max_steps: usize,
    pub length_integration_tolerance: Length,
    pub speed_integration_tolerance: Speed,
}

impl AdaptiveStepParameters {
    pub fn new(
        max_steps: usize,
        length_integration_tolerance: Length,
        speed_integration_tolerance: Speed,
    ) -> Result<Self, IntegratorError> {
        let parameters = Self {
            max_steps,
            length_integration_tolerance,
            speed_integration_tolerance,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<(), IntegratorError> {
        let length = self.length_integration_tolerance.to_meters();
        if !(length.is_finite() && length > 0.0) {
            return Err(IntegratorError::NonPositiveTolerance("length"));
        }
        let speed = self.speed_integration_tolerance.to_meters_per_second();
        if !(speed.is_finite() && speed > 0.0) {
            return Err(IntegratorError::NonPositiveTolerance("speed"));
        }
        Ok(())
    }
}

/// The prolongation defaults: 1000 steps, 1 mm and 1 mm/s.
impl Default for AdaptiveStepParameters {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            length_integration_tolerance: Length::from_mm(1.0),
            speed_integration_tolerance: Speed::from_mm_per_second(1.0),
        }
    }
}
