use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul};

use crate::Mass;

/// Newtonian constant of gravitation in m³ kg⁻¹ s⁻².
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// The product of a body's mass and the gravitational constant.
///
/// Ephemerides are specified by gravitational parameters rather than masses
/// because μ is known far more accurately than either factor.
///
/// # Examples
///
/// ```rust
/// use units::{GravitationalParameter, Mass};
///
/// let earth = GravitationalParameter::from_m3_per_s2(3.986_004_418e14);
/// let mass = earth.to_mass();
/// assert!((mass.to_kg() / 5.972e24 - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GravitationalParameter(f64); // Base unit: m³/s²

impl GravitationalParameter {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn from_m3_per_s2(value: f64) -> Self {
        Self(value)
    }

    pub fn from_km3_per_s2(value: f64) -> Self {
        Self(value * 1e9)
    }

    pub fn from_mass(mass: Mass) -> Self {
        Self(mass.to_kg() * GRAVITATIONAL_CONSTANT)
    }

    pub fn to_m3_per_s2(&self) -> f64 {
        self.0
    }

    pub fn to_mass(&self) -> Mass {
        Mass::from_kg(self.0 / GRAVITATIONAL_CONSTANT)
    }
}

impl Add for GravitationalParameter {
    type Output = GravitationalParameter;

    fn add(self, rhs: GravitationalParameter) -> GravitationalParameter {
        GravitationalParameter(self.0 + rhs.0)
    }
}

impl Mul<f64> for GravitationalParameter {
    type Output = GravitationalParameter;

    fn mul(self, rhs: f64) -> GravitationalParameter {
        GravitationalParameter(self.0 * rhs)
    }
}

impl Div for GravitationalParameter {
    type Output = f64;

    fn div(self, rhs: GravitationalParameter) -> f64 {
        self.0 / rhs.0
    }
}
