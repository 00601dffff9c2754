use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::{Speed, Time};

pub const METERS_PER_KM: f64 = 1_000.0;
pub const METERS_PER_AU: f64 = 149_597_870_700.0;

/// A physical length quantity using f64 precision.
///
/// The base unit is the meter. Lengths are used for integration and fitting
/// tolerances as well as for radii of celestial bodies.
///
/// # Examples
///
/// ```rust
/// use units::Length;
///
/// let tolerance = Length::from_mm(1.0);
/// let radius = Length::from_km(6_371.0);
///
/// assert_eq!(tolerance.to_meters(), 1e-3);
/// assert_eq!(radius.to_km(), 6_371.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Length(f64); // Base unit: m

impl Length {
    /// Creates a zero length value
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn from_meters(value: f64) -> Self {
        Self(value)
    }

    pub fn from_mm(value: f64) -> Self {
        Self(value * 1e-3)
    }

    pub fn from_km(value: f64) -> Self {
        Self(value * METERS_PER_KM)
    }

    pub fn from_au(value: f64) -> Self {
        Self(value * METERS_PER_AU)
    }

    pub fn to_meters(&self) -> f64 {
        self.0
    }

    pub fn to_km(&self) -> f64 {
        self.0 / METERS_PER_KM
    }

    pub fn to_au(&self) -> f64 {
        self.0 / METERS_PER_AU
    }

    pub fn powi(&self, n: i32) -> f64 {
        self.0.powi(n)
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length(self.0 + rhs.0)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length(self.0 - rhs.0)
    }
}

impl Mul<f64> for Length {
    type Output = Length;

    fn mul(self, rhs: f64) -> Length {
        Length(self.0 * rhs)
    }
}

impl Div<f64> for Length {
    type Output = Length;

    fn div(self, rhs: f64) -> Length {
        Length(self.0 / rhs)
    }
}

impl Div for Length {
    type Output = f64;

    fn div(self, rhs: Length) -> f64 {
        self.0 / rhs.0
    }
}

impl Div<Time> for Length {
    type Output = Speed;

    fn div(self, rhs: Time) -> Speed {
        Speed::from_meters_per_second(self.0 / rhs.to_seconds())
    }
}
