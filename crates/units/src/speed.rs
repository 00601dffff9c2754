use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::{Length, Time};

/// A speed (norm of a velocity) using f64 precision.
///
/// The base unit is meters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Speed(f64); // Base unit: m/s

impl Speed {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn from_meters_per_second(value: f64) -> Self {
        Self(value)
    }

    pub fn from_mm_per_second(value: f64) -> Self {
        Self(value * 1e-3)
    }

    pub fn from_km_per_second(value: f64) -> Self {
        Self(value * 1e3)
    }

    pub fn to_meters_per_second(&self) -> f64 {
        self.0
    }

    pub fn to_km_per_second(&self) -> f64 {
        self.0 * 1e-3
    }
}

impl Add for Speed {
    type Output = Speed;

    fn add(self, rhs: Speed) -> Speed {
        Speed(self.0 + rhs.0)
    }
}

impl Sub for Speed {
    type Output = Speed;

    fn sub(self, rhs: Speed) -> Speed {
        Speed(self.0 - rhs.0)
    }
}

impl Mul<f64> for Speed {
    type Output = Speed;

    fn mul(self, rhs: f64) -> Speed {
        Speed(self.0 * rhs)
    }
}

impl Mul<Time> for Speed {
    type Output = Length;

    fn mul(self, rhs: Time) -> Length {
        Length::from_meters(self.0 * rhs.to_seconds())
    }
}

impl Div<f64> for Speed {
    type Output = Speed;

    fn div(self, rhs: f64) -> Speed {
        Speed(self.0 / rhs)
    }
}
