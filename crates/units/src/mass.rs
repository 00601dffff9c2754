use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// A physical mass quantity using f64 precision.
///
/// The base unit is the kilogram. Vessel and part masses are reported by
/// the host in tonnes, so both conversions are provided.
///
/// # Examples
///
/// ```rust
/// use units::Mass;
///
/// let part = Mass::from_tonnes(1.5);
/// let total: Mass = [part, part].into_iter().sum();
/// assert_eq!(total.to_kg(), 3_000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Mass(f64); // Base unit: kg

impl Mass {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn from_kg(value: f64) -> Self {
        Self(value)
    }

    pub fn from_tonnes(value: f64) -> Self {
        Self(value * 1e3)
    }

    pub fn to_kg(&self) -> f64 {
        self.0
    }

    pub fn to_tonnes(&self) -> f64 {
        self.0 * 1e-3
    }
}

impl Add for Mass {
    type Output = Mass;

    fn add(self, rhs: Mass) -> Mass {
        Mass(self.0 + rhs.0)
    }
}

impl AddAssign for Mass {
    fn add_assign(&mut self, rhs: Mass) {
        self.0 += rhs.0;
    }
}

impl Sub for Mass {
    type Output = Mass;

    fn sub(self, rhs: Mass) -> Mass {
        Mass(self.0 - rhs.0)
    }
}

impl Mul<f64> for Mass {
    type Output = Mass;

    fn mul(self, rhs: f64) -> Mass {
        Mass(self.0 * rhs)
    }
}

impl Div<f64> for Mass {
    type Output = Mass;

    fn div(self, rhs: f64) -> Mass {
        Mass(self.0 / rhs)
    }
}

impl Div for Mass {
    type Output = f64;

    fn div(self, rhs: Mass) -> f64 {
        self.0 / rhs.0
    }
}

impl Sum for Mass {
    fn sum<I: Iterator<Item = Mass>>(iter: I) -> Mass {
        iter.fold(Mass::zero(), |acc, m| acc + m)
    }
}
