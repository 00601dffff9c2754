use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::ops::{Add, Mul, Neg, Sub};

/// A plane angle, in radians.
///
/// # Examples
///
/// ```rust
/// use units::Angle;
///
/// let right = Angle::from_degrees(90.0);
/// assert!((right.to_radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
/// assert!((right.sin() - 1.0).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Angle(f64); // Base unit: rad

impl Angle {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn from_radians(value: f64) -> Self {
        Self(value)
    }

    pub fn from_degrees(value: f64) -> Self {
        Self(value * PI / 180.0)
    }

    pub fn to_radians(&self) -> f64 {
        self.0
    }

    pub fn to_degrees(&self) -> f64 {
        self.0 * 180.0 / PI
    }

    /// The same angle reduced to [0, 2π).
    pub fn normalized(&self) -> Self {
        Self(self.0.rem_euclid(TAU))
    }

    pub fn sin(&self) -> f64 {
        self.0.sin()
    }

    pub fn cos(&self) -> f64 {
        self.0.cos()
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle(self.0 * rhs)
    }
}
