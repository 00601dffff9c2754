use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::Mul;

use crate::{Angle, Time};

/// Angular frequency in rad/s
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AngularFrequency(f64);

impl AngularFrequency {
    pub fn from_radians_per_second(value: f64) -> Self {
        Self(value)
    }

    /// The angular frequency of a rotation completing one turn per `period`.
    pub fn from_period(period: Time) -> Self {
        Self(TAU / period.to_seconds())
    }

    pub fn to_radians_per_second(&self) -> f64 {
        self.0
    }

    /// The rotation period, infinite for a body that does not rotate.
    pub fn period(&self) -> Time {
        Time::from_seconds(TAU / self.0.abs())
    }
}

impl Mul<Time> for AngularFrequency {
    type Output = Angle;

    fn mul(self, rhs: Time) -> Angle {
        Angle::from_radians(self.0 * rhs.to_seconds())
    }
}
