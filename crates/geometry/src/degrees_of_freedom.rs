use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

use crate::frame::Frame;
use crate::position::Position;
use crate::vector::{Displacement, Velocity};

/// A position and velocity in frame `F`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DegreesOfFreedom<F: Frame> {
    pub position: Position<F>,
    pub velocity: Velocity<F>,
}

impl<F: Frame> DegreesOfFreedom<F> {
    pub fn new(position: Position<F>, velocity: Velocity<F>) -> Self {
        Self { position, velocity }
    }
}

/// The difference of two [`DegreesOfFreedom`]: a displacement and a relative
/// velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RelativeDegreesOfFreedom<F: Frame> {
    pub displacement: Displacement<F>,
    pub velocity: Velocity<F>,
}

impl<F: Frame> RelativeDegreesOfFreedom<F> {
    pub fn new(displacement: Displacement<F>, velocity: Velocity<F>) -> Self {
        Self {
            displacement,
            velocity,
        }
    }

    pub fn zero() -> Self {
        Self::new(Displacement::zero(), Velocity::zero())
    }
}

impl<F: Frame> Sub for DegreesOfFreedom<F> {
    type Output = RelativeDegreesOfFreedom<F>;

    fn sub(self, rhs: Self) -> RelativeDegreesOfFreedom<F> {
        RelativeDegreesOfFreedom::new(self.position - rhs.position, self.velocity - rhs.velocity)
    }
}

impl<F: Frame> Add<RelativeDegreesOfFreedom<F>> for DegreesOfFreedom<F> {
    type Output = DegreesOfFreedom<F>;

    fn add(self, rhs: RelativeDegreesOfFreedom<F>) -> DegreesOfFreedom<F> {
        DegreesOfFreedom::new(self.position + rhs.displacement, self.velocity + rhs.velocity)
    }
}

impl<F: Frame> Sub<RelativeDegreesOfFreedom<F>> for DegreesOfFreedom<F> {
    type Output = DegreesOfFreedom<F>;

    fn sub(self, rhs: RelativeDegreesOfFreedom<F>) -> DegreesOfFreedom<F> {
        DegreesOfFreedom::new(self.position - rhs.displacement, self.velocity - rhs.velocity)
    }
}

impl<F: Frame> Add for RelativeDegreesOfFreedom<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.displacement + rhs.displacement, self.velocity + rhs.velocity)
    }
}

impl<F: Frame> Neg for RelativeDegreesOfFreedom<F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.displacement, -self.velocity)
    }
}
