use nalgebra::{Rotation3, Vector3};
use std::marker::PhantomData;
use std::ops::Mul;
use units::Angle;

use crate::degrees_of_freedom::RelativeDegreesOfFreedom;
use crate::frame::Frame;
use crate::vector::{Acceleration, Displacement, Vector, Velocity};

/// A proper rotation mapping vectors of frame `From` to frame `To`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation<From: Frame, To: Frame> {
    matrix: Rotation3<f64>,
    frames: PhantomData<(From, To)>,
}

impl<From: Frame, To: Frame> Rotation<From, To> {
    pub fn identity() -> Self {
        Self::from_matrix(Rotation3::identity())
    }

    pub fn from_matrix(matrix: Rotation3<f64>) -> Self {
        Self {
            matrix,
            frames: PhantomData,
        }
    }

    /// A rotation of `angle` about the z axis, counterclockwise seen from +z.
    pub fn about_z(angle: Angle) -> Self {
        Self::from_matrix(Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            angle.to_radians(),
        ))
    }

    pub fn inverse(&self) -> Rotation<To, From> {
        Rotation::from_matrix(self.matrix.inverse())
    }

    pub fn apply_vector(&self, vector: Vector<From>) -> Vector<To> {
        Vector::from_coordinates(self.matrix * vector.coordinates())
    }

    pub fn apply_displacement(&self, displacement: Displacement<From>) -> Displacement<To> {
        Displacement::from_coordinates(self.matrix * displacement.coordinates())
    }

    pub fn apply_velocity(&self, velocity: Velocity<From>) -> Velocity<To> {
        Velocity::from_coordinates(self.matrix * velocity.coordinates())
    }

    pub fn apply_acceleration(&self, acceleration: Acceleration<From>) -> Acceleration<To> {
        Acceleration::from_coordinates(self.matrix * acceleration.coordinates())
    }

    pub fn apply_relative(
        &self,
        relative: RelativeDegreesOfFreedom<From>,
    ) -> RelativeDegreesOfFreedom<To> {
        RelativeDegreesOfFreedom::new(
            self.apply_displacement(relative.displacement),
            self.apply_velocity(relative.velocity),
        )
    }
}

impl<A: Frame, B: Frame, C: Frame> Mul<Rotation<A, B>> for Rotation<B, C> {
    type Output = Rotation<A, C>;

    fn mul(self, rhs: Rotation<A, B>) -> Rotation<A, C> {
        Rotation::from_matrix(self.matrix * rhs.matrix)
    }
}
