//! Weighted barycentres of degrees of freedom.
//!
//! The weights are masses (or gravitational parameters), so the barycentric
//! velocity times the total weight is the total momentum of the inputs.

use nalgebra::Vector3;

use crate::degrees_of_freedom::DegreesOfFreedom;
use crate::frame::Frame;
use crate::position::Position;
use crate::vector::Velocity;

/// Accumulates weighted positions and velocities.
///
/// # Examples
///
/// ```rust
/// use geometry::{Barycentre, Barycentric, DegreesOfFreedom, Position, Velocity};
///
/// let mut barycentre = Barycentre::<Barycentric>::new();
/// barycentre.add(
///     &DegreesOfFreedom::new(Position::new(0.0, 0.0, 0.0), Velocity::new(0.0, 1.0, 0.0)),
///     1.0,
/// );
/// barycentre.add(
///     &DegreesOfFreedom::new(Position::new(4.0, 0.0, 0.0), Velocity::new(0.0, -1.0, 0.0)),
///     3.0,
/// );
/// let centre = barycentre.get().unwrap();
/// assert_eq!(centre.position, Position::new(3.0, 0.0, 0.0));
/// assert_eq!(centre.velocity, Velocity::new(0.0, -0.5, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Barycentre<F: Frame> {
    weighted_positions: Vector3<f64>,
    weighted_velocities: Vector3<f64>,
    total_weight: f64,
    frame: std::marker::PhantomData<F>,
}

impl<F: Frame> Barycentre<F> {
    pub fn new() -> Self {
        Self {
            weighted_positions: Vector3::zeros(),
            weighted_velocities: Vector3::zeros(),
            total_weight: 0.0,
            frame: std::marker::PhantomData,
        }
    }

    pub fn add(&mut self, degrees_of_freedom: &DegreesOfFreedom<F>, weight: f64) {
        self.weighted_positions += degrees_of_freedom.position.coordinates() * weight;
        self.weighted_velocities += degrees_of_freedom.velocity.coordinates() * weight;
        self.total_weight += weight;
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Sum of weight × velocity over the inputs.
    pub fn weighted_velocity(&self) -> Velocity<F> {
        Velocity::from_coordinates(self.weighted_velocities)
    }

    /// The barycentre, or `None` if nothing with a positive total weight has
    /// been added.
    pub fn get(&self) -> Option<DegreesOfFreedom<F>> {
        if self.total_weight <= 0.0 {
            return None;
        }
        Some(DegreesOfFreedom::new(
            Position::from_coordinates(self.weighted_positions / self.total_weight),
            Velocity::from_coordinates(self.weighted_velocities / self.total_weight),
        ))
    }
}

impl<F: Frame> Default for Barycentre<F> {
    fn default() -> Self {
        Self::new()
    }
}
