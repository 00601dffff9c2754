use crate::degrees_of_freedom::DegreesOfFreedom;
use crate::frame::Frame;
use crate::position::Position;
use crate::rotation::Rotation;
use crate::vector::Velocity;

/// A rigid motion from frame `From` to frame `To`: the point `from_origin`
/// maps to `to_origin` and displacements are rotated.
///
/// Velocities are mapped relative to a reference velocity, which is how the
/// barycentric frame is shown in the host's frame co-moving with a
/// celestial.
#[derive(Debug, Clone, Copy)]
pub struct AffineMap<From: Frame, To: Frame> {
    from_origin: Position<From>,
    to_origin: Position<To>,
    reference_velocity: Velocity<From>,
    rotation: Rotation<From, To>,
}

impl<From: Frame, To: Frame> AffineMap<From, To> {
    pub fn new(
        from_origin: Position<From>,
        to_origin: Position<To>,
        reference_velocity: Velocity<From>,
        rotation: Rotation<From, To>,
    ) -> Self {
        Self {
            from_origin,
            to_origin,
            reference_velocity,
            rotation,
        }
    }

    pub fn apply_position(&self, position: Position<From>) -> Position<To> {
        self.to_origin + self.rotation.apply_displacement(position - self.from_origin)
    }

    pub fn apply(&self, degrees_of_freedom: &DegreesOfFreedom<From>) -> DegreesOfFreedom<To> {
        DegreesOfFreedom::new(
            self.apply_position(degrees_of_freedom.position),
            self.rotation
                .apply_velocity(degrees_of_freedom.velocity - self.reference_velocity),
        )
    }

    pub fn inverse(&self) -> AffineMap<To, From> {
        AffineMap {
            from_origin: self.to_origin,
            to_origin: self.from_origin,
            reference_velocity: -self.rotation.apply_velocity(self.reference_velocity),
            rotation: self.rotation.inverse(),
        }
    }
}
