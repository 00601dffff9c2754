//! Frame-tagged geometry for the simulation core.
//!
//! Positions, displacements, velocities and accelerations carry the
//! reference frame they are expressed in as a type parameter, so mixing
//! frames is a compile error and changing frames is always an explicit
//! [`Rotation`] or [`AffineMap`].

pub mod affine_map;
pub mod barycentre;
pub mod degrees_of_freedom;
pub mod frame;
pub mod frame_field;
pub mod position;
pub mod rotation;
pub mod vector;

#[cfg(test)]
mod degrees_of_freedom_test;
#[cfg(test)]
mod frame_field_test;

pub use affine_map::AffineMap;
pub use barycentre::Barycentre;
pub use degrees_of_freedom::{DegreesOfFreedom, RelativeDegreesOfFreedom};
pub use frame::{Barycentric, BodySurface, Frame, Frenet, World};
pub use frame_field::frenet_trihedron;
pub use position::Position;
pub use rotation::Rotation;
pub use vector::{Acceleration, Displacement, Vector, Velocity};
