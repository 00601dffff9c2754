use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Add, Sub};

use crate::frame::Frame;
use crate::vector::Displacement;

/// A point of the affine space of frame `F`.
///
/// Positions cannot be added together; only a [`Displacement`] may be added
/// to a position, and the difference of two positions is a displacement.
///
/// # Examples
///
/// ```rust
/// use geometry::{Barycentric, Displacement, Position};
///
/// let a = Position::<Barycentric>::new(1.0, 2.0, 3.0);
/// let b = a + Displacement::new(1.0, 0.0, 0.0);
/// assert_eq!((b - a).norm(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Position<F: Frame> {
    coordinates: Vector3<f64>,
    #[serde(skip)]
    frame: PhantomData<F>,
}

impl<F: Frame> Position<F> {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_coordinates(Vector3::new(x, y, z))
    }

    /// The position whose displacement from the origin is `coordinates`.
    pub fn from_coordinates(coordinates: Vector3<f64>) -> Self {
        Self {
            coordinates,
            frame: PhantomData,
        }
    }

    pub fn origin() -> Self {
        Self::from_coordinates(Vector3::zeros())
    }

    pub fn coordinates(&self) -> Vector3<f64> {
        self.coordinates
    }

    /// The displacement of this point from the origin of the frame.
    pub fn from_origin(&self) -> Displacement<F> {
        Displacement::from_coordinates(self.coordinates)
    }
}

impl<F: Frame> Default for Position<F> {
    fn default() -> Self {
        Self::origin()
    }
}

impl<F: Frame> Sub for Position<F> {
    type Output = Displacement<F>;

    fn sub(self, rhs: Self) -> Displacement<F> {
        Displacement::from_coordinates(self.coordinates - rhs.coordinates)
    }
}

impl<F: Frame> Add<Displacement<F>> for Position<F> {
    type Output = Position<F>;

    fn add(self, rhs: Displacement<F>) -> Position<F> {
        Position::from_coordinates(self.coordinates + rhs.coordinates())
    }
}

impl<F: Frame> Sub<Displacement<F>> for Position<F> {
    type Output = Position<F>;

    fn sub(self, rhs: Displacement<F>) -> Position<F> {
        Position::from_coordinates(self.coordinates - rhs.coordinates())
    }
}
