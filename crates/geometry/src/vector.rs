use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use units::Time;

use crate::frame::Frame;

macro_rules! frame_vector {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        #[serde(transparent, bound = "")]
        pub struct $name<F: Frame> {
            coordinates: Vector3<f64>,
            #[serde(skip)]
            frame: PhantomData<F>,
        }

        impl<F: Frame> $name<F> {
            pub fn new(x: f64, y: f64, z: f64) -> Self {
                Self::from_coordinates(Vector3::new(x, y, z))
            }

            pub fn from_coordinates(coordinates: Vector3<f64>) -> Self {
                Self {
                    coordinates,
                    frame: PhantomData,
                }
            }

            pub fn zero() -> Self {
                Self::from_coordinates(Vector3::zeros())
            }

            pub fn coordinates(&self) -> Vector3<f64> {
                self.coordinates
            }

            pub fn norm(&self) -> f64 {
                self.coordinates.norm()
            }

            pub fn norm_squared(&self) -> f64 {
                self.coordinates.norm_squared()
            }

            pub fn dot(&self, other: &Self) -> f64 {
                self.coordinates.dot(&other.coordinates)
            }
        }

        impl<F: Frame> Default for $name<F> {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl<F: Frame> Add for $name<F> {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self::from_coordinates(self.coordinates + rhs.coordinates)
            }
        }

        impl<F: Frame> Sub for $name<F> {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self::from_coordinates(self.coordinates - rhs.coordinates)
            }
        }

        impl<F: Frame> Neg for $name<F> {
            type Output = Self;

            fn neg(self) -> Self {
                Self::from_coordinates(-self.coordinates)
            }
        }

        impl<F: Frame> Mul<f64> for $name<F> {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self::from_coordinates(self.coordinates * rhs)
            }
        }

        impl<F: Frame> Div<f64> for $name<F> {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self::from_coordinates(self.coordinates / rhs)
            }
        }

        impl<F: Frame> AddAssign for $name<F> {
            fn add_assign(&mut self, rhs: Self) {
                self.coordinates += rhs.coordinates;
            }
        }

        impl<F: Frame> SubAssign for $name<F> {
            fn sub_assign(&mut self, rhs: Self) {
                self.coordinates -= rhs.coordinates;
            }
        }
    };
}

frame_vector!(
    /// A dimensionless vector, such as a direction.
    Vector
);

frame_vector!(
    /// The difference of two positions, in meters.
    Displacement
);

frame_vector!(
    /// A velocity, in meters per second.
    Velocity
);

frame_vector!(
    /// An acceleration, in meters per second squared.
    Acceleration
);

impl<F: Frame> Mul<Time> for Velocity<F> {
    type Output = Displacement<F>;

    fn mul(self, rhs: Time) -> Displacement<F> {
        Displacement::from_coordinates(self.coordinates * rhs.to_seconds())
    }
}

impl<F: Frame> Div<Time> for Displacement<F> {
    type Output = Velocity<F>;

    fn div(self, rhs: Time) -> Velocity<F> {
        Velocity::from_coordinates(self.coordinates / rhs.to_seconds())
    }
}

impl<F: Frame> Mul<Time> for Acceleration<F> {
    type Output = Velocity<F>;

    fn mul(self, rhs: Time) -> Velocity<F> {
        Velocity::from_coordinates(self.coordinates * rhs.to_seconds())
    }
}
