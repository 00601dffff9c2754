//! Cubic Hermite interpolation
//!
//! A [`Hermite3`] is the unique cubic matching given values and first
//! derivatives at both ends of an interval. It interpolates positions of
//! discrete trajectories between samples (with velocities as derivatives)
//! and locates the extrema of distances for apsides.

use std::ops::{Add, Mul, Sub};
use units::{Instant, Time};

/// Values that can be interpolated: a vector space over `f64`.
pub trait HermiteValue: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self> {}

impl<T> HermiteValue for T where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>
{
}

/// A cubic polynomial in the time elapsed since the start of its interval,
/// p(s) = a₀ + a₁s + a₂s² + a₃s³ with s in seconds.
#[derive(Debug, Clone, Copy)]
pub struct Hermite3<V: HermiteValue> {
    arguments: (Instant, Instant),
    a0: V,
    a1: V,
    a2: V,
    a3: V,
}

impl<V: HermiteValue> Hermite3<V> {
    /// Builds the interpolant from the `values` and `derivatives` (per
    /// second) at the two `arguments`.
    pub fn new(arguments: (Instant, Instant), values: (V, V), derivatives: (V, V)) -> Self {
        let h = (arguments.1 - arguments.0).to_seconds();
        let (v0, v1) = values;
        let (d0, d1) = derivatives;
        let slope = (v1 - v0) * (1.0 / h);
        let a2 = (slope * 3.0 - d0 * 2.0 - d1) * (1.0 / h);
        let a3 = (d0 + d1 - slope * 2.0) * (1.0 / (h * h));
        Self {
            arguments,
            a0: v0,
            a1: d0,
            a2,
            a3,
        }
    }

    pub fn arguments(&self) -> (Instant, Instant) {
        self.arguments
    }

    pub fn evaluate(&self, argument: Instant) -> V {
        let s = (argument - self.arguments.0).to_seconds();
        self.a0 + (self.a1 + (self.a2 + self.a3 * s) * s) * s
    }

    pub fn evaluate_derivative(&self, argument: Instant) -> V {
        let s = (argument - self.arguments.0).to_seconds();
        self.a1 + (self.a2 * 2.0 + self.a3 * (3.0 * s)) * s
    }

    pub fn evaluate_second_derivative(&self, argument: Instant) -> V {
        let s = (argument - self.arguments.0).to_seconds();
        self.a2 * 2.0 + self.a3 * (6.0 * s)
    }
}

impl Hermite3<f64> {
    /// The arguments at which the derivative vanishes, in increasing order.
    ///
    /// These are not restricted to the interval of the interpolant; callers
    /// filter them. A constant polynomial has no extrema.
    pub fn find_extrema(&self) -> Vec<Instant> {
        // Roots of 3a₃s² + 2a₂s + a₁.
        let a = 3.0 * self.a3;
        let b = 2.0 * self.a2;
        let c = self.a1;
        let mut roots = Vec::with_capacity(2);

        if a == 0.0 {
            if b != 0.0 {
                roots.push(-c / b);
            }
        } else {
            let discriminant = b * b - 4.0 * a * c;
            if discriminant >= 0.0 {
                // Avoids cancellation between b and the square root.
                let q = -0.5 * (b + b.signum() * discriminant.sqrt());
                if q != 0.0 {
                    roots.push(q / a);
                    roots.push(c / q);
                } else {
                    roots.push(0.0);
                }
            }
        }

        roots.sort_by(|x, y| x.total_cmp(y));
        roots.dedup();
        roots
            .into_iter()
            .filter(|s| s.is_finite())
            .map(|s| self.arguments.0 + Time::from_seconds(s))
            .collect()
    }

    /// Whether every non-constant term is negligible next to `scale` over the
    /// whole interval.
    pub fn is_flat(&self, relative_tolerance: f64, scale: f64) -> bool {
        let h = (self.arguments.1 - self.arguments.0).to_seconds();
        let threshold = relative_tolerance * scale.abs();
        (self.a1 * h).abs() <= threshold
            && (self.a2 * h * h).abs() <= threshold
            && (self.a3 * h * h * h).abs() <= threshold
    }
}
