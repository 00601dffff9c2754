//! Chebyshev series in time
//!
//! A [`ChebyshevSeries`] represents a vector valued function over a closed
//! interval of time as Σ cₖ Tₖ(x), where x maps the interval onto [-1, 1].
//! Series are fitted by least squares to positions and velocities, and are
//! evaluated with the Clenshaw recurrence.

use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use units::Instant;

use crate::error::TrajectoryError;

/// Singular values below this are treated as zero when solving the least
/// squares problem. The design matrix has entries of order one.
const SINGULAR_VALUE_EPSILON: f64 = 1e-14;

/// A Chebyshev series over `[t_min, t_max]`.
///
/// The coefficients are in meters; the derivative is in meters per second.
#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevSeries {
    t_min: Instant,
    t_max: Instant,
    coefficients: Vec<Vector3<f64>>,
    derivative_coefficients: Vec<Vector3<f64>>,
}

/// A position and velocity to fit, at the given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittingSample {
    pub time: Instant,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl ChebyshevSeries {
    pub fn new(t_min: Instant, t_max: Instant, coefficients: Vec<Vector3<f64>>) -> Self {
        let derivative_coefficients = derivative(&coefficients, (t_max - t_min).to_seconds());
        Self {
            t_min,
            t_max,
            coefficients,
            derivative_coefficients,
        }
    }

    /// Fits a series of the given `degree` to `samples`, which must be in
    /// increasing time order with distinct first and last times.
    ///
    /// Each sample contributes one equation for its position and one for
    /// its velocity scaled to the length of the interval, so that both are
    /// weighted alike.
    pub fn fit(samples: &[FittingSample], degree: usize) -> Result<Self, TrajectoryError> {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Err(TrajectoryError::FittingFailed("no samples"));
        };
        let (t_min, t_max) = (first.time, last.time);
        let duration = (t_max - t_min).to_seconds();
        if !(duration > 0.0) {
            return Err(TrajectoryError::FittingFailed("degenerate interval"));
        }
        let half_duration = 0.5 * duration;

        let columns = degree + 1;
        let rows = 2 * samples.len();
        let mut design = DMatrix::<f64>::zeros(rows, columns);
        let mut rhs = DMatrix::<f64>::zeros(rows, 3);

        for (i, sample) in samples.iter().enumerate() {
            let x = normalize(sample.time, t_min, duration);
            let (values, slopes) = basis(x, degree);
            for k in 0..columns {
                design[(2 * i, k)] = values[k];
                design[(2 * i + 1, k)] = slopes[k];
            }
            for c in 0..3 {
                rhs[(2 * i, c)] = sample.position[c];
                rhs[(2 * i + 1, c)] = sample.velocity[c] * half_duration;
            }
        }

        let solution = design
            .svd(true, true)
            .solve(&rhs, SINGULAR_VALUE_EPSILON)
            .map_err(TrajectoryError::FittingFailed)?;

        let coefficients = (0..columns)
            .map(|k| Vector3::new(solution[(k, 0)], solution[(k, 1)], solution[(k, 2)]))
            .collect();
        Ok(Self::new(t_min, t_max, coefficients))
    }

    pub fn t_min(&self) -> Instant {
        self.t_min
    }

    pub fn t_max(&self) -> Instant {
        self.t_max
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[Vector3<f64>] {
        &self.coefficients
    }

    pub fn contains(&self, t: Instant) -> bool {
        self.t_min <= t && t <= self.t_max
    }

    /// Value at `t`. Times outside of the interval extrapolate.
    pub fn evaluate(&self, t: Instant) -> Vector3<f64> {
        clenshaw(&self.coefficients, self.normalized(t))
    }

    /// Derivative with respect to time at `t`, per second.
    pub fn evaluate_derivative(&self, t: Instant) -> Vector3<f64> {
        clenshaw(&self.derivative_coefficients, self.normalized(t))
    }

    /// Largest distance between the series and the positions of `samples`.
    pub fn max_position_error(&self, samples: &[FittingSample]) -> f64 {
        samples
            .iter()
            .map(|s| (self.evaluate(s.time) - s.position).norm())
            .fold(0.0, f64::max)
    }

    fn normalized(&self, t: Instant) -> f64 {
        normalize(t, self.t_min, (self.t_max - self.t_min).to_seconds())
    }

    pub fn to_message(&self) -> ChebyshevSeriesMessage {
        ChebyshevSeriesMessage {
            t_min: self.t_min,
            t_max: self.t_max,
            coefficients: self.coefficients.clone(),
        }
    }

    pub fn from_message(message: &ChebyshevSeriesMessage) -> Result<Self, TrajectoryError> {
        if !(message.t_min < message.t_max) || message.coefficients.is_empty() {
            return Err(TrajectoryError::FittingFailed("malformed series"));
        }
        Ok(Self::new(
            message.t_min,
            message.t_max,
            message.coefficients.clone(),
        ))
    }
}

/// Persisted form of a [`ChebyshevSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChebyshevSeriesMessage {
    pub t_min: Instant,
    pub t_max: Instant,
    pub coefficients: Vec<Vector3<f64>>,
}

fn normalize(t: Instant, t_min: Instant, duration: f64) -> f64 {
    2.0 * (t - t_min).to_seconds() / duration - 1.0
}

/// Tₖ(x) and dTₖ/dx for k in 0..=degree.
fn basis(x: f64, degree: usize) -> (Vec<f64>, Vec<f64>) {
    let mut values = vec![0.0; degree + 1];
    let mut slopes = vec![0.0; degree + 1];
    // Chebyshev polynomials of the second kind, dTₖ/dx = k Uₖ₋₁.
    let mut u = vec![0.0; degree + 1];

    values[0] = 1.0;
    u[0] = 1.0;
    if degree >= 1 {
        values[1] = x;
        u[1] = 2.0 * x;
    }
    for k in 2..=degree {
        values[k] = 2.0 * x * values[k - 1] - values[k - 2];
        u[k] = 2.0 * x * u[k - 1] - u[k - 2];
    }
    for k in 1..=degree {
        slopes[k] = k as f64 * u[k - 1];
    }
    (values, slopes)
}

/// Evaluates Σ cₖ Tₖ(x) with the Clenshaw recurrence.
fn clenshaw(coefficients: &[Vector3<f64>], x: f64) -> Vector3<f64> {
    let n = coefficients.len();
    if n == 0 {
        return Vector3::zeros();
    }

    // b_k = c_k + 2x b_{k+1} - b_{k+2}
    let mut b1 = Vector3::zeros();
    let mut b2 = Vector3::zeros();
    let x2 = 2.0 * x;
    for c in coefficients[1..].iter().rev() {
        let b0 = c + b1 * x2 - b2;
        b2 = b1;
        b1 = b0;
    }
    coefficients[0] + b1 * x - b2
}

/// Coefficients of the time derivative of a series spanning `duration`
/// seconds.
fn derivative(coefficients: &[Vector3<f64>], duration: f64) -> Vec<Vector3<f64>> {
    let n = coefficients.len();
    if n <= 1 {
        return vec![Vector3::zeros()];
    }

    // d_{k-1} = d_{k+1} + 2k c_k, from the top down.
    let mut d = vec![Vector3::zeros(); n + 1];
    for k in (1..n).rev() {
        d[k - 1] = d[k + 1] + coefficients[k] * (2.0 * k as f64);
    }
    d.truncate(n - 1);
    d[0] *= 0.5;

    let scale = 2.0 / duration;
    d.iter().map(|c| c * scale).collect()
}
