//! Embedded Runge–Kutta integration with step size control
//!
//! The Dormand–Prince 5(4) pair advances a second-order system
//! q̈ = a(t, q, q̇) written as the first-order system (q, v). The difference
//! between the fifth and fourth order solutions estimates the local error,
//! which is compared separately against a length tolerance (positions) and
//! a speed tolerance (velocities) to accept or reject each step and to size
//! the next one.

use tracing::{debug, warn};
use units::{Instant, Time};

use crate::parameters::AdaptiveStepParameters;

/// Safety factor applied to the optimal step size estimate.
const SAFETY_FACTOR: f64 = 0.9;

/// Bounds on the ratio of two successive step sizes.
const MIN_STEP_FACTOR: f64 = 0.1;
const MAX_STEP_FACTOR: f64 = 5.0;

/// 1 / (order of the embedded method + 1).
const STEP_EXPONENT: f64 = 1.0 / 5.0;

const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// Weights of the propagated fifth order solution.
const B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Weights of the embedded fourth order solution.
const B_HAT: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// A second-order system of ordinary differential equations.
pub trait SecondOrderProblem {
    /// Writes q̈ at `time`, `positions` and `velocities` into `accelerations`.
    fn compute_acceleration(
        &self,
        time: Instant,
        positions: &[f64],
        velocities: &[f64],
        accelerations: &mut [f64],
    );
}

/// How an adaptive integration ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdaptiveStepOutcome {
    /// The final time was reached exactly.
    ReachedFinalTime,
    /// `max_steps` steps were accepted before reaching the final time.
    StepBudgetExhausted { time: Instant },
    /// The error could not be brought under tolerance without the step
    /// vanishing at `time`: the problem is too stiff there, typically because
    /// of a close approach to a point mass.
    StepSizeUnderflow { time: Instant, step: Time },
}

impl AdaptiveStepOutcome {
    pub fn reached_final_time(&self) -> bool {
        matches!(self, AdaptiveStepOutcome::ReachedFinalTime)
    }
}

/// The Dormand–Prince 5(4) integrator.
///
/// # Examples
///
/// ```
/// use integrators::{AdaptiveStepParameters, DormandPrince54, SecondOrderProblem};
/// use units::{Instant, Length, Speed, Time};
///
/// struct Fall;
///
/// impl SecondOrderProblem for Fall {
///     fn compute_acceleration(&self, _t: Instant, _q: &[f64], _v: &[f64], a: &mut [f64]) {
///         a[0] = -9.81;
///     }
/// }
///
/// let parameters = AdaptiveStepParameters::new(
///     100,
///     Length::from_mm(1.0),
///     Speed::from_mm_per_second(1.0),
/// )
/// .unwrap();
/// let t1 = Instant::J2000 + Time::from_seconds(2.0);
/// let mut last = (Instant::J2000, 0.0);
/// let outcome = DormandPrince54.solve(
///     &Fall,
///     Instant::J2000,
///     &[0.0],
///     &[0.0],
///     t1,
///     &parameters,
///     |t, q, _v| last = (t, q[0]),
/// );
///
/// assert!(outcome.reached_final_time());
/// assert_eq!(last.0, t1);
/// assert!((last.1 + 0.5 * 9.81 * 4.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrince54;

impl DormandPrince54 {
    /// Integrates from (`t0`, `q0`, `v0`) towards `t_final`, calling
    /// `append` with the state after each accepted step.
    ///
    /// The last step is shortened so that the last appended time is exactly
    /// `t_final`. Stage evaluations never take place after the end of the
    /// current step.
    #[allow(clippy::too_many_arguments)]
    pub fn solve<P, Append>(
        &self,
        problem: &P,
        t0: Instant,
        q0: &[f64],
        v0: &[f64],
        t_final: Instant,
        parameters: &AdaptiveStepParameters,
        mut append: Append,
    ) -> AdaptiveStepOutcome
    where
        P: SecondOrderProblem + ?Sized,
        Append: FnMut(Instant, &[f64], &[f64]),
    {
        let n = q0.len();
        let length_tolerance = parameters.length_integration_tolerance.to_meters();
        let speed_tolerance = parameters.speed_integration_tolerance.to_meters_per_second();

        let mut t = t0;
        let mut q = q0.to_vec();
        let mut v = v0.to_vec();
        let mut h = (t_final - t0).to_seconds();
        let mut accepted = 0usize;

        // Stage derivatives of the positions (velocities) and of the
        // velocities (accelerations).
        let mut kq = vec![vec![0.0; n]; 7];
        let mut kv = vec![vec![0.0; n]; 7];
        let mut stage_q = vec![0.0; n];
        let mut stage_v = vec![0.0; n];
        let mut q_new = vec![0.0; n];
        let mut v_new = vec![0.0; n];

        while t < t_final {
            if accepted >= parameters.max_steps {
                debug!(steps = accepted, time = %t, "adaptive step budget exhausted");
                return AdaptiveStepOutcome::StepBudgetExhausted { time: t };
            }

            let remaining = (t_final - t).to_seconds();
            let is_last = h >= remaining;
            let h_step = if is_last { remaining } else { h };
            let step_end = if is_last { t_final } else { t + Time::from_seconds(h_step) };
            if !(h_step > 0.0) || step_end <= t {
                warn!(time = %t, step = h_step, "adaptive step size underflow");
                return AdaptiveStepOutcome::StepSizeUnderflow {
                    time: t,
                    step: Time::from_seconds(h_step),
                };
            }

            for stage in 0..7 {
                for j in 0..n {
                    let mut dq = 0.0;
                    let mut dv = 0.0;
                    for (m, a) in A[stage].iter().enumerate().take(stage) {
                        dq += a * kq[m][j];
                        dv += a * kv[m][j];
                    }
                    stage_q[j] = q[j] + h_step * dq;
                    stage_v[j] = v[j] + h_step * dv;
                }
                let stage_time = (t + Time::from_seconds(C[stage] * h_step)).min(step_end);
                kq[stage].copy_from_slice(&stage_v);
                problem.compute_acceleration(stage_time, &stage_q, &stage_v, &mut kv[stage]);
            }

            let mut position_error = 0.0;
            let mut velocity_error = 0.0;
            for j in 0..n {
                let mut dq = 0.0;
                let mut dv = 0.0;
                let mut eq = 0.0;
                let mut ev = 0.0;
                for stage in 0..7 {
                    dq += B[stage] * kq[stage][j];
                    dv += B[stage] * kv[stage][j];
                    eq += (B[stage] - B_HAT[stage]) * kq[stage][j];
                    ev += (B[stage] - B_HAT[stage]) * kv[stage][j];
                }
                q_new[j] = q[j] + h_step * dq;
                v_new[j] = v[j] + h_step * dv;
                position_error += (h_step * eq).powi(2);
                velocity_error += (h_step * ev).powi(2);
            }

            let ratio = tolerance_to_error_ratio(
                length_tolerance,
                position_error.sqrt(),
                speed_tolerance,
                velocity_error.sqrt(),
            );

            if ratio < 1.0 {
                h = h_step * (SAFETY_FACTOR * ratio.powf(STEP_EXPONENT)).max(MIN_STEP_FACTOR);
                continue;
            }

            t = step_end;
            q.copy_from_slice(&q_new);
            v.copy_from_slice(&v_new);
            accepted += 1;
            append(t, &q, &v);

            h = h_step * (SAFETY_FACTOR * ratio.powf(STEP_EXPONENT)).min(MAX_STEP_FACTOR);
        }

        AdaptiveStepOutcome::ReachedFinalTime
    }
}

/// The smaller of the two tolerance-to-error ratios, zero if either error is
/// not a number so that the step is rejected.
fn tolerance_to_error_ratio(
    length_tolerance: f64,
    position_error: f64,
    speed_tolerance: f64,
    velocity_error: f64,
) -> f64 {
    if position_error.is_nan() || velocity_error.is_nan() {
        return 0.0;
    }
    (length_tolerance / position_error).min(speed_tolerance / velocity_error)
}
