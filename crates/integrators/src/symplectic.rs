//! Symplectic partitioned Runge–Kutta integration
//!
//! A step is a composition of alternating drifts (position updates using the
//! velocities) and kicks (momentum updates using the forces). The drift and
//! kick coefficients of a scheme each sum to one, which makes the step a
//! symplectic map: energy errors stay bounded over arbitrarily long
//! integrations instead of drifting like they do with explicit Euler or
//! classical Runge–Kutta methods.

use serde::{Deserialize, Serialize};
use tracing::debug;
use units::{Instant, Time};

use crate::error::IntegratorError;
use crate::parameters::FixedStepParameters;

const COEFFICIENT_SUM_TOLERANCE: f64 = 1e-10;

/// The named coefficient sets available to the ephemeris and to vessel
/// histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymplecticScheme {
    /// Störmer–Verlet in drift-kick-drift form, order 2.
    Leapfrog,
    /// Ruth (1983), order 3.
    Ruth1983,
    /// McLachlan & Atela (1992), optimal order 4 method.
    McLachlanAtela1992Order4Optimal,
    /// McLachlan & Atela (1992), optimal order 5 method.
    McLachlanAtela1992Order5Optimal,
}

/// The order in which the two halves of a stage are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Composition {
    /// Each stage drifts by aᵢ·Δt, then kicks by bᵢ·Δt.
    DriftKick,
    /// Each stage kicks by bᵢ·Δt, then drifts by aᵢ·Δt.
    KickDrift,
}

impl SymplecticScheme {
    /// Drift coefficients aᵢ followed by kick coefficients bᵢ, to be applied
    /// in the order given by [`SymplecticScheme::composition`].
    pub fn coefficients(&self) -> (&'static [f64], &'static [f64]) {
        match self {
            SymplecticScheme::Leapfrog => (&[0.5, 0.5], &[1.0, 0.0]),
            SymplecticScheme::Ruth1983 => (
                &[7.0 / 24.0, 3.0 / 4.0, -1.0 / 24.0],
                &[2.0 / 3.0, -2.0 / 3.0, 1.0],
            ),
            SymplecticScheme::McLachlanAtela1992Order4Optimal => (
                &[
                    0.515_352_837_431_122_936_4,
                    -0.085_782_019_412_973_646,
                    0.441_583_023_616_466_524_2,
                    0.128_846_158_365_384_185_4,
                ],
                &[
                    0.134_496_199_277_431_089_2,
                    -0.224_819_803_079_420_805_8,
                    0.756_320_000_515_668_291_1,
                    0.334_003_603_286_321_425_5,
                ],
            ),
            SymplecticScheme::McLachlanAtela1992Order5Optimal => (
                &[
                    0.339_839_625_839_11,
                    -0.088_601_336_903_027_329,
                    0.585_856_476_825_962_118_8,
                    -0.603_039_356_536_491_888,
                    0.323_580_796_554_697_639_4,
                    0.442_363_794_219_749_458_7,
                ],
                &[
                    0.119_390_029_287_567_275_8,
                    0.698_927_370_382_475_230_8,
                    -0.171_312_358_271_600_775_4,
                    0.401_269_502_251_353_448,
                    0.010_705_081_848_235_984,
                    -0.058_979_625_498_031_163_2,
                ],
            ),
        }
    }

    /// McLachlan & Atela publish their methods kick first; the others are
    /// written drift first.
    pub fn composition(&self) -> Composition {
        match self {
            SymplecticScheme::Leapfrog | SymplecticScheme::Ruth1983 => Composition::DriftKick,
            SymplecticScheme::McLachlanAtela1992Order4Optimal
            | SymplecticScheme::McLachlanAtela1992Order5Optimal => Composition::KickDrift,
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            SymplecticScheme::Leapfrog => 2,
            SymplecticScheme::Ruth1983 => 3,
            SymplecticScheme::McLachlanAtela1992Order4Optimal => 4,
            SymplecticScheme::McLachlanAtela1992Order5Optimal => 5,
        }
    }
}

impl Default for SymplecticScheme {
    fn default() -> Self {
        SymplecticScheme::McLachlanAtela1992Order5Optimal
    }
}

/// A separable Hamiltonian system H(q, p) = T(p) + V(q, t).
///
/// Positions and momenta are flat arrays; their layout (typically three
/// coordinates per body) is up to the implementor.
pub trait SeparableProblem {
    /// Writes −∂V/∂q at `time` and `positions` into `forces`.
    fn compute_force(&self, time: Instant, positions: &[f64], forces: &mut [f64]);

    /// Writes ∂T/∂p into `velocities`. The default is the identity, which is
    /// right whenever momenta are velocities.
    fn compute_velocity(&self, momenta: &[f64], velocities: &mut [f64]) {
        velocities.copy_from_slice(momenta);
    }
}

/// Positions and momenta at a given time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub time: Instant,
    pub positions: Vec<f64>,
    pub momenta: Vec<f64>,
}

impl SystemState {
    pub fn new(
        time: Instant,
        positions: Vec<f64>,
        momenta: Vec<f64>,
    ) -> Result<Self, IntegratorError> {
        if positions.len() != momenta.len() {
            return Err(IntegratorError::StateDimensionMismatch {
                positions: positions.len(),
                momenta: momenta.len(),
            });
        }
        Ok(Self {
            time,
            positions,
            momenta,
        })
    }

    pub fn dimension(&self) -> usize {
        self.positions.len()
    }
}

/// A validated symplectic partitioned Runge–Kutta method with a fixed step.
///
/// # Examples
///
/// ```
/// use integrators::{
///     FixedStepParameters, SeparableProblem, SymplecticPartitionedRungeKutta,
///     SymplecticScheme, SystemState,
/// };
/// use units::{Instant, Time};
///
/// struct Oscillator;
///
/// impl SeparableProblem for Oscillator {
///     fn compute_force(&self, _time: Instant, q: &[f64], f: &mut [f64]) {
///         f[0] = -q[0];
///     }
/// }
///
/// let parameters =
///     FixedStepParameters::new(SymplecticScheme::default(), Time::from_seconds(0.1)).unwrap();
/// let integrator = SymplecticPartitionedRungeKutta::new(&parameters).unwrap();
/// let mut state = SystemState::new(Instant::J2000, vec![1.0], vec![0.0]).unwrap();
/// integrator.integrate(&Oscillator, &mut state, 10);
///
/// assert!((state.positions[0] - 1.0_f64.cos()).abs() < 1e-7);
/// ```
#[derive(Debug, Clone)]
pub struct SymplecticPartitionedRungeKutta {
    drift: Vec<f64>,
    kick: Vec<f64>,
    composition: Composition,
    // Fraction of the step drifted when each stage evaluates its forces.
    stage_offsets: Vec<f64>,
    step: Time,
}

impl SymplecticPartitionedRungeKutta {
    /// Builds the integrator for a named scheme.
    pub fn new(parameters: &FixedStepParameters) -> Result<Self, IntegratorError> {
        let (drift, kick) = parameters.scheme.coefficients();
        Self::from_coefficients(drift, kick, parameters.scheme.composition(), parameters.step)
    }

    /// Builds the integrator from explicit coefficients, checking that they
    /// describe a consistent method.
    pub fn from_coefficients(
        drift: &[f64],
        kick: &[f64],
        composition: Composition,
        step: Time,
    ) -> Result<Self, IntegratorError> {
        if drift.len() != kick.len() {
            return Err(IntegratorError::MismatchedCoefficients {
                positions: drift.len(),
                momenta: kick.len(),
            });
        }
        if drift.is_empty() {
            return Err(IntegratorError::EmptyScheme);
        }
        for (kind, coefficients) in [("position", drift), ("momentum", kick)] {
            if let Some(index) = coefficients.iter().position(|c| !c.is_finite()) {
                return Err(IntegratorError::NonFiniteCoefficient { kind, index });
            }
            let sum: f64 = coefficients.iter().sum();
            if (sum - 1.0).abs() > COEFFICIENT_SUM_TOLERANCE {
                return Err(IntegratorError::InconsistentCoefficientSum { kind, sum });
            }
        }
        let seconds = step.to_seconds();
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(IntegratorError::NonPositiveStep(seconds));
        }

        let stage_offsets = drift
            .iter()
            .scan(0.0, |acc, a| {
                let before = *acc;
                *acc += a;
                Some(match composition {
                    Composition::DriftKick => *acc,
                    Composition::KickDrift => before,
                })
            })
            .collect();

        Ok(Self {
            drift: drift.to_vec(),
            kick: kick.to_vec(),
            composition,
            stage_offsets,
            step,
        })
    }

    pub fn step(&self) -> Time {
        self.step
    }

    /// Advances `state` by `dt`, which need not be the nominal step.
    pub fn advance<P: SeparableProblem + ?Sized>(
        &self,
        problem: &P,
        state: &mut SystemState,
        dt: Time,
    ) {
        let h = dt.to_seconds();
        let n = state.dimension();
        let mut velocities = vec![0.0; n];
        let mut forces = vec![0.0; n];

        for ((a, b), offset) in self.drift.iter().zip(&self.kick).zip(&self.stage_offsets) {
            match self.composition {
                Composition::DriftKick => {
                    drift(problem, state, a * h, &mut velocities);
                    kick(problem, state, dt * *offset, b * h, &mut forces);
                }
                Composition::KickDrift => {
                    kick(problem, state, dt * *offset, b * h, &mut forces);
                    drift(problem, state, a * h, &mut velocities);
                }
            }
        }

        state.time += dt;
    }

    /// Advances `state` by `n_steps` nominal steps.
    pub fn integrate<P: SeparableProblem + ?Sized>(
        &self,
        problem: &P,
        state: &mut SystemState,
        n_steps: usize,
    ) {
        for _ in 0..n_steps {
            self.advance(problem, state, self.step);
        }
    }

    /// Integrates from `initial` up to `tmax`.
    ///
    /// Every `sampling_period`-th state is returned, as well as the final
    /// state; a `sampling_period` of zero returns only the final state. When
    /// `tmax_is_exact` is set, a shorter last step lands exactly on `tmax`;
    /// otherwise integration stops at the last whole step not after `tmax`.
    pub fn solve<P: SeparableProblem + ?Sized>(
        &self,
        problem: &P,
        initial: &SystemState,
        tmax: Instant,
        sampling_period: usize,
        tmax_is_exact: bool,
    ) -> Vec<SystemState> {
        let mut state = initial.clone();
        let mut solution = Vec::new();
        let mut steps = 0usize;
        let mut last_sampled = false;

        while tmax - state.time >= self.step {
            self.advance(problem, &mut state, self.step);
            steps += 1;
            last_sampled = sampling_period != 0 && steps % sampling_period == 0;
            if last_sampled {
                solution.push(state.clone());
            }
        }

        if tmax_is_exact && state.time < tmax {
            let dt = tmax - state.time;
            self.advance(problem, &mut state, dt);
            state.time = tmax;
            last_sampled = false;
        }

        if !last_sampled && state.time > initial.time {
            solution.push(state);
        }

        debug!(steps, final_time = %tmax, "symplectic integration done");
        solution
    }
}

fn drift<P: SeparableProblem + ?Sized>(
    problem: &P,
    state: &mut SystemState,
    weight: f64,
    velocities: &mut [f64],
) {
    if weight == 0.0 {
        return;
    }
    problem.compute_velocity(&state.momenta, velocities);
    state
        .positions
        .iter_mut()
        .zip(velocities.iter())
        .for_each(|(q, v)| *q += weight * v);
}

// `state.time` is still the start of the step; `offset` locates the
// positions within it.
fn kick<P: SeparableProblem + ?Sized>(
    problem: &P,
    state: &mut SystemState,
    offset: Time,
    weight: f64,
    forces: &mut [f64],
) {
    if weight == 0.0 {
        return;
    }
    problem.compute_force(state.time + offset, &state.positions, forces);
    state
        .momenta
        .iter_mut()
        .zip(forces.iter())
        .for_each(|(p, f)| *p += weight * f);
}
