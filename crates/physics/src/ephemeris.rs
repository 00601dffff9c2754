//! The ephemeris of the massive bodies
//!
//! An [`Ephemeris`] integrates the massive bodies with a fixed-step
//! symplectic method and stores their motion as continuous trajectories.
//! Massless bodies (vessels, centres of mass of pile-ups) are then flowed in
//! the field of the massive bodies, either on their own fixed step or with
//! the adaptive Dormand–Prince method.
//!
//! Integration failures of massless bodies do not make the ephemeris
//! unusable: the samples computed before the failure are kept and the
//! failure is latched until read with
//! [`Ephemeris::take_severe_integration_failure`].

use std::collections::BTreeMap;

use geometry::{Acceleration, DegreesOfFreedom, Frame, Position, Velocity};
use integrators::{
    AdaptiveStepOutcome, AdaptiveStepParameters, DormandPrince54, FixedStepParameters, Hermite3,
    SecondOrderProblem, SeparableProblem, SymplecticPartitionedRungeKutta, SystemState,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use units::{Instant, Length};

use crate::body::{BodyIndex, BodyMessage, MassiveBody};
use crate::continuous_trajectory::{ContinuousTrajectory, ContinuousTrajectoryMessage};
use crate::discrete_trajectory::{interpolate, DiscreteTrajectoryTree, Sample, TrajectoryId};
use crate::error::EphemerisError;
use crate::gravity::{compute_massless_acceleration, compute_mutual_accelerations};

/// Fitting tolerance of the continuous trajectories unless configured
/// otherwise.
pub const DEFAULT_FITTING_TOLERANCE_MM: f64 = 1.0;

/// Pass as `max_ephemeris_steps` to let the ephemeris be prolonged as far as
/// needed.
pub const UNLIMITED_MAX_EPHEMERIS_STEPS: usize = usize::MAX;

/// Squared distances are flat over an interval when they vary by less than
/// this fraction of their magnitude.
const APSIS_FLATNESS_TOLERANCE: f64 = 1e-12;

pub fn default_fitting_tolerance() -> Length {
    Length::from_mm(DEFAULT_FITTING_TOLERANCE_MM)
}

/// Collects the massive bodies and their initial degrees of freedom.
#[derive(Debug, Clone, Default)]
pub struct EphemerisBuilder<F: Frame> {
    bodies: BTreeMap<usize, (MassiveBody, DegreesOfFreedom<F>)>,
}

impl<F: Frame> EphemerisBuilder<F> {
    pub fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
        }
    }

    /// Registers a body at the next free index.
    pub fn add_body(
        &mut self,
        body: MassiveBody,
        degrees_of_freedom: DegreesOfFreedom<F>,
    ) -> BodyIndex {
        let index = self.bodies.keys().next_back().map_or(0, |last| last + 1);
        self.bodies.insert(index, (body, degrees_of_freedom));
        BodyIndex(index)
    }

    /// Registers a body at a given index, which must not be taken.
    pub fn insert_body(
        &mut self,
        index: BodyIndex,
        body: MassiveBody,
        degrees_of_freedom: DegreesOfFreedom<F>,
    ) -> Result<(), EphemerisError> {
        if self.bodies.contains_key(&index.0) {
            return Err(EphemerisError::DuplicateBody(index.0));
        }
        self.bodies.insert(index.0, (body, degrees_of_freedom));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Builds the ephemeris. Body indices must be exactly `0..n`.
    pub fn build(
        self,
        initial_time: Instant,
        parameters: FixedStepParameters,
        fitting_tolerance: Length,
    ) -> Result<Ephemeris<F>, EphemerisError> {
        if self.bodies.is_empty() {
            return Err(EphemerisError::NoBodies);
        }
        if let Some(missing) = (0..self.bodies.len()).find(|i| !self.bodies.contains_key(i)) {
            return Err(EphemerisError::UnknownBody(missing));
        }
        if !initial_time.is_finite() {
            return Err(EphemerisError::NonFiniteTime(initial_time));
        }
        let tolerance = fitting_tolerance.to_meters();
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(EphemerisError::NonPositiveFittingTolerance);
        }
        let integrator = SymplecticPartitionedRungeKutta::new(&parameters)?;

        let mut bodies = Vec::with_capacity(self.bodies.len());
        let mut trajectories = Vec::with_capacity(self.bodies.len());
        let mut positions = Vec::with_capacity(3 * self.bodies.len());
        let mut momenta = Vec::with_capacity(3 * self.bodies.len());
        for (body, degrees_of_freedom) in self.bodies.into_values() {
            let mut trajectory = ContinuousTrajectory::new(parameters.step, fitting_tolerance);
            trajectory.append(initial_time, degrees_of_freedom)?;
            positions.extend(degrees_of_freedom.position.coordinates().iter());
            momenta.extend(degrees_of_freedom.velocity.coordinates().iter());
            bodies.push(body);
            trajectories.push(trajectory);
        }

        info!(
            bodies = bodies.len(),
            oblate = bodies.iter().filter(|b| b.is_oblate()).count(),
            step_s = parameters.step.to_seconds(),
            scheme = ?parameters.scheme,
            "ephemeris built"
        );

        Ok(Ephemeris {
            bodies,
            trajectories,
            parameters,
            integrator,
            fitting_tolerance,
            last_state: SystemState::new(initial_time, positions, momenta)?,
            last_severe_integration_status: None,
        })
    }
}

/// Apsides of a trajectory with respect to a body, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Apsides<F: Frame> {
    pub apoapsides: Vec<Sample<F>>,
    pub periapsides: Vec<Sample<F>>,
}

/// Continuous trajectories of the massive bodies, and integration of
/// massless bodies in their field.
#[derive(Debug, Clone)]
pub struct Ephemeris<F: Frame> {
    bodies: Vec<MassiveBody>,
    trajectories: Vec<ContinuousTrajectory<F>>,
    parameters: FixedStepParameters,
    integrator: SymplecticPartitionedRungeKutta,
    fitting_tolerance: Length,
    // State of the massive bodies at the last integration step, which may be
    // past the end of the fitted series.
    last_state: SystemState,
    last_severe_integration_status: Option<String>,
}

impl<F: Frame> Ephemeris<F> {
    pub fn bodies(&self) -> &[MassiveBody] {
        &self.bodies
    }

    pub fn body(&self, index: BodyIndex) -> Result<&MassiveBody, EphemerisError> {
        self.bodies
            .get(index.0)
            .ok_or(EphemerisError::UnknownBody(index.0))
    }

    pub fn trajectory(&self, index: BodyIndex) -> Result<&ContinuousTrajectory<F>, EphemerisError> {
        self.trajectories
            .get(index.0)
            .ok_or(EphemerisError::UnknownBody(index.0))
    }

    pub fn fixed_step_parameters(&self) -> &FixedStepParameters {
        &self.parameters
    }

    pub fn fitting_tolerance(&self) -> Length {
        self.fitting_tolerance
    }

    /// First instant covered by every trajectory.
    pub fn t_min(&self) -> Instant {
        self.trajectories
            .iter()
            .filter_map(ContinuousTrajectory::t_min)
            .max()
            .unwrap_or(self.last_state.time)
    }

    /// Last instant covered by every trajectory.
    pub fn t_max(&self) -> Instant {
        self.trajectories
            .iter()
            .filter_map(ContinuousTrajectory::t_max)
            .min()
            .unwrap_or(self.last_state.time)
    }

    pub fn evaluate_degrees_of_freedom(
        &self,
        index: BodyIndex,
        time: Instant,
    ) -> Result<DegreesOfFreedom<F>, EphemerisError> {
        Ok(self.trajectory(index)?.evaluate_degrees_of_freedom(time)?)
    }

    pub fn evaluate_position(
        &self,
        index: BodyIndex,
        time: Instant,
    ) -> Result<Position<F>, EphemerisError> {
        Ok(self.trajectory(index)?.evaluate_position(time)?)
    }

    /// Gravitational acceleration of a massless body at `position` and
    /// `time`.
    pub fn compute_gravitational_acceleration_on_massless_body(
        &self,
        position: Position<F>,
        time: Instant,
    ) -> Acceleration<F> {
        let body_positions = self.body_positions_at(time);
        Acceleration::from_coordinates(compute_massless_acceleration(
            &self.bodies,
            &body_positions,
            &position.coordinates(),
        ))
    }

    /// Gravitational acceleration of the massive body `index` at `time`,
    /// due to all the others.
    pub fn compute_gravitational_acceleration_on_massive_body(
        &self,
        index: BodyIndex,
        time: Instant,
    ) -> Result<Acceleration<F>, EphemerisError> {
        self.body(index)?;
        let positions: Vec<f64> = self
            .body_positions_at(time)
            .iter()
            .flat_map(|q| [q.x, q.y, q.z])
            .collect();
        let mut accelerations = vec![0.0; positions.len()];
        compute_mutual_accelerations(&self.bodies, &positions, &mut accelerations);
        let i = 3 * index.0;
        Ok(Acceleration::new(
            accelerations[i],
            accelerations[i + 1],
            accelerations[i + 2],
        ))
    }

    /// Extends the trajectories of the massive bodies to cover at least
    /// `time`.
    pub fn prolong(&mut self, time: Instant) -> Result<(), EphemerisError> {
        self.prolong_with_limit(time, UNLIMITED_MAX_EPHEMERIS_STEPS)
            .map(|_| ())
    }

    /// Like [`Ephemeris::prolong`] but takes at most `max_steps` integration
    /// steps. Returns whether `time` is covered.
    pub fn prolong_with_limit(
        &mut self,
        time: Instant,
        max_steps: usize,
    ) -> Result<bool, EphemerisError> {
        if !time.is_finite() {
            return Err(EphemerisError::NonFiniteTime(time));
        }
        let mut steps = 0usize;
        while self.t_max() < time {
            if steps >= max_steps {
                return Ok(false);
            }
            self.step_massive_bodies()?;
            steps += 1;
        }
        Ok(true)
    }

    fn step_massive_bodies(&mut self) -> Result<(), EphemerisError> {
        let problem = MassiveBodies {
            bodies: &self.bodies,
        };
        self.integrator.integrate(&problem, &mut self.last_state, 1);

        let state = &self.last_state;
        for (i, trajectory) in self.trajectories.iter_mut().enumerate() {
            let coordinates =
                |values: &[f64]| Vector3::from_column_slice(&values[3 * i..3 * i + 3]);
            let position = Position::from_coordinates(coordinates(&state.positions));
            let velocity = Velocity::from_coordinates(coordinates(&state.momenta));
            trajectory.append(state.time, DegreesOfFreedom::new(position, velocity))?;
        }
        Ok(())
    }

    /// Drops the parts of the trajectories that end before `time`, which
    /// must be covered.
    pub fn forget_before(&mut self, time: Instant) -> Result<(), EphemerisError> {
        if time > self.t_max() {
            return Err(EphemerisError::ForgetBeyondCoverage(time));
        }
        for trajectory in &mut self.trajectories {
            trajectory.forget_before(time);
        }
        debug!(%time, t_min = %self.t_min(), "ephemeris forgot the past");
        Ok(())
    }

    /// Integrates the massless body of trajectory `node` from its last
    /// sample to `time`, appending a sample at each accepted step.
    ///
    /// Returns `Ok(true)` if `time` was reached. Exhausting the step budget of
    /// `parameters` or `max_ephemeris_steps` returns `Ok(false)`; so does a
    /// step size underflow, which is also latched as a severe integration
    /// failure.
    pub fn flow_with_adaptive_step(
        &mut self,
        tree: &mut DiscreteTrajectoryTree<F>,
        node: TrajectoryId,
        intrinsic_acceleration: &dyn Fn(Instant) -> Acceleration<F>,
        time: Instant,
        parameters: &AdaptiveStepParameters,
        max_ephemeris_steps: usize,
    ) -> Result<bool, EphemerisError> {
        parameters.validate()?;
        if !time.is_finite() {
            return Err(EphemerisError::NonFiniteTime(time));
        }
        let last = tree.last(node)?.ok_or(EphemerisError::EmptyTrajectory)?;
        if time < last.time {
            return Err(EphemerisError::FlowBackwards {
                last: last.time,
                target: time,
            });
        }
        if time == last.time {
            return Ok(true);
        }

        self.prolong_with_limit(time, max_ephemeris_steps)?;
        let final_time = time.min(self.t_max());
        if final_time <= last.time {
            return Ok(false);
        }

        let problem = MasslessBodies {
            bodies: &self.bodies,
            trajectories: &self.trajectories,
            intrinsic_acceleration: Some(intrinsic_acceleration),
        };
        let dof = last.degrees_of_freedom;
        let mut samples = Vec::new();
        let outcome = DormandPrince54.solve(
            &problem,
            last.time,
            dof.position.coordinates().as_slice(),
            dof.velocity.coordinates().as_slice(),
            final_time,
            parameters,
            |t, q, v| {
                samples.push(Sample::new(
                    t,
                    DegreesOfFreedom::new(
                        Position::from_coordinates(Vector3::from_column_slice(q)),
                        Velocity::from_coordinates(Vector3::from_column_slice(v)),
                    ),
                ))
            },
        );

        for sample in samples {
            tree.append(node, sample.time, sample.degrees_of_freedom)?;
        }

        match outcome {
            AdaptiveStepOutcome::ReachedFinalTime => Ok(final_time == time),
            AdaptiveStepOutcome::StepBudgetExhausted { time: stopped } => {
                debug!(%stopped, target = %time, "adaptive flow stopped early");
                Ok(false)
            }
            AdaptiveStepOutcome::StepSizeUnderflow { time: stopped, step } => {
                let message = format!(
                    "step size underflow at {} (step {} s): \
                     the integration error cannot be brought under tolerance",
                    stopped,
                    step.to_seconds()
                );
                error!(%stopped, "{message}");
                self.last_severe_integration_status = Some(message);
                Ok(false)
            }
        }
    }

    /// Integrates the massless bodies of `nodes` on the fixed step of
    /// `parameters`, up to the last whole step not after `time`.
    ///
    /// All the trajectories must end at the same time.
    pub fn flow_with_fixed_step(
        &mut self,
        tree: &mut DiscreteTrajectoryTree<F>,
        nodes: &[TrajectoryId],
        time: Instant,
        parameters: &FixedStepParameters,
    ) -> Result<(), EphemerisError> {
        let integrator = SymplecticPartitionedRungeKutta::new(parameters)?;
        if !time.is_finite() {
            return Err(EphemerisError::NonFiniteTime(time));
        }

        let mut start = None;
        let mut positions = Vec::with_capacity(3 * nodes.len());
        let mut momenta = Vec::with_capacity(3 * nodes.len());
        for node in nodes {
            let last = tree.last(*node)?.ok_or(EphemerisError::EmptyTrajectory)?;
            match start {
                None => start = Some(last.time),
                Some(start) if start != last.time => {
                    return Err(EphemerisError::InconsistentTrajectoryTimes)
                }
                Some(_) => {}
            }
            positions.extend(last.degrees_of_freedom.position.coordinates().iter());
            momenta.extend(last.degrees_of_freedom.velocity.coordinates().iter());
        }
        let Some(start) = start else {
            return Ok(());
        };
        if time - start < parameters.step {
            return Ok(());
        }

        // The stages of the last step may be evaluated slightly past its end.
        self.prolong(time + parameters.step)?;

        let problem = MasslessBodies {
            bodies: &self.bodies,
            trajectories: &self.trajectories,
            intrinsic_acceleration: None,
        };
        let initial = SystemState::new(start, positions, momenta)?;
        let states = integrator.solve(&problem, &initial, time, 1, false);

        for state in &states {
            for (i, node) in nodes.iter().enumerate() {
                let coordinates =
                    |values: &[f64]| Vector3::from_column_slice(&values[3 * i..3 * i + 3]);
                let position = Position::from_coordinates(coordinates(&state.positions));
                let velocity = Velocity::from_coordinates(coordinates(&state.momenta));
                tree.append(*node, state.time, DegreesOfFreedom::new(position, velocity))?;
            }
        }
        Ok(())
    }

    /// Finds the apsides of the trajectory given by `samples` with respect
    /// to `body`.
    ///
    /// Between consecutive samples the squared distance to the body is
    /// interpolated by a cubic; its extrema in each half-open interval are
    /// apoapsides where its second derivative is negative and periapsides
    /// where it is positive.
    pub fn compute_apsides<'a, I>(
        &self,
        body: BodyIndex,
        samples: I,
    ) -> Result<Apsides<F>, EphemerisError>
    where
        I: IntoIterator<Item = &'a Sample<F>>,
    {
        let trajectory = self.trajectory(body)?;
        let mut apsides = Apsides {
            apoapsides: Vec::new(),
            periapsides: Vec::new(),
        };

        let mut previous: Option<(&Sample<F>, f64, f64)> = None;
        for sample in samples {
            let body_dof = trajectory.evaluate_degrees_of_freedom(sample.time)?;
            let relative = sample.degrees_of_freedom - body_dof;
            let squared_distance = relative.displacement.norm_squared();
            let squared_distance_derivative =
                2.0 * relative.displacement.coordinates().dot(&relative.velocity.coordinates());

            if let Some((lower, d0, dd0)) = previous {
                let hermite = Hermite3::new(
                    (lower.time, sample.time),
                    (d0, squared_distance),
                    (dd0, squared_distance_derivative),
                );
                if !hermite.is_flat(APSIS_FLATNESS_TOLERANCE, d0.max(squared_distance)) {
                    for extremum in hermite.find_extrema() {
                        if extremum < lower.time || extremum >= sample.time {
                            continue;
                        }
                        let curvature = hermite.evaluate_second_derivative(extremum);
                        let apsis = Sample::new(extremum, interpolate(lower, sample, extremum));
                        if curvature < 0.0 {
                            apsides.apoapsides.push(apsis);
                        } else if curvature > 0.0 {
                            apsides.periapsides.push(apsis);
                        }
                    }
                }
            }
            previous = Some((sample, squared_distance, squared_distance_derivative));
        }
        Ok(apsides)
    }

    /// Returns and clears the last severe integration failure.
    pub fn take_severe_integration_failure(&mut self) -> Option<String> {
        self.last_severe_integration_status.take()
    }

    fn body_positions_at(&self, time: Instant) -> Vec<Vector3<f64>> {
        body_positions_at(&self.trajectories, time)
    }

    pub fn to_message(&self) -> EphemerisMessage<F> {
        EphemerisMessage {
            bodies: self.bodies.iter().map(MassiveBody::to_message).collect(),
            trajectories: self
                .trajectories
                .iter()
                .map(ContinuousTrajectory::to_message)
                .collect(),
            fixed_step_parameters: Some(self.parameters),
            fitting_tolerance: Some(self.fitting_tolerance),
            last_state: self.last_state.clone(),
        }
    }

    pub fn from_message(message: &EphemerisMessage<F>) -> Result<Self, EphemerisError> {
        if message.bodies.is_empty() {
            return Err(EphemerisError::NoBodies);
        }
        if message.bodies.len() != message.trajectories.len() {
            return Err(EphemerisError::MalformedMessage(format!(
                "{} bodies but {} trajectories",
                message.bodies.len(),
                message.trajectories.len()
            )));
        }
        if message.last_state.dimension() != 3 * message.bodies.len()
            || message.last_state.momenta.len() != message.last_state.positions.len()
        {
            return Err(EphemerisError::MalformedMessage(
                "state does not match the bodies".to_string(),
            ));
        }

        let parameters = message.fixed_step_parameters.unwrap_or_default();
        let integrator = SymplecticPartitionedRungeKutta::new(&parameters)?;
        let bodies = message
            .bodies
            .iter()
            .map(MassiveBody::from_message)
            .collect::<Result<Vec<_>, _>>()?;
        let trajectories = message
            .trajectories
            .iter()
            .map(ContinuousTrajectory::from_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bodies,
            trajectories,
            parameters,
            integrator,
            fitting_tolerance: message
                .fitting_tolerance
                .unwrap_or_else(default_fitting_tolerance),
            last_state: message.last_state.clone(),
            last_severe_integration_status: None,
        })
    }
}

/// Persisted form of an [`Ephemeris`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EphemerisMessage<F: Frame> {
    pub bodies: Vec<BodyMessage>,
    pub trajectories: Vec<ContinuousTrajectoryMessage<F>>,
    #[serde(default)]
    pub fixed_step_parameters: Option<FixedStepParameters>,
    #[serde(default)]
    pub fitting_tolerance: Option<Length>,
    pub last_state: SystemState,
}

fn body_positions_at<F: Frame>(
    trajectories: &[ContinuousTrajectory<F>],
    time: Instant,
) -> Vec<Vector3<f64>> {
    trajectories
        .iter()
        .map(|trajectory| trajectory.position_unchecked(time).coordinates())
        .collect()
}

/// The massive bodies under their mutual attraction.
struct MassiveBodies<'a> {
    bodies: &'a [MassiveBody],
}

impl SeparableProblem for MassiveBodies<'_> {
    fn compute_force(&self, _time: Instant, positions: &[f64], forces: &mut [f64]) {
        compute_mutual_accelerations(self.bodies, positions, forces);
    }
}

/// Massless bodies, three coordinates each, in the field of the massive
/// bodies along their continuous trajectories.
struct MasslessBodies<'a, F: Frame> {
    bodies: &'a [MassiveBody],
    trajectories: &'a [ContinuousTrajectory<F>],
    intrinsic_acceleration: Option<&'a dyn Fn(Instant) -> Acceleration<F>>,
}

impl<F: Frame> MasslessBodies<'_, F> {
    fn accelerations(&self, time: Instant, positions: &[f64], accelerations: &mut [f64]) {
        let body_positions = body_positions_at(self.trajectories, time);
        let intrinsic = self
            .intrinsic_acceleration
            .map_or_else(|| Vector3::zeros(), |a| a(time).coordinates());
        for (q, a) in positions.chunks_exact(3).zip(accelerations.chunks_exact_mut(3)) {
            let position = Vector3::from_column_slice(q);
            let gravity = compute_massless_acceleration(self.bodies, &body_positions, &position);
            a.copy_from_slice((gravity + intrinsic).as_slice());
        }
    }
}

impl<F: Frame> SeparableProblem for MasslessBodies<'_, F> {
    fn compute_force(&self, time: Instant, positions: &[f64], forces: &mut [f64]) {
        self.accelerations(time, positions, forces);
    }
}

impl<F: Frame> SecondOrderProblem for MasslessBodies<'_, F> {
    fn compute_acceleration(
        &self,
        time: Instant,
        positions: &[f64],
        _velocities: &[f64],
        accelerations: &mut [f64],
    ) {
        self.accelerations(time, positions, accelerations);
    }
}

