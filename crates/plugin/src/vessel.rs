//! Vessels and their trajectories
//!
//! A vessel owns a tree of trajectories:
//! - the history, integrated on a fixed step and authoritative;
//! - the prolongation, forked at the end of the history and integrated with
//!   an adaptive step up to the current time;
//! - the prediction, forked at the end of the prolongation, recomputed on
//!   demand and disposable.
//!
//! A vessel that was moved by the physics bubble since its history last
//! advanced is dirty: its prolongation, not its history, holds its true
//! state, and the next advance outside of the bubble seeds the history from
//! it.

use std::fmt;

use geometry::{Acceleration, Barycentric, DegreesOfFreedom};
use integrators::{AdaptiveStepParameters, FixedStepParameters};
use physics::{
    DiscreteTrajectoryMessage, DiscreteTrajectoryTree, Ephemeris, EphemerisError, Sample,
    TrajectoryId, UNLIMITED_MAX_EPHEMERIS_STEPS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use units::Instant;
use uuid::Uuid;

use crate::celestial::CelestialIndex;
use crate::error::PluginError;

/// Ephemeris steps a single prediction may add.
pub const MAX_EPHEMERIS_STEPS_PER_PREDICTION: usize = 1000;

/// The host's identifier of a vessel.
///
/// Serialized as its hyphenated string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VesselId(Uuid);

impl VesselId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the host's string form of a vessel id.
    pub fn parse(id: &str) -> Result<Self, PluginError> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| PluginError::InvalidVesselId(id.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for VesselId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for VesselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn no_intrinsic_acceleration(_: Instant) -> Acceleration<Barycentric> {
    Acceleration::zero()
}

/// A vessel and its trajectories.
#[derive(Debug, Clone)]
pub struct Vessel {
    id: VesselId,
    parent: CelestialIndex,
    trajectories: DiscreteTrajectoryTree<Barycentric>,
    history: Option<TrajectoryId>,
    prolongation: Option<TrajectoryId>,
    prediction: Option<TrajectoryId>,
    prediction_parameters: AdaptiveStepParameters,
    is_dirty: bool,
}

impl Vessel {
    /// A vessel without trajectories; see
    /// [`Vessel::create_history_and_fork_prolongation`].
    pub fn new(
        id: VesselId,
        parent: CelestialIndex,
        prediction_parameters: AdaptiveStepParameters,
    ) -> Self {
        Self {
            id,
            parent,
            trajectories: DiscreteTrajectoryTree::new(),
            history: None,
            prolongation: None,
            prediction: None,
            prediction_parameters,
            is_dirty: false,
        }
    }

    pub fn id(&self) -> VesselId {
        self.id
    }

    pub fn parent(&self) -> CelestialIndex {
        self.parent
    }

    pub fn set_parent(&mut self, parent: CelestialIndex) {
        self.parent = parent;
    }

    pub fn is_initialized(&self) -> bool {
        self.history.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn prediction_adaptive_step_parameters(&self) -> &AdaptiveStepParameters {
        &self.prediction_parameters
    }

    pub fn set_prediction_adaptive_step_parameters(&mut self, parameters: AdaptiveStepParameters) {
        self.prediction_parameters = parameters;
    }

    pub fn trajectories(&self) -> &DiscreteTrajectoryTree<Barycentric> {
        &self.trajectories
    }

    pub fn history(&self) -> Result<TrajectoryId, PluginError> {
        self.history.ok_or(PluginError::VesselNotInitialized(self.id))
    }

    pub fn prolongation(&self) -> Result<TrajectoryId, PluginError> {
        self.prolongation.ok_or(PluginError::VesselNotInitialized(self.id))
    }

    pub fn prediction(&self) -> Option<TrajectoryId> {
        self.prediction
    }

    /// The current state of the vessel: the last sample of its
    /// prolongation.
    pub fn last(&self) -> Result<Sample<Barycentric>, PluginError> {
        self.trajectories
            .last(self.prolongation()?)?
            .ok_or(PluginError::Ephemeris(EphemerisError::EmptyTrajectory))
    }

    /// The fork point of the prediction followed by its own samples. Empty
    /// if no prediction was computed since the last advance.
    pub fn prediction_samples(&self) -> Result<Vec<Sample<Barycentric>>, PluginError> {
        let Some(prediction) = self.prediction else {
            return Ok(Vec::new());
        };
        let start = self.trajectories.fork_time(prediction)?;
        Ok(self
            .trajectories
            .iter(prediction)?
            .filter(|sample| start.map_or(true, |start| sample.time >= start))
            .copied()
            .collect())
    }

    /// Starts the history at `time` and forks the prolongation there. May
    /// only be called once.
    pub fn create_history_and_fork_prolongation(
        &mut self,
        time: Instant,
        degrees_of_freedom: DegreesOfFreedom<Barycentric>,
    ) -> Result<(), PluginError> {
        if self.is_initialized() {
            return Err(PluginError::VesselAlreadyInitialized(self.id));
        }
        let history = self.trajectories.new_root();
        self.trajectories.append(history, time, degrees_of_freedom)?;
        self.prolongation = Some(self.trajectories.fork(history, time)?);
        self.history = Some(history);
        debug!(vessel = %self.id, %time, "history started");
        Ok(())
    }

    /// Advances a vessel that is not in the physics bubble to `time`.
    ///
    /// The history advances by whole steps of `history_parameters`, then a
    /// new prolongation covers the remainder. A dirty vessel first appends
    /// the end of its prolongation to its history and becomes clean.
    pub fn advance_time_not_in_bubble(
        &mut self,
        ephemeris: &mut Ephemeris<Barycentric>,
        time: Instant,
        history_parameters: &FixedStepParameters,
        prolongation_parameters: &AdaptiveStepParameters,
    ) -> Result<bool, PluginError> {
        let history = self.history()?;
        let last = self.last()?;
        self.delete_prediction()?;
        self.delete_prolongation()?;

        if self.is_dirty {
            if self.trajectories.last_time(history)? < Some(last.time) {
                self.trajectories
                    .append(history, last.time, last.degrees_of_freedom)?;
            }
            self.is_dirty = false;
            debug!(vessel = %self.id, time = %last.time, "history seeded from prolongation");
        }

        ephemeris.flow_with_fixed_step(
            &mut self.trajectories,
            &[history],
            time,
            history_parameters,
        )?;

        let fork_time = self
            .trajectories
            .last_time(history)?
            .ok_or(PluginError::Ephemeris(EphemerisError::EmptyTrajectory))?;
        let prolongation = self.trajectories.fork(history, fork_time)?;
        self.prolongation = Some(prolongation);
        let reached = ephemeris.flow_with_adaptive_step(
            &mut self.trajectories,
            prolongation,
            &no_intrinsic_acceleration,
            time,
            prolongation_parameters,
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )?;
        if !reached {
            warn!(vessel = %self.id, %time, "prolongation did not reach the current time");
        }
        Ok(reached)
    }

    /// Advances the prolongation of a vessel that is alone in the physics
    /// bubble, under its own `intrinsic_acceleration`. Dirties the vessel.
    pub fn advance_time_with_intrinsic_acceleration(
        &mut self,
        ephemeris: &mut Ephemeris<Barycentric>,
        time: Instant,
        intrinsic_acceleration: Acceleration<Barycentric>,
        prolongation_parameters: &AdaptiveStepParameters,
    ) -> Result<bool, PluginError> {
        let prolongation = self.prolongation()?;
        self.delete_prediction()?;
        let intrinsic = move |_: Instant| intrinsic_acceleration;
        let reached = ephemeris.flow_with_adaptive_step(
            &mut self.trajectories,
            prolongation,
            &intrinsic,
            time,
            prolongation_parameters,
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )?;
        self.is_dirty = true;
        Ok(reached)
    }

    /// Appends the state computed by the physics bubble to the prolongation.
    /// Dirties the vessel.
    pub fn advance_time_in_bubble(
        &mut self,
        time: Instant,
        degrees_of_freedom: DegreesOfFreedom<Barycentric>,
    ) -> Result<(), PluginError> {
        let prolongation = self.prolongation()?;
        self.delete_prediction()?;
        self.trajectories.append(prolongation, time, degrees_of_freedom)?;
        self.is_dirty = true;
        Ok(())
    }

    /// Recomputes the prediction from the end of the prolongation up to
    /// `last_time`. Returns whether `last_time` was reached.
    pub fn update_prediction(
        &mut self,
        ephemeris: &mut Ephemeris<Barycentric>,
        last_time: Instant,
    ) -> Result<bool, PluginError> {
        let prolongation = self.prolongation()?;
        self.delete_prediction()?;
        let fork_time = self.last()?.time;
        let prediction = self.trajectories.fork(prolongation, fork_time)?;
        self.prediction = Some(prediction);
        if last_time <= fork_time {
            return Ok(true);
        }
        let parameters = self.prediction_parameters;
        Ok(ephemeris.flow_with_adaptive_step(
            &mut self.trajectories,
            prediction,
            &no_intrinsic_acceleration,
            last_time,
            &parameters,
            MAX_EPHEMERIS_STEPS_PER_PREDICTION,
        )?)
    }

    /// Forgets the trajectories before `time`, always keeping the last
    /// sample of the history.
    pub fn forget_before(&mut self, time: Instant) -> Result<(), PluginError> {
        let history = self.history()?;
        let Some(history_end) = self.trajectories.last_time(history)? else {
            return Ok(());
        };
        self.trajectories.forget_before(history, time.min(history_end))?;
        Ok(())
    }

    fn delete_prediction(&mut self) -> Result<(), PluginError> {
        if let Some(prediction) = self.prediction.take() {
            if self.trajectories.contains(prediction) {
                self.trajectories.delete_fork(prediction)?;
            }
        }
        Ok(())
    }

    fn delete_prolongation(&mut self) -> Result<(), PluginError> {
        if let Some(prolongation) = self.prolongation.take() {
            if self.trajectories.contains(prolongation) {
                self.trajectories.delete_fork(prolongation)?;
            }
        }
        Ok(())
    }

    pub fn to_message(&self) -> Result<VesselMessage, PluginError> {
        let history = match self.history {
            Some(history) => Some(self.trajectories.to_message(history)?),
            None => None,
        };
        let prolongation = match self.prolongation {
            Some(prolongation) => self.trajectories.child_path(prolongation)?,
            None => Vec::new(),
        };
        let prediction = match self.prediction {
            Some(prediction) => Some(self.trajectories.child_path(prediction)?),
            None => None,
        };
        Ok(VesselMessage {
            id: self.id,
            parent: self.parent,
            history,
            prolongation,
            prediction,
            prediction_adaptive_step_parameters: Some(self.prediction_parameters),
            is_dirty: self.is_dirty,
        })
    }

    /// Restores a vessel. Messages without prediction parameters get
    /// `default_prediction_parameters`.
    pub fn from_message(
        message: &VesselMessage,
        default_prediction_parameters: AdaptiveStepParameters,
    ) -> Result<Self, PluginError> {
        let mut vessel = Self::new(
            message.id,
            message.parent,
            message
                .prediction_adaptive_step_parameters
                .unwrap_or(default_prediction_parameters),
        );
        vessel.is_dirty = message.is_dirty;
        let Some(history) = &message.history else {
            return Ok(vessel);
        };

        let root = vessel.trajectories.read_message(history)?;
        let prolongation = vessel.trajectories.node_at_path(root, &message.prolongation)?;
        if prolongation == root {
            return Err(PluginError::MalformedMessage(format!(
                "vessel {} has no prolongation fork",
                message.id
            )));
        }
        vessel.prediction = match &message.prediction {
            Some(path) => Some(vessel.trajectories.node_at_path(root, path)?),
            None => None,
        };
        vessel.history = Some(root);
        vessel.prolongation = Some(prolongation);
        Ok(vessel)
    }
}

/// Persisted form of a [`Vessel`].
///
/// The forks are identified by their child paths from the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselMessage {
    pub id: VesselId,
    pub parent: CelestialIndex,
    #[serde(default)]
    pub history: Option<DiscreteTrajectoryMessage<Barycentric>>,
    #[serde(default)]
    pub prolongation: Vec<usize>,
    #[serde(default)]
    pub prediction: Option<Vec<usize>>,
    #[serde(default)]
    pub prediction_adaptive_step_parameters: Option<AdaptiveStepParameters>,
    #[serde(default)]
    pub is_dirty: bool,
}
