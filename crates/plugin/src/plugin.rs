//! The facade through which the host drives the simulation
//!
//! A [`Plugin`] starts out initializing: the host inserts the celestials,
//! then calls [`Plugin::end_initialization`] which builds the ephemeris.
//! Afterwards, each frame, the host refreshes the vessels it still knows
//! about, reports the vessels of the physics bubble and their contacts, and
//! advances time. States exchanged with the host are in the [`World`] frame,
//! which is rotated from [`Barycentric`] by the planetarium rotation.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use geometry::{
    frenet_trihedron, Acceleration, AffineMap, Barycentric, BodySurface, DegreesOfFreedom, Frenet,
    Position, RelativeDegreesOfFreedom, Rotation, Vector, Velocity, World,
};
use integrators::AdaptiveStepParameters;
use physics::{
    Apsides, DiscreteTrajectoryTree, Ephemeris, EphemerisBuilder, HierarchicalSystem,
    KeplerianElements, MassiveBody, Sample, TrajectoryId,
};
use tracing::{debug, info};
use units::{Angle, Instant, Mass, Time};

use crate::celestial::{Celestial, CelestialIndex};
use crate::disjoint_sets::DisjointSets;
use crate::error::PluginError;
use crate::message::{PluginMessage, PluginParameters};
use crate::pile_up::{BubbleMember, PileUp};
use crate::vessel::{Vessel, VesselId};

#[derive(Debug, Clone)]
enum State {
    Initializing(EphemerisBuilder<Barycentric>),
    Running(Ephemeris<Barycentric>),
}

/// The simulation as seen by the host.
#[derive(Debug, Clone)]
pub struct Plugin {
    parameters: PluginParameters,
    game_epoch: Instant,
    current_time: Instant,
    planetarium_rotation: Angle,
    celestials: BTreeMap<CelestialIndex, Celestial>,
    sun: Option<CelestialIndex>,
    // Celestials inserted from their orbits, placed by `end_initialization`.
    hierarchical_system: Option<HierarchicalSystem<CelestialIndex, Barycentric>>,
    state: State,
    vessels: BTreeMap<VesselId, Vessel>,
    kept_vessels: BTreeSet<VesselId>,
    // The vessels of the physics bubble at the last advance.
    bubble: BTreeSet<VesselId>,
    next_bubble: BTreeMap<VesselId, BubbleMember>,
    contacts: Vec<(VesselId, VesselId)>,
    pile_ups: Vec<PileUp>,
    // Rebuilt by every advance.
    pile_up_of: BTreeMap<VesselId, usize>,
}

impl Plugin {
    pub fn new(
        initial_time: Instant,
        planetarium_rotation: Angle,
        parameters: PluginParameters,
    ) -> Result<Self, PluginError> {
        validate_parameters(&parameters)?;
        Ok(Self {
            parameters,
            game_epoch: initial_time,
            current_time: initial_time,
            planetarium_rotation,
            celestials: BTreeMap::new(),
            sun: None,
            hierarchical_system: None,
            state: State::Initializing(EphemerisBuilder::new()),
            vessels: BTreeMap::new(),
            kept_vessels: BTreeSet::new(),
            bubble: BTreeSet::new(),
            next_bubble: BTreeMap::new(),
            contacts: Vec::new(),
            pile_ups: Vec::new(),
            pile_up_of: BTreeMap::new(),
        })
    }

    pub fn parameters(&self) -> &PluginParameters {
        &self.parameters
    }

    pub fn game_epoch(&self) -> Instant {
        self.game_epoch
    }

    pub fn current_time(&self) -> Instant {
        self.current_time
    }

    pub fn is_initializing(&self) -> bool {
        matches!(self.state, State::Initializing(_))
    }

    pub fn ephemeris(&self) -> Result<&Ephemeris<Barycentric>, PluginError> {
        match &self.state {
            State::Running(ephemeris) => Ok(ephemeris),
            State::Initializing(_) => Err(PluginError::Initializing),
        }
    }

    pub fn celestial(&self, index: CelestialIndex) -> Result<&Celestial, PluginError> {
        self.celestials
            .get(&index)
            .ok_or(PluginError::UnknownCelestial(index))
    }

    pub fn has_vessel(&self, id: VesselId) -> bool {
        self.vessels.contains_key(&id)
    }

    pub fn vessel(&self, id: VesselId) -> Result<&Vessel, PluginError> {
        self.vessels.get(&id).ok_or(PluginError::UnknownVessel(id))
    }

    /// The pile-up containing `id` since the last advance, if any.
    pub fn pile_up(&self, id: VesselId) -> Option<&PileUp> {
        self.pile_up_of
            .get(&id)
            .and_then(|index| self.pile_ups.get(*index))
    }

    /// Maps [`Barycentric`] vectors to [`World`] at the current time.
    pub fn planetarium_rotation(&self) -> Rotation<Barycentric, World> {
        Rotation::about_z(self.planetarium_rotation)
    }

    /// Registers a celestial with its initial degrees of freedom. The sun is
    /// the only celestial without a parent; any other parent must already be
    /// inserted.
    pub fn insert_celestial(
        &mut self,
        index: CelestialIndex,
        parent: Option<CelestialIndex>,
        body: MassiveBody,
        degrees_of_freedom: DegreesOfFreedom<Barycentric>,
    ) -> Result<(), PluginError> {
        let State::Initializing(builder) = &mut self.state else {
            return Err(PluginError::AlreadyInitialized);
        };
        if self.hierarchical_system.is_some() {
            return Err(PluginError::MixedInitialization);
        }
        if self.celestials.contains_key(&index) {
            return Err(PluginError::DuplicateCelestial(index));
        }
        match parent {
            Some(parent) if !self.celestials.contains_key(&parent) => {
                return Err(PluginError::UnknownCelestial(parent))
            }
            None if self.sun.is_some() => return Err(PluginError::SecondSun(index)),
            _ => {}
        }

        let body_index = builder.add_body(body, degrees_of_freedom);
        self.celestials.insert(index, Celestial::new(body_index, parent));
        if parent.is_none() {
            self.sun = Some(index);
        }
        debug!(celestial = %index, body = body_index.0, "celestial inserted");
        Ok(())
    }

    /// Registers a celestial on its orbit about `parent`. The sun is
    /// inserted first, with neither parent nor elements. Celestials inserted
    /// this way are placed when initialization ends, and cannot be mixed
    /// with those inserted by [`Plugin::insert_celestial`].
    pub fn insert_celestial_jacobi_keplerian(
        &mut self,
        index: CelestialIndex,
        parent: Option<CelestialIndex>,
        elements: Option<KeplerianElements>,
        body: MassiveBody,
    ) -> Result<(), PluginError> {
        if !self.is_initializing() {
            return Err(PluginError::AlreadyInitialized);
        }
        if !self.celestials.is_empty() {
            return Err(PluginError::MixedInitialization);
        }
        if self
            .hierarchical_system
            .as_ref()
            .is_some_and(|system| system.contains(&index))
        {
            return Err(PluginError::DuplicateCelestial(index));
        }
        match (parent, elements) {
            (None, None) => {
                if self.hierarchical_system.is_some() {
                    return Err(PluginError::SecondSun(index));
                }
                self.hierarchical_system = Some(HierarchicalSystem::new(index, body));
            }
            (Some(parent), Some(elements)) => {
                self.hierarchical_system
                    .as_mut()
                    .filter(|system| system.contains(&parent))
                    .ok_or(PluginError::UnknownCelestial(parent))?
                    .add(index, parent, elements, body)?;
            }
            _ => return Err(PluginError::InconsistentKeplerianInsertion(index)),
        }
        debug!(celestial = %index, "celestial inserted from its orbit");
        Ok(())
    }

    /// Builds the ephemeris from the inserted celestials.
    pub fn end_initialization(&mut self) -> Result<(), PluginError> {
        if !self.is_initializing() {
            return Err(PluginError::AlreadyInitialized);
        }
        let placed = self
            .hierarchical_system
            .as_ref()
            .map(HierarchicalSystem::barycentric_system)
            .transpose()?;
        if let Some(bodies) = placed {
            self.hierarchical_system = None;
            for body in bodies {
                self.insert_celestial(body.key, body.parent, body.body, body.degrees_of_freedom)?;
            }
        }

        let State::Initializing(builder) = &self.state else {
            return Err(PluginError::AlreadyInitialized);
        };
        if self.sun.is_none() {
            return Err(PluginError::NoSun);
        }
        let ephemeris = builder.clone().build(
            self.current_time,
            self.parameters.ephemeris,
            self.parameters.fitting_tolerance,
        )?;
        self.state = State::Running(ephemeris);
        info!(
            celestials = self.celestials.len(),
            time = %self.current_time,
            "plugin initialized"
        );
        Ok(())
    }

    /// Makes `parent` the parent of `index`.
    pub fn update_celestial_hierarchy(
        &mut self,
        index: CelestialIndex,
        parent: CelestialIndex,
    ) -> Result<(), PluginError> {
        self.ephemeris()?;
        if self.celestial(index)?.is_sun() {
            return Err(PluginError::NoParent(index));
        }
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == index {
                return Err(PluginError::CyclicHierarchy {
                    celestial: index,
                    parent,
                });
            }
            ancestor = self.celestial(current)?.parent();
        }
        if let Some(celestial) = self.celestials.get_mut(&index) {
            celestial.set_parent(parent);
        }
        Ok(())
    }

    /// Degrees of freedom of `index` relative to its parent, in [`World`].
    pub fn celestial_from_parent(
        &self,
        index: CelestialIndex,
    ) -> Result<RelativeDegreesOfFreedom<World>, PluginError> {
        let ephemeris = self.ephemeris()?;
        let celestial = self.celestial(index)?;
        let parent = celestial.parent().ok_or(PluginError::NoParent(index))?;
        let relative = celestial.degrees_of_freedom(ephemeris, self.current_time)?
            - self.celestial(parent)?.degrees_of_freedom(ephemeris, self.current_time)?;
        Ok(self.planetarium_rotation().apply_relative(relative))
    }

    fn rotating_body(&self, index: CelestialIndex) -> Result<&MassiveBody, PluginError> {
        let body = self.ephemeris()?.body(self.celestial(index)?.body())?;
        if body.rotation().is_none() {
            return Err(PluginError::NotRotating(index));
        }
        Ok(body)
    }

    /// Maps the surface frame of the celestial to [`World`] at the current
    /// time.
    pub fn celestial_rotation(
        &self,
        index: CelestialIndex,
    ) -> Result<Rotation<BodySurface, World>, PluginError> {
        let body = self.rotating_body(index)?;
        Ok(self.planetarium_rotation() * body.from_surface_frame::<Barycentric>(self.current_time))
    }

    /// Angle of the prime meridian of the celestial at the game epoch.
    pub fn celestial_initial_rotation(&self, index: CelestialIndex) -> Result<Angle, PluginError> {
        Ok(self.rotating_body(index)?.angle_at(self.game_epoch))
    }

    /// Sidereal rotation period of the celestial, negative if it rotates
    /// clockwise about its pole.
    pub fn celestial_rotation_period(&self, index: CelestialIndex) -> Result<Time, PluginError> {
        let rotation = self
            .rotating_body(index)?
            .rotation()
            .ok_or(PluginError::NotRotating(index))?;
        let frequency = rotation.angular_frequency.to_radians_per_second();
        Ok(Time::from_seconds(TAU / frequency))
    }

    /// Inserts the vessel if it is new and keeps it through the next
    /// advance. Returns true if it was inserted, in which case
    /// [`Plugin::set_vessel_state_offset`] must be called before the next
    /// advance.
    pub fn insert_or_keep_vessel(
        &mut self,
        id: VesselId,
        parent: CelestialIndex,
    ) -> Result<bool, PluginError> {
        self.ephemeris()?;
        self.celestial(parent)?;
        let prediction_parameters = self.parameters.prediction;
        let mut inserted = false;
        self.vessels
            .entry(id)
            .or_insert_with(|| {
                inserted = true;
                Vessel::new(id, parent, prediction_parameters)
            })
            .set_parent(parent);
        self.kept_vessels.insert(id);
        if inserted {
            info!(vessel = %id, parent = %parent, "vessel inserted");
        }
        Ok(inserted)
    }

    /// Gives a new vessel its state relative to its parent, in [`World`], at
    /// the current time.
    pub fn set_vessel_state_offset(
        &mut self,
        id: VesselId,
        from_parent: RelativeDegreesOfFreedom<World>,
    ) -> Result<(), PluginError> {
        let ephemeris = self.ephemeris()?;
        let vessel = self.vessel(id)?;
        if vessel.is_initialized() {
            return Err(PluginError::VesselAlreadyInitialized(id));
        }
        let parent = self
            .celestial(vessel.parent())?
            .degrees_of_freedom(ephemeris, self.current_time)?;
        let relative = self.planetarium_rotation().inverse().apply_relative(from_parent);
        let time = self.current_time;
        self.vessels
            .get_mut(&id)
            .ok_or(PluginError::UnknownVessel(id))?
            .create_history_and_fork_prolongation(time, parent + relative)
    }

    /// Current degrees of freedom of the vessel relative to its parent, in
    /// [`World`].
    pub fn vessel_from_parent(
        &self,
        id: VesselId,
    ) -> Result<RelativeDegreesOfFreedom<World>, PluginError> {
        let ephemeris = self.ephemeris()?;
        let vessel = self.vessel(id)?;
        let last = vessel.last()?;
        let parent = self
            .celestial(vessel.parent())?
            .degrees_of_freedom(ephemeris, last.time)?;
        Ok(self
            .planetarium_rotation()
            .apply_relative(last.degrees_of_freedom - parent))
    }

    /// Velocity of the vessel relative to its parent, in [`World`].
    pub fn vessel_velocity(&self, id: VesselId) -> Result<Velocity<World>, PluginError> {
        Ok(self.vessel_from_parent(id)?.velocity)
    }

    /// Unit tangent to the trajectory of the vessel relative to its parent.
    pub fn vessel_tangent(&self, id: VesselId) -> Result<Vector<World>, PluginError> {
        Ok(self.vessel_frenet_frame(id)?.apply_vector(Vector::new(1.0, 0.0, 0.0)))
    }

    /// Unit normal to the trajectory of the vessel relative to its parent,
    /// towards the centre of curvature.
    pub fn vessel_normal(&self, id: VesselId) -> Result<Vector<World>, PluginError> {
        Ok(self.vessel_frenet_frame(id)?.apply_vector(Vector::new(0.0, 1.0, 0.0)))
    }

    pub fn vessel_binormal(&self, id: VesselId) -> Result<Vector<World>, PluginError> {
        Ok(self.vessel_frenet_frame(id)?.apply_vector(Vector::new(0.0, 0.0, 1.0)))
    }

    /// The Frenet trihedron of the motion of the vessel relative to its
    /// parent, at the end of its trajectory. The acceleration is the
    /// difference of the gravitational accelerations of the vessel and of
    /// the parent.
    fn vessel_frenet_frame(&self, id: VesselId) -> Result<Rotation<Frenet, World>, PluginError> {
        let ephemeris = self.ephemeris()?;
        let vessel = self.vessel(id)?;
        let last = vessel.last()?;
        let parent = self.celestial(vessel.parent())?;
        let parent_velocity = parent.degrees_of_freedom(ephemeris, last.time)?.velocity;
        let acceleration = ephemeris.compute_gravitational_acceleration_on_massless_body(
            last.degrees_of_freedom.position,
            last.time,
        ) - ephemeris.compute_gravitational_acceleration_on_massive_body(parent.body(), last.time)?;
        let velocity = last.degrees_of_freedom.velocity - parent_velocity;
        let trihedron =
            frenet_trihedron(velocity, acceleration).ok_or(PluginError::DegenerateFrenetFrame(id))?;
        Ok(self.planetarium_rotation() * trihedron)
    }

    /// Whether the physics bubble was empty at the last advance.
    pub fn physics_bubble_is_empty(&self) -> bool {
        self.bubble.is_empty()
    }

    /// Puts a kept vessel in the physics bubble for the next advance, with
    /// its mass and the acceleration of the forces it applies to itself.
    pub fn add_vessel_to_next_physics_bubble(
        &mut self,
        id: VesselId,
        mass: Mass,
        intrinsic_acceleration: Acceleration<World>,
    ) -> Result<(), PluginError> {
        self.ephemeris()?;
        if !self.vessel(id)?.is_initialized() {
            return Err(PluginError::VesselNotInitialized(id));
        }
        if !self.kept_vessels.contains(&id) {
            return Err(PluginError::VesselNotKept(id));
        }
        let kg = mass.to_kg();
        if !(kg.is_finite() && kg > 0.0) {
            return Err(PluginError::NonPositiveMass(kg));
        }
        let intrinsic_acceleration = self
            .planetarium_rotation()
            .inverse()
            .apply_acceleration(intrinsic_acceleration);
        self.next_bubble.insert(
            id,
            BubbleMember {
                mass,
                intrinsic_acceleration,
            },
        );
        Ok(())
    }

    /// Reports that two vessels of the next physics bubble touch.
    pub fn report_contact(&mut self, a: VesselId, b: VesselId) -> Result<(), PluginError> {
        for id in [a, b] {
            if !self.next_bubble.contains_key(&id) {
                return Err(PluginError::NotInPhysicsBubble(id));
            }
        }
        self.contacts.push((a, b));
        Ok(())
    }

    /// Simulates up to `time`.
    ///
    /// Vessels not kept since the last advance are removed. The ephemeris is
    /// prolonged first, then the pile-ups and the other vessels of the
    /// physics bubble are advanced, then every other vessel.
    pub fn advance_time(
        &mut self,
        time: Instant,
        planetarium_rotation: Angle,
    ) -> Result<(), PluginError> {
        self.ephemeris()?;
        if !(time.is_finite() && time > self.current_time) {
            return Err(PluginError::TimeNotAfter {
                time,
                current: self.current_time,
            });
        }
        if let Some(id) = self
            .kept_vessels
            .iter()
            .find(|id| !self.vessels.get(*id).is_some_and(Vessel::is_initialized))
        {
            return Err(PluginError::VesselNotInitialized(*id));
        }

        self.free_vessels();
        if let State::Running(ephemeris) = &mut self.state {
            ephemeris.prolong(time)?;
        }

        self.bubble = self.evolve_bubble(time)?;

        let State::Running(ephemeris) = &mut self.state else {
            return Err(PluginError::Initializing);
        };
        for (id, vessel) in &mut self.vessels {
            if !self.bubble.contains(id) {
                vessel.advance_time_not_in_bubble(
                    ephemeris,
                    time,
                    &self.parameters.history,
                    &self.parameters.prolongation,
                )?;
            }
        }

        debug!(
            from = %self.current_time,
            to = %time,
            vessels = self.vessels.len(),
            "time advanced"
        );
        self.current_time = time;
        self.planetarium_rotation = planetarium_rotation;
        Ok(())
    }

    /// Removes the vessels that were not kept since the last advance.
    fn free_vessels(&mut self) {
        let kept = std::mem::take(&mut self.kept_vessels);
        self.vessels.retain(|id, _| {
            let keep = kept.contains(id);
            if !keep {
                info!(vessel = %id, "vessel removed");
            }
            keep
        });
        self.bubble.retain(|id| kept.contains(id));
        self.next_bubble.retain(|id, _| kept.contains(id));
        self.contacts
            .retain(|(a, b)| kept.contains(a) && kept.contains(b));
    }

    /// Partitions the physics bubble into pile-ups by contact and advances
    /// it to `time`. Returns the vessels that were in the bubble.
    fn evolve_bubble(&mut self, time: Instant) -> Result<BTreeSet<VesselId>, PluginError> {
        let bubble = std::mem::take(&mut self.next_bubble);
        let contacts = std::mem::take(&mut self.contacts);
        let mut previous_pile_ups = std::mem::take(&mut self.pile_ups);
        self.pile_up_of.clear();

        let State::Running(ephemeris) = &mut self.state else {
            return Err(PluginError::Initializing);
        };
        let member = |id: &VesselId| {
            bubble
                .get(id)
                .copied()
                .ok_or(PluginError::NotInPhysicsBubble(*id))
        };

        let mut sets = DisjointSets::new();
        for id in bubble.keys() {
            sets.insert(*id);
        }
        for (a, b) in &contacts {
            sets.union(a, b);
        }

        for subset in sets.subsets() {
            if let [id] = subset.as_slice() {
                let vessel = self.vessels.get_mut(id).ok_or(PluginError::UnknownVessel(*id))?;
                vessel.advance_time_with_intrinsic_acceleration(
                    ephemeris,
                    time,
                    member(id)?.intrinsic_acceleration,
                    &self.parameters.prolongation,
                )?;
                continue;
            }

            let members: BTreeSet<VesselId> = subset.iter().copied().collect();
            let mut pile_up = match previous_pile_ups.iter().position(|p| p.has_members(&members)) {
                Some(index) => {
                    let mut pile_up = previous_pile_ups.swap_remove(index);
                    for id in &subset {
                        pile_up.update_member(*id, member(id)?)?;
                    }
                    pile_up
                }
                None => {
                    let samples = subset
                        .iter()
                        .map(|id| -> Result<_, PluginError> {
                            let vessel =
                                self.vessels.get(id).ok_or(PluginError::UnknownVessel(*id))?;
                            Ok((*id, member(id)?, vessel.last()?))
                        })
                        .collect::<Result<Vec<_>, PluginError>>()?;
                    // A member whose last flow stopped short is piled up
                    // where it stopped, not at the current time.
                    let formation_time = samples
                        .first()
                        .map_or(self.current_time, |(_, _, sample)| sample.time);
                    if let Some((id, _, sample)) = samples
                        .iter()
                        .find(|(_, _, sample)| sample.time != formation_time)
                    {
                        return Err(PluginError::PileUpTimesDiffer {
                            vessel: *id,
                            time: sample.time,
                            expected: formation_time,
                        });
                    }
                    let states: Vec<_> = samples
                        .into_iter()
                        .map(|(id, bubble, sample)| (id, bubble, sample.degrees_of_freedom))
                        .collect();
                    PileUp::new(formation_time, &states)?
                }
            };

            pile_up.advance_time(ephemeris, time, &self.parameters.prolongation)?;
            for id in &subset {
                let sample = pile_up.member_degrees_of_freedom(id)?;
                let vessel = self.vessels.get_mut(id).ok_or(PluginError::UnknownVessel(*id))?;
                if vessel.last()?.time < sample.time {
                    vessel.advance_time_in_bubble(sample.time, sample.degrees_of_freedom)?;
                }
                self.pile_up_of.insert(*id, self.pile_ups.len());
            }
            self.pile_ups.push(pile_up);
        }

        if !previous_pile_ups.is_empty() {
            debug!(count = previous_pile_ups.len(), "pile-ups dissolved");
        }
        Ok(bubble.into_keys().collect())
    }

    /// Forgets the trajectories before `time`, which must be before the
    /// current time.
    pub fn forget_all_histories_before(&mut self, time: Instant) -> Result<(), PluginError> {
        self.ephemeris()?;
        if !(time < self.current_time) {
            return Err(PluginError::ForgetNotBefore {
                time,
                current: self.current_time,
            });
        }
        // The ephemeris must still cover the ends of the histories, from
        // which the vessels are integrated.
        let mut horizon = time;
        for vessel in self.vessels.values().filter(|v| v.is_initialized()) {
            if let Some(end) = vessel.trajectories().last_time(vessel.history()?)? {
                horizon = horizon.min(end);
            }
        }

        if let State::Running(ephemeris) = &mut self.state {
            ephemeris.forget_before(horizon)?;
        }
        for vessel in self.vessels.values_mut().filter(|v| v.is_initialized()) {
            vessel.forget_before(time)?;
        }
        Ok(())
    }

    pub fn set_prediction_length(&mut self, length: Time) -> Result<(), PluginError> {
        let seconds = length.to_seconds();
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(PluginError::NonPositivePredictionLength(seconds));
        }
        self.parameters.prediction_length = length;
        Ok(())
    }

    /// Sets the prediction parameters of the plugin and of every vessel.
    pub fn set_prediction_adaptive_step_parameters(
        &mut self,
        parameters: AdaptiveStepParameters,
    ) -> Result<(), PluginError> {
        parameters.validate()?;
        self.parameters.prediction = parameters;
        for vessel in self.vessels.values_mut() {
            vessel.set_prediction_adaptive_step_parameters(parameters);
        }
        Ok(())
    }

    /// Recomputes the predictions of `ids` up to the prediction length past
    /// the current time.
    pub fn update_prediction(&mut self, ids: &[VesselId]) -> Result<(), PluginError> {
        self.ephemeris()?;
        for id in ids {
            if !self.vessel(*id)?.is_initialized() {
                return Err(PluginError::VesselNotInitialized(*id));
            }
        }
        let last_time = self.current_time + self.parameters.prediction_length;
        let State::Running(ephemeris) = &mut self.state else {
            return Err(PluginError::Initializing);
        };
        for id in ids {
            let vessel = self.vessels.get_mut(id).ok_or(PluginError::UnknownVessel(*id))?;
            if !vessel.update_prediction(ephemeris, last_time)? {
                debug!(vessel = %id, "prediction stopped early");
            }
        }
        Ok(())
    }

    /// The map from [`Barycentric`] to [`World`] that puts the sun at
    /// `sun_world_position`.
    fn barycentric_to_world(
        &self,
        sun_world_position: Position<World>,
    ) -> Result<AffineMap<Barycentric, World>, PluginError> {
        let sun = self.sun.ok_or(PluginError::NoSun)?;
        let sun_position = self
            .celestial(sun)?
            .degrees_of_freedom(self.ephemeris()?, self.current_time)?
            .position;
        Ok(AffineMap::new(
            sun_position,
            sun_world_position,
            Velocity::zero(),
            self.planetarium_rotation(),
        ))
    }

    /// The history of the vessel, in [`World`].
    pub fn rendered_vessel_trajectory(
        &self,
        id: VesselId,
        sun_world_position: Position<World>,
    ) -> Result<(DiscreteTrajectoryTree<World>, TrajectoryId), PluginError> {
        let to_world = self.barycentric_to_world(sun_world_position)?;
        let vessel = self.vessel(id)?;
        Ok(vessel.trajectories().copy_timeline(vessel.history()?, |sample| {
            Sample::new(sample.time, to_world.apply(&sample.degrees_of_freedom))
        })?)
    }

    /// The prediction of the vessel from its fork point, in [`World`].
    pub fn rendered_prediction(
        &self,
        id: VesselId,
        sun_world_position: Position<World>,
    ) -> Result<(DiscreteTrajectoryTree<World>, TrajectoryId), PluginError> {
        let to_world = self.barycentric_to_world(sun_world_position)?;
        let mut tree = DiscreteTrajectoryTree::new();
        let root = tree.new_root();
        for sample in self.vessel(id)?.prediction_samples()? {
            tree.append(root, sample.time, to_world.apply(&sample.degrees_of_freedom))?;
        }
        Ok((tree, root))
    }

    /// Apsides of the prediction of the vessel with respect to `celestial`,
    /// in [`World`].
    pub fn rendered_prediction_apsides(
        &self,
        id: VesselId,
        celestial: CelestialIndex,
        sun_world_position: Position<World>,
    ) -> Result<Apsides<World>, PluginError> {
        let to_world = self.barycentric_to_world(sun_world_position)?;
        let samples = self.vessel(id)?.prediction_samples()?;
        let apsides = self
            .ephemeris()?
            .compute_apsides(self.celestial(celestial)?.body(), &samples)?;
        let render = |samples: Vec<Sample<Barycentric>>| -> Vec<Sample<World>> {
            samples
                .into_iter()
                .map(|sample| Sample::new(sample.time, to_world.apply(&sample.degrees_of_freedom)))
                .collect()
        };
        Ok(Apsides {
            apoapsides: render(apsides.apoapsides),
            periapsides: render(apsides.periapsides),
        })
    }

    /// Where the integrated centre of mass of the pile-up of `id` is in
    /// [`World`], given where the host draws the sun.
    pub fn displacement_correction(
        &self,
        id: VesselId,
        sun_world_position: Position<World>,
    ) -> Result<Position<World>, PluginError> {
        let pile_up = self.pile_up(id).ok_or(PluginError::NotPiledUp(id))?;
        let centre_of_mass = pile_up.centre_of_mass()?.degrees_of_freedom;
        Ok(self
            .barycentric_to_world(sun_world_position)?
            .apply_position(centre_of_mass.position))
    }

    /// Velocity of the integrated centre of mass of the pile-up of `id`
    /// relative to `reference`, in [`World`].
    pub fn velocity_correction(
        &self,
        id: VesselId,
        reference: CelestialIndex,
    ) -> Result<Velocity<World>, PluginError> {
        let pile_up = self.pile_up(id).ok_or(PluginError::NotPiledUp(id))?;
        let centre_of_mass = pile_up.centre_of_mass()?;
        let reference = self
            .celestial(reference)?
            .degrees_of_freedom(self.ephemeris()?, centre_of_mass.time)?;
        Ok(self
            .planetarium_rotation()
            .apply_velocity(centre_of_mass.degrees_of_freedom.velocity - reference.velocity))
    }

    /// The last severe integration failure, cleared by reading it.
    pub fn has_severe_integration_failure(&mut self) -> Option<String> {
        match &mut self.state {
            State::Running(ephemeris) => ephemeris.take_severe_integration_failure(),
            State::Initializing(_) => None,
        }
    }

    /// Persists the plugin. Pile-ups are not persisted; they form again at
    /// the next advance.
    pub fn to_message(&self) -> Result<PluginMessage, PluginError> {
        let ephemeris = self.ephemeris()?;
        Ok(PluginMessage {
            game_epoch: self.game_epoch,
            current_time: self.current_time,
            planetarium_rotation: self.planetarium_rotation,
            celestials: self
                .celestials
                .iter()
                .map(|(index, celestial)| celestial.to_message(*index))
                .collect(),
            ephemeris: ephemeris.to_message(),
            vessels: self
                .vessels
                .values()
                .map(Vessel::to_message)
                .collect::<Result<Vec<_>, _>>()?,
            history_parameters: Some(self.parameters.history),
            prolongation_parameters: Some(self.parameters.prolongation),
            prediction_parameters: Some(self.parameters.prediction),
            prediction_length: Some(self.parameters.prediction_length),
        })
    }

    /// Restores a plugin. Every restored vessel is kept through the first
    /// advance.
    pub fn from_message(message: &PluginMessage) -> Result<Self, PluginError> {
        let ephemeris = Ephemeris::from_message(&message.ephemeris)?;
        let parameters = PluginParameters {
            ephemeris: *ephemeris.fixed_step_parameters(),
            fitting_tolerance: ephemeris.fitting_tolerance(),
            history: message
                .history_parameters
                .unwrap_or_else(PluginParameters::default_history),
            prolongation: message
                .prolongation_parameters
                .unwrap_or_else(PluginParameters::default_prolongation),
            prediction: message
                .prediction_parameters
                .unwrap_or_else(PluginParameters::default_prediction),
            prediction_length: message
                .prediction_length
                .unwrap_or(PluginParameters::default().prediction_length),
        };
        validate_parameters(&parameters)?;

        let mut celestials = BTreeMap::new();
        let mut sun = None;
        for celestial in &message.celestials {
            if celestial.body.0 >= ephemeris.bodies().len() {
                return Err(PluginError::MalformedMessage(format!(
                    "celestial {} refers to unknown body {}",
                    celestial.index, celestial.body.0
                )));
            }
            if celestial.parent.is_none() && sun.replace(celestial.index).is_some() {
                return Err(PluginError::SecondSun(celestial.index));
            }
            if celestials
                .insert(celestial.index, Celestial::from_message(celestial))
                .is_some()
            {
                return Err(PluginError::DuplicateCelestial(celestial.index));
            }
        }
        if sun.is_none() {
            return Err(PluginError::NoSun);
        }
        for celestial in &message.celestials {
            if let Some(parent) = celestial.parent {
                if !celestials.contains_key(&parent) {
                    return Err(PluginError::UnknownCelestial(parent));
                }
            }
        }

        let mut vessels = BTreeMap::new();
        for vessel in &message.vessels {
            if !celestials.contains_key(&vessel.parent) {
                return Err(PluginError::UnknownCelestial(vessel.parent));
            }
            vessels.insert(vessel.id, Vessel::from_message(vessel, parameters.prediction)?);
        }
        let kept_vessels = vessels.keys().copied().collect();

        Ok(Self {
            parameters,
            game_epoch: message.game_epoch,
            current_time: message.current_time,
            planetarium_rotation: message.planetarium_rotation,
            celestials,
            sun,
            hierarchical_system: None,
            state: State::Running(ephemeris),
            vessels,
            kept_vessels,
            bubble: BTreeSet::new(),
            next_bubble: BTreeMap::new(),
            contacts: Vec::new(),
            pile_ups: Vec::new(),
            pile_up_of: BTreeMap::new(),
        })
    }
}

fn validate_parameters(parameters: &PluginParameters) -> Result<(), PluginError> {
    parameters.ephemeris.validate()?;
    parameters.history.validate()?;
    parameters.prolongation.validate()?;
    parameters.prediction.validate()?;
    let length = parameters.prediction_length.to_seconds();
    if !(length.is_finite() && length > 0.0) {
        return Err(PluginError::NonPositivePredictionLength(length));
    }
    Ok(())
}
