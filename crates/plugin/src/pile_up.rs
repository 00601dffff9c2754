//! Pile-ups: vessels in contact integrated as one rigid aggregate
//!
//! A pile-up integrates the centre of mass of its members as a massless body
//! in the field of the ephemeris, under the total intrinsic force of the
//! members divided by their total mass. Each member keeps a fixed offset
//! from the centre of mass, so merging conserves the total momentum:
//! Σ mᵢ (v + δvᵢ) = M v because the mass-weighted offsets sum to zero.

use std::collections::{BTreeMap, BTreeSet};

use geometry::{Acceleration, Barycentre, Barycentric, DegreesOfFreedom, RelativeDegreesOfFreedom};
use integrators::AdaptiveStepParameters;
use nalgebra::Vector3;
use physics::{
    DiscreteTrajectoryTree, Ephemeris, EphemerisError, Sample, TrajectoryId,
    UNLIMITED_MAX_EPHEMERIS_STEPS,
};
use tracing::{info, warn};
use units::{Instant, Mass};

use crate::error::PluginError;
use crate::vessel::VesselId;

/// What the physics bubble reports about a vessel for the next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleMember {
    pub mass: Mass,
    pub intrinsic_acceleration: Acceleration<Barycentric>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Member {
    bubble: BubbleMember,
    from_centre_of_mass: RelativeDegreesOfFreedom<Barycentric>,
}

/// A group of vessels moving as one.
#[derive(Debug, Clone)]
pub struct PileUp {
    members: BTreeMap<VesselId, Member>,
    trajectory: DiscreteTrajectoryTree<Barycentric>,
    centre_of_mass: TrajectoryId,
}

impl PileUp {
    /// Forms a pile-up at `time` from its members' masses and current
    /// degrees of freedom.
    pub fn new(
        time: Instant,
        members: &[(VesselId, BubbleMember, DegreesOfFreedom<Barycentric>)],
    ) -> Result<Self, PluginError> {
        let mut barycentre = Barycentre::new();
        for (_, bubble, degrees_of_freedom) in members {
            let mass = bubble.mass.to_kg();
            if !(mass.is_finite() && mass > 0.0) {
                return Err(PluginError::NonPositiveMass(mass));
            }
            barycentre.add(degrees_of_freedom, mass);
        }
        let centre_of_mass = barycentre
            .get()
            .ok_or(PluginError::NonPositiveMass(barycentre.total_weight()))?;

        let mut trajectory = DiscreteTrajectoryTree::new();
        let root = trajectory.new_root();
        trajectory.append(root, time, centre_of_mass)?;

        let members: BTreeMap<_, _> = members
            .iter()
            .map(|(id, bubble, degrees_of_freedom)| {
                (
                    *id,
                    Member {
                        bubble: *bubble,
                        from_centre_of_mass: *degrees_of_freedom - centre_of_mass,
                    },
                )
            })
            .collect();
        info!(members = members.len(), %time, "pile-up formed");

        Ok(Self {
            members,
            trajectory,
            centre_of_mass: root,
        })
    }

    pub fn contains(&self, id: &VesselId) -> bool {
        self.members.contains_key(id)
    }

    pub fn vessels(&self) -> impl Iterator<Item = &VesselId> + '_ {
        self.members.keys()
    }

    /// Whether the members are exactly `vessels`.
    pub fn has_members(&self, vessels: &BTreeSet<VesselId>) -> bool {
        self.members.len() == vessels.len() && self.members.keys().all(|id| vessels.contains(id))
    }

    pub fn total_mass(&self) -> Mass {
        self.members.values().map(|member| member.bubble.mass).sum()
    }

    /// Replaces what the bubble reported for a member. Offsets are kept.
    pub fn update_member(&mut self, id: VesselId, bubble: BubbleMember) -> Result<(), PluginError> {
        let mass = bubble.mass.to_kg();
        if !(mass.is_finite() && mass > 0.0) {
            return Err(PluginError::NonPositiveMass(mass));
        }
        let member = self
            .members
            .get_mut(&id)
            .ok_or(PluginError::NotPiledUp(id))?;
        member.bubble = bubble;
        Ok(())
    }

    /// Total intrinsic force divided by total mass.
    pub fn intrinsic_acceleration(&self) -> Acceleration<Barycentric> {
        let total_mass = self.total_mass().to_kg();
        let total_force = self
            .members
            .values()
            .fold(Vector3::zeros(), |force, member| {
                let BubbleMember {
                    mass,
                    intrinsic_acceleration,
                } = member.bubble;
                force + intrinsic_acceleration.coordinates() * mass.to_kg()
            });
        Acceleration::from_coordinates(total_force / total_mass)
    }

    /// The last sample of the centre of mass.
    pub fn centre_of_mass(&self) -> Result<Sample<Barycentric>, PluginError> {
        self.trajectory
            .last(self.centre_of_mass)?
            .ok_or(PluginError::Ephemeris(EphemerisError::EmptyTrajectory))
    }

    /// Total momentum of the members, in kg m/s.
    pub fn momentum(&self) -> Result<Vector3<f64>, PluginError> {
        let centre_of_mass = self.centre_of_mass()?.degrees_of_freedom;
        Ok(self.members.values().fold(Vector3::zeros(), |momentum, member| {
            let velocity = centre_of_mass.velocity + member.from_centre_of_mass.velocity;
            momentum + velocity.coordinates() * member.bubble.mass.to_kg()
        }))
    }

    /// Degrees of freedom of member `id` at the last time of the centre of
    /// mass.
    pub fn member_degrees_of_freedom(
        &self,
        id: &VesselId,
    ) -> Result<Sample<Barycentric>, PluginError> {
        let member = self.members.get(id).ok_or(PluginError::NotPiledUp(*id))?;
        let centre_of_mass = self.centre_of_mass()?;
        Ok(Sample::new(
            centre_of_mass.time,
            centre_of_mass.degrees_of_freedom + member.from_centre_of_mass,
        ))
    }

    /// Flows the centre of mass to `time`. Returns whether it got there.
    pub fn advance_time(
        &mut self,
        ephemeris: &mut Ephemeris<Barycentric>,
        time: Instant,
        parameters: &AdaptiveStepParameters,
    ) -> Result<bool, PluginError> {
        let acceleration = self.intrinsic_acceleration();
        let intrinsic = move |_: Instant| acceleration;
        let reached = ephemeris.flow_with_adaptive_step(
            &mut self.trajectory,
            self.centre_of_mass,
            &intrinsic,
            time,
            parameters,
            UNLIMITED_MAX_EPHEMERIS_STEPS,
        )?;
        if !reached {
            warn!(members = self.members.len(), %time, "pile-up did not reach the current time");
        }
        // Only the last state of the centre of mass is ever read.
        let last = self.centre_of_mass()?.time;
        self.trajectory.forget_before(self.centre_of_mass, last)?;
        Ok(reached)
    }
}
