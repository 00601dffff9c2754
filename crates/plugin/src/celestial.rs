//! Celestials as known by the host
//!
//! The host identifies celestials by its own integer index and arranges
//! them in a hierarchy (moons orbit planets, planets orbit the sun). The
//! hierarchy only matters to the host's two-body approximations: relative
//! states are reported with respect to the parent, while the physics
//! integrates every celestial in the full N-body field.

use std::fmt;

use geometry::{Barycentric, DegreesOfFreedom};
use physics::{BodyIndex, Ephemeris};
use serde::{Deserialize, Serialize};
use units::Instant;

use crate::error::PluginError;

/// The host's index of a celestial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CelestialIndex(pub i32);

impl fmt::Display for CelestialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A celestial: its body in the ephemeris and its parent, if it is not the
/// sun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celestial {
    body: BodyIndex,
    parent: Option<CelestialIndex>,
}

impl Celestial {
    pub fn new(body: BodyIndex, parent: Option<CelestialIndex>) -> Self {
        Self { body, parent }
    }

    pub fn body(&self) -> BodyIndex {
        self.body
    }

    pub fn parent(&self) -> Option<CelestialIndex> {
        self.parent
    }

    pub fn is_sun(&self) -> bool {
        self.parent.is_none()
    }

    pub fn set_parent(&mut self, parent: CelestialIndex) {
        self.parent = Some(parent);
    }

    pub fn degrees_of_freedom(
        &self,
        ephemeris: &Ephemeris<Barycentric>,
        time: Instant,
    ) -> Result<DegreesOfFreedom<Barycentric>, PluginError> {
        Ok(ephemeris.evaluate_degrees_of_freedom(self.body, time)?)
    }

    pub fn to_message(&self, index: CelestialIndex) -> CelestialMessage {
        CelestialMessage {
            index,
            parent: self.parent,
            body: self.body,
        }
    }

    pub fn from_message(message: &CelestialMessage) -> Self {
        Self::new(message.body, message.parent)
    }
}

/// Persisted form of a [`Celestial`]. The body itself is persisted with the
/// ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelestialMessage {
    pub index: CelestialIndex,
    pub parent: Option<CelestialIndex>,
    pub body: BodyIndex,
}
