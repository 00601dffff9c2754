//! The host-facing facade of the simulation.
//!
//! - [`plugin`]: the [`Plugin`] driven by the host, frame by frame.
//! - [`celestial`]: the host's celestials and their hierarchy.
//! - [`vessel`]: vessels with their history, prolongation and prediction.
//! - [`pile_up`]: vessels in contact integrated as one.
//! - [`disjoint_sets`]: union-find used to group vessels into pile-ups.
//! - [`message`]: parameters and persisted state.

pub mod celestial;
pub mod disjoint_sets;
pub mod error;
pub mod message;
pub mod pile_up;
pub mod plugin;
pub mod vessel;

#[cfg(test)]
mod disjoint_sets_test;
#[cfg(test)]
mod pile_up_test;

pub use celestial::{Celestial, CelestialIndex, CelestialMessage};
pub use error::PluginError;
pub use message::{PluginMessage, PluginParameters};
pub use pile_up::{BubbleMember, PileUp};
pub use plugin::Plugin;
pub use vessel::{Vessel, VesselId, VesselMessage};
