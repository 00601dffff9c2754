//! Plugin configuration and persisted state

use geometry::Barycentric;
use integrators::{AdaptiveStepParameters, FixedStepParameters, SymplecticScheme};
use physics::{default_fitting_tolerance, EphemerisMessage};
use serde::{Deserialize, Serialize};
use units::{Angle, Instant, Length, Speed, Time};

use crate::celestial::CelestialMessage;
use crate::vessel::VesselMessage;

/// Step of vessel histories unless configured otherwise.
pub const DEFAULT_HISTORY_STEP_SECONDS: f64 = 10.0;

/// How far ahead predictions go unless configured otherwise.
pub const DEFAULT_PREDICTION_LENGTH_HOURS: f64 = 1.0;

/// Integration parameters of every part of the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PluginParameters {
    pub ephemeris: FixedStepParameters,
    pub fitting_tolerance: Length,
    pub history: FixedStepParameters,
    pub prolongation: AdaptiveStepParameters,
    pub prediction: AdaptiveStepParameters,
    pub prediction_length: Time,
}

impl PluginParameters {
    pub fn default_history() -> FixedStepParameters {
        FixedStepParameters {
            scheme: SymplecticScheme::McLachlanAtela1992Order5Optimal,
            step: Time::from_seconds(DEFAULT_HISTORY_STEP_SECONDS),
        }
    }

    pub fn default_prolongation() -> AdaptiveStepParameters {
        AdaptiveStepParameters::default()
    }

    pub fn default_prediction() -> AdaptiveStepParameters {
        AdaptiveStepParameters {
            length_integration_tolerance: Length::from_meters(1.0),
            speed_integration_tolerance: Speed::from_meters_per_second(1.0),
            ..AdaptiveStepParameters::default()
        }
    }
}

impl Default for PluginParameters {
    fn default() -> Self {
        Self {
            ephemeris: FixedStepParameters::default(),
            fitting_tolerance: default_fitting_tolerance(),
            history: Self::default_history(),
            prolongation: Self::default_prolongation(),
            prediction: Self::default_prediction(),
            prediction_length: Time::from_hours(DEFAULT_PREDICTION_LENGTH_HOURS),
        }
    }
}

fn default_game_epoch() -> Instant {
    Instant::J2000
}

/// Persisted form of a [`Plugin`](crate::plugin::Plugin).
///
/// Fields added after the first saves are optional and fall back to the
/// defaults of [`PluginParameters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMessage {
    #[serde(default = "default_game_epoch")]
    pub game_epoch: Instant,
    pub current_time: Instant,
    pub planetarium_rotation: Angle,
    pub celestials: Vec<CelestialMessage>,
    pub ephemeris: EphemerisMessage<Barycentric>,
    pub vessels: Vec<VesselMessage>,
    #[serde(default)]
    pub history_parameters: Option<FixedStepParameters>,
    #[serde(default)]
    pub prolongation_parameters: Option<AdaptiveStepParameters>,
    #[serde(default)]
    pub prediction_parameters: Option<AdaptiveStepParameters>,
    #[serde(default)]
    pub prediction_length: Option<Time>,
}
