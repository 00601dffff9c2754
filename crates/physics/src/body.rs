//! Celestial bodies
//!
//! A [`Body`] is either massless (vessels, centres of mass of pile-ups) or a
//! [`MassiveBody`] whose optional rotation and oblateness decide which
//! terms the gravity computation adds.

use std::f64::consts::FRAC_PI_2;

use geometry::{BodySurface, Frame, Rotation};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use units::{Angle, AngularFrequency, GravitationalParameter, Instant, Length};

use crate::error::BodyError;

/// Index of a massive body in an ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyIndex(pub usize);

/// Rotation of a body about a fixed pole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationParameters {
    pub mean_radius: Length,
    /// Angle of the prime meridian at `reference_instant`.
    pub reference_angle: Angle,
    pub reference_instant: Instant,
    pub angular_frequency: AngularFrequency,
    pub right_ascension_of_pole: Angle,
    pub declination_of_pole: Angle,
}

/// The J2 zonal harmonic of the gravitational field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oblateness {
    pub j2: f64,
    pub reference_radius: Length,
}

/// A body that attracts others.
///
/// Massive bodies are immutable once built; use the `with_*` builders to add
/// the optional attributes.
///
/// # Examples
///
/// ```
/// use physics::body::{MassiveBody, RotationParameters};
/// use units::{Angle, AngularFrequency, GravitationalParameter, Instant, Length, Time};
///
/// let earth = MassiveBody::new(GravitationalParameter::from_m3_per_s2(3.986_004_418e14))
///     .unwrap()
///     .with_rotation(RotationParameters {
///         mean_radius: Length::from_km(6_371.0),
///         reference_angle: Angle::zero(),
///         reference_instant: Instant::J2000,
///         angular_frequency: AngularFrequency::from_period(Time::from_hours(23.934)),
///         right_ascension_of_pole: Angle::zero(),
///         declination_of_pole: Angle::from_degrees(90.0),
///     })
///     .with_oblateness(1.082_63e-3, Length::from_km(6_378.137))
///     .unwrap();
///
/// assert!(earth.is_oblate());
/// assert!((earth.polar_axis().z - 1.0).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MassiveBody {
    gravitational_parameter: GravitationalParameter,
    rotation: Option<RotationParameters>,
    oblateness: Option<Oblateness>,
}

impl MassiveBody {
    /// A spherical, non-rotating body.
    pub fn new(gravitational_parameter: GravitationalParameter) -> Result<Self, BodyError> {
        let mu = gravitational_parameter.to_m3_per_s2();
        if !(mu.is_finite() && mu > 0.0) {
            return Err(BodyError::NonPositiveGravitationalParameter(mu));
        }
        Ok(Self {
            gravitational_parameter,
            rotation: None,
            oblateness: None,
        })
    }

    pub fn with_rotation(mut self, rotation: RotationParameters) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Adds a J2 term about the pole of the body, which must be rotating.
    pub fn with_oblateness(mut self, j2: f64, reference_radius: Length) -> Result<Self, BodyError> {
        if self.rotation.is_none() {
            return Err(BodyError::OblatenessWithoutRotation);
        }
        let radius = reference_radius.to_meters();
        if !(j2.is_finite() && radius.is_finite() && radius > 0.0) {
            return Err(BodyError::InvalidOblateness {
                j2,
                reference_radius: radius,
            });
        }
        self.oblateness = Some(Oblateness {
            j2,
            reference_radius,
        });
        Ok(self)
    }

    pub fn gravitational_parameter(&self) -> GravitationalParameter {
        self.gravitational_parameter
    }

    pub fn rotation(&self) -> Option<&RotationParameters> {
        self.rotation.as_ref()
    }

    pub fn oblateness(&self) -> Option<&Oblateness> {
        self.oblateness.as_ref()
    }

    pub fn is_oblate(&self) -> bool {
        self.oblateness.is_some()
    }

    pub fn mean_radius(&self) -> Option<Length> {
        self.rotation.map(|r| r.mean_radius)
    }

    /// Unit vector along the rotation pole, the z axis for a body that does
    /// not rotate.
    pub fn polar_axis(&self) -> Vector3<f64> {
        match &self.rotation {
            Some(rotation) => {
                let (ra, dec) = (rotation.right_ascension_of_pole, rotation.declination_of_pole);
                Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
            }
            None => Vector3::z(),
        }
    }

    /// Angle of the prime meridian at `t`.
    pub fn angle_at(&self, t: Instant) -> Angle {
        match &self.rotation {
            Some(rotation) => {
                rotation.reference_angle
                    + rotation.angular_frequency * (t - rotation.reference_instant)
            }
            None => Angle::zero(),
        }
    }

    /// Maps the surface frame of the body at `t` to `F`. The identity for a
    /// body that does not rotate.
    pub fn from_surface_frame<F: Frame>(&self, t: Instant) -> Rotation<BodySurface, F> {
        let Some(rotation) = &self.rotation else {
            return Rotation::identity();
        };
        let (ra, dec) = (rotation.right_ascension_of_pole, rotation.declination_of_pole);
        // The prime meridian is measured from the ascending node of the
        // equator, 90° east of the right ascension of the pole.
        Rotation::from_matrix(
            Rotation3::from_axis_angle(&Vector3::z_axis(), ra.to_radians() + FRAC_PI_2)
                * Rotation3::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2 - dec.to_radians())
                * Rotation3::from_axis_angle(&Vector3::z_axis(), self.angle_at(t).to_radians()),
        )
    }

    pub fn to_message(&self) -> BodyMessage {
        BodyMessage {
            gravitational_parameter: self.gravitational_parameter,
            rotation: self.rotation,
            oblateness: self.oblateness,
        }
    }

    pub fn from_message(message: &BodyMessage) -> Result<Self, BodyError> {
        let mut body = Self::new(message.gravitational_parameter)?;
        if let Some(rotation) = message.rotation {
            body = body.with_rotation(rotation);
        }
        if let Some(oblateness) = message.oblateness {
            body = body.with_oblateness(oblateness.j2, oblateness.reference_radius)?;
        }
        Ok(body)
    }
}

/// Any body of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Exerts no force; used for vessels and for centres of mass.
    Massless,
    Massive(MassiveBody),
}

impl Body {
    pub fn is_massless(&self) -> bool {
        matches!(self, Body::Massless)
    }

    pub fn gravitational_parameter(&self) -> Option<GravitationalParameter> {
        match self {
            Body::Massless => None,
            Body::Massive(body) => Some(body.gravitational_parameter()),
        }
    }

    pub fn as_massive(&self) -> Option<&MassiveBody> {
        match self {
            Body::Massless => None,
            Body::Massive(body) => Some(body),
        }
    }
}

/// Persisted form of a [`MassiveBody`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMessage {
    pub gravitational_parameter: GravitationalParameter,
    #[serde(default)]
    pub rotation: Option<RotationParameters>,
    #[serde(default)]
    pub oblateness: Option<Oblateness>,
}
