//! Keplerian orbits
//!
//! Osculating elements of a bound orbit and their conversion to state
//! vectors relative to the primary.

use std::f64::consts::PI;

use geometry::{Displacement, Frame, RelativeDegreesOfFreedom, Velocity};
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use units::{Angle, GravitationalParameter, Length};

use crate::error::OrbitError;

const KEPLER_EQUATION_ITERATIONS: usize = 50;

/// Osculating elements of an elliptic orbit.
///
/// The angles are measured in the reference plane (xy) of the frame the
/// state vectors are computed in, from its x axis.
///
/// # Examples
///
/// ```
/// use geometry::Barycentric;
/// use physics::KeplerianElements;
/// use units::{Angle, GravitationalParameter, Length};
///
/// let elements = KeplerianElements {
///     eccentricity: 0.0,
///     semimajor_axis: Length::from_km(7_000.0),
///     inclination: Angle::zero(),
///     longitude_of_ascending_node: Angle::zero(),
///     argument_of_periapsis: Angle::zero(),
///     mean_anomaly: Angle::zero(),
/// };
/// let mu = GravitationalParameter::from_m3_per_s2(3.986_004_418e14);
/// let state = elements.state_vectors::<Barycentric>(mu).unwrap();
///
/// assert!((state.displacement.norm() - 7.0e6).abs() < 1e-6);
/// assert!((state.velocity.norm() - (3.986_004_418e14_f64 / 7.0e6).sqrt()).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub eccentricity: f64,
    pub semimajor_axis: Length,
    pub inclination: Angle,
    pub longitude_of_ascending_node: Angle,
    pub argument_of_periapsis: Angle,
    pub mean_anomaly: Angle,
}

impl KeplerianElements {
    pub fn validate(&self) -> Result<(), OrbitError> {
        let e = self.eccentricity;
        if !(e.is_finite() && (0.0..1.0).contains(&e)) {
            return Err(OrbitError::UnboundEccentricity(e));
        }
        let a = self.semimajor_axis.to_meters();
        if !(a.is_finite() && a > 0.0) {
            return Err(OrbitError::NonPositiveSemimajorAxis(a));
        }
        for (name, angle) in [
            ("inclination", self.inclination),
            ("longitude of ascending node", self.longitude_of_ascending_node),
            ("argument of periapsis", self.argument_of_periapsis),
            ("mean anomaly", self.mean_anomaly),
        ] {
            if !angle.to_radians().is_finite() {
                return Err(OrbitError::NonFiniteAngle(name));
            }
        }
        Ok(())
    }

    /// Position and velocity of the secondary relative to the primary, `mu`
    /// being the sum of their gravitational parameters.
    pub fn state_vectors<F: Frame>(
        &self,
        mu: GravitationalParameter,
    ) -> Result<RelativeDegreesOfFreedom<F>, OrbitError> {
        self.validate()?;
        let e = self.eccentricity;
        let a = self.semimajor_axis.to_meters();
        let b = a * (1.0 - e * e).sqrt();
        let n = (mu.to_m3_per_s2() / (a * a * a)).sqrt();

        let eccentric_anomaly = solve_kepler_equation(self.mean_anomaly.to_radians(), e);
        let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
        let rate = n / (1.0 - e * cos_e);
        let position = Vector3::new(a * (cos_e - e), b * sin_e, 0.0);
        let velocity = Vector3::new(-a * sin_e * rate, b * cos_e * rate, 0.0);

        let about = |axis: Unit<Vector3<f64>>, angle: Angle| {
            Rotation3::from_axis_angle(&axis, angle.to_radians())
        };
        let to_frame = about(Vector3::z_axis(), self.longitude_of_ascending_node)
            * about(Vector3::x_axis(), self.inclination)
            * about(Vector3::z_axis(), self.argument_of_periapsis);
        Ok(RelativeDegreesOfFreedom::new(
            Displacement::from_coordinates(to_frame * position),
            Velocity::from_coordinates(to_frame * velocity),
        ))
    }
}

/// Solves E − e sin E = M for the eccentric anomaly E of an elliptic orbit.
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> f64 {
    // Reduce to [-π, π) so that the starting point is close to the root.
    let turns = ((mean_anomaly + PI) / (2.0 * PI)).floor();
    let m = mean_anomaly - turns * 2.0 * PI;
    let mut eccentric_anomaly = if eccentricity < 0.8 { m } else { PI.copysign(m) };
    for _ in 0..KEPLER_EQUATION_ITERATIONS {
        let delta = (eccentric_anomaly - eccentricity * eccentric_anomaly.sin() - m)
            / (1.0 - eccentricity * eccentric_anomaly.cos());
        eccentric_anomaly -= delta;
        if delta.abs() <= f64::EPSILON * eccentric_anomaly.abs().max(1.0) {
            break;
        }
    }
    eccentric_anomaly + turns * 2.0 * PI
}
