//! Direct N-body gravity with zonal harmonics
//!
//! Each unordered pair of massive bodies is visited once: the pair's field
//! per unit gravitational parameter is computed a single time and applied
//! with opposite signs to both bodies, scaled by the other body's μ. This
//! keeps the computation symmetric, so that the total momentum is conserved
//! to rounding. The J2 term of an oblate body is added on top of its point
//! mass term.

use nalgebra::Vector3;

use crate::body::MassiveBody;

/// Field at displacement `r` from a point mass, per unit gravitational
/// parameter.
fn point_mass_field(r: &Vector3<f64>) -> Vector3<f64> {
    let r2 = r.norm_squared();
    -r / (r2 * r2.sqrt())
}

/// Field of the J2 term of `body` at displacement `r` from its centre, per
/// unit gravitational parameter; zero for a spherical body.
fn oblateness_field(body: &MassiveBody, r: &Vector3<f64>) -> Vector3<f64> {
    let Some(oblateness) = body.oblateness() else {
        return Vector3::zeros();
    };
    let axis = body.polar_axis();
    let r2 = r.norm_squared();
    let r_norm = r2.sqrt();
    let z = r.dot(&axis);
    let radius = oblateness.reference_radius.to_meters();
    let factor = -1.5 * oblateness.j2 * radius * radius / (r2 * r2 * r_norm);
    (r * (1.0 - 5.0 * z * z / r2) + axis * (2.0 * z)) * factor
}

/// Field of `body` at displacement `r` from its centre, per unit
/// gravitational parameter.
fn body_field(body: &MassiveBody, r: &Vector3<f64>) -> Vector3<f64> {
    point_mass_field(r) + oblateness_field(body, r)
}

/// Computes the accelerations of massive bodies under their mutual
/// attraction.
///
/// `positions` and `accelerations` hold three coordinates per body, in the
/// order of `bodies`.
///
/// # Examples
///
/// ```
/// use physics::body::MassiveBody;
/// use physics::gravity::compute_mutual_accelerations;
/// use units::GravitationalParameter;
///
/// let bodies = vec![
///     MassiveBody::new(GravitationalParameter::from_m3_per_s2(2.0)).unwrap(),
///     MassiveBody::new(GravitationalParameter::from_m3_per_s2(1.0)).unwrap(),
/// ];
/// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
/// let mut accelerations = [0.0; 6];
/// compute_mutual_accelerations(&bodies, &positions, &mut accelerations);
///
/// assert_eq!(accelerations[0], 1.0);
/// assert_eq!(accelerations[3], -2.0);
/// ```
pub fn compute_mutual_accelerations(
    bodies: &[MassiveBody],
    positions: &[f64],
    accelerations: &mut [f64],
) {
    accelerations.iter_mut().for_each(|a| *a = 0.0);

    for i in 0..bodies.len() {
        let qi = Vector3::from_column_slice(&positions[3 * i..3 * i + 3]);
        let mu_i = bodies[i].gravitational_parameter().to_m3_per_s2();
        let mut ai = Vector3::zeros();

        for j in i + 1..bodies.len() {
            let qj = Vector3::from_column_slice(&positions[3 * j..3 * j + 3]);
            let mu_j = bodies[j].gravitational_parameter().to_m3_per_s2();
            let r_ij = qj - qi;

            // Field of i at j, and field of j at i.
            let mut field_at_j = point_mass_field(&r_ij);
            let mut field_at_i = -field_at_j;
            if bodies[i].is_oblate() {
                let extra = oblateness_field(&bodies[i], &r_ij);
                field_at_j += extra;
                field_at_i -= extra;
            }
            if bodies[j].is_oblate() {
                let extra = oblateness_field(&bodies[j], &-r_ij);
                field_at_i += extra;
                field_at_j -= extra;
            }

            ai += field_at_i * mu_j;
            let aj = field_at_j * mu_i;
            accelerations[3 * j] += aj.x;
            accelerations[3 * j + 1] += aj.y;
            accelerations[3 * j + 2] += aj.z;
        }

        accelerations[3 * i] += ai.x;
        accelerations[3 * i + 1] += ai.y;
        accelerations[3 * i + 2] += ai.z;
    }
}

/// Computes the acceleration of a massless body at `position` given the
/// positions of the massive bodies.
pub fn compute_massless_acceleration(
    bodies: &[MassiveBody],
    body_positions: &[Vector3<f64>],
    position: &Vector3<f64>,
) -> Vector3<f64> {
    bodies
        .iter()
        .zip(body_positions)
        .map(|(body, q)| {
            body_field(body, &(position - q)) * body.gravitational_parameter().to_m3_per_s2()
        })
        .fold(Vector3::zeros(), |acc, a| acc + a)
}

/// Point mass potential energy of the system divided by G, in m⁵/s⁴.
///
/// Dividing by G lets the energy be expressed with gravitational parameters
/// only: the kinetic counterpart is Σ μᵢvᵢ²/2.
pub fn point_mass_potential_energy(bodies: &[MassiveBody], positions: &[f64]) -> f64 {
    (0..bodies.len())
        .flat_map(|i| (i + 1..bodies.len()).map(move |j| (i, j)))
        .map(|(i, j)| {
            let qi = Vector3::from_column_slice(&positions[3 * i..3 * i + 3]);
            let qj = Vector3::from_column_slice(&positions[3 * j..3 * j + 3]);
            -bodies[i].gravitational_parameter().to_m3_per_s2()
                * bodies[j].gravitational_parameter().to_m3_per_s2()
                / (qj - qi).norm()
        })
        .sum()
}
