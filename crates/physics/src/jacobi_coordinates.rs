//! Jacobi coordinates and hierarchical systems
//!
//! In Jacobi coordinates each body is placed relative to the barycentre of
//! the bodies added before it. A [`HierarchicalSystem`] nests them: every
//! body has a primary, and a satellite orbits the barycentre of its
//! primary and of the satellites closer in, carrying its own satellites
//! along.

use std::collections::BTreeMap;

use geometry::{Barycentre, DegreesOfFreedom, Frame, Position, RelativeDegreesOfFreedom, Velocity};
use units::GravitationalParameter;

use crate::body::MassiveBody;
use crate::error::OrbitError;
use crate::kepler_orbit::KeplerianElements;

/// Degrees of freedom built up body by body, the primary at the origin.
///
/// # Examples
///
/// ```
/// use geometry::{Barycentric, Displacement, RelativeDegreesOfFreedom, Velocity};
/// use physics::JacobiCoordinates;
/// use units::GravitationalParameter;
///
/// let primary = GravitationalParameter::from_m3_per_s2(3.0);
/// let mut system = JacobiCoordinates::<Barycentric>::new(primary);
/// let secondary = system.add(
///     GravitationalParameter::from_m3_per_s2(1.0),
///     RelativeDegreesOfFreedom::new(Displacement::new(4.0, 0.0, 0.0), Velocity::zero()),
/// );
/// assert_eq!(secondary.position.from_origin(), Displacement::new(4.0, 0.0, 0.0));
/// assert_eq!(system.barycentre().position.from_origin(), Displacement::new(1.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct JacobiCoordinates<F: Frame> {
    barycentre: Barycentre<F>,
}

impl<F: Frame> JacobiCoordinates<F> {
    pub fn new(primary: GravitationalParameter) -> Self {
        let mut barycentre = Barycentre::new();
        barycentre.add(
            &DegreesOfFreedom::new(Position::origin(), Velocity::zero()),
            primary.to_m3_per_s2(),
        );
        Self { barycentre }
    }

    /// Adds a body at `relative` to the barycentre of the bodies already in
    /// the system and returns its degrees of freedom.
    pub fn add(
        &mut self,
        gravitational_parameter: GravitationalParameter,
        relative: RelativeDegreesOfFreedom<F>,
    ) -> DegreesOfFreedom<F> {
        let degrees_of_freedom = self.barycentre() + relative;
        self.barycentre
            .add(&degrees_of_freedom, gravitational_parameter.to_m3_per_s2());
        degrees_of_freedom
    }

    /// Adds a body on an orbit about the barycentre of the system, the
    /// system and the body being treated as a two-body problem.
    pub fn add_keplerian(
        &mut self,
        gravitational_parameter: GravitationalParameter,
        elements: &KeplerianElements,
    ) -> Result<DegreesOfFreedom<F>, OrbitError> {
        let mu = GravitationalParameter::from_m3_per_s2(
            self.system_gravitational_parameter().to_m3_per_s2()
                + gravitational_parameter.to_m3_per_s2(),
        );
        let relative = elements.state_vectors(mu)?;
        Ok(self.add(gravitational_parameter, relative))
    }

    pub fn system_gravitational_parameter(&self) -> GravitationalParameter {
        GravitationalParameter::from_m3_per_s2(self.barycentre.total_weight())
    }

    pub fn barycentre(&self) -> DegreesOfFreedom<F> {
        self.barycentre
            .get()
            .unwrap_or_else(|| DegreesOfFreedom::new(Position::origin(), Velocity::zero()))
    }
}

/// A body of a [`HierarchicalSystem`] placed in the frame of the system.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemBody<K, F: Frame> {
    pub key: K,
    pub parent: Option<K>,
    pub body: MassiveBody,
    /// Relative to the barycentre of the whole system, which is at rest at
    /// the origin.
    pub degrees_of_freedom: DegreesOfFreedom<F>,
}

#[derive(Debug, Clone)]
struct Node<K> {
    body: MassiveBody,
    parent: Option<K>,
    elements: Option<KeplerianElements>,
    satellites: Vec<K>,
}

/// Bodies described by their orbits about their primaries.
///
/// Satellites of the same primary are placed from the innermost outwards,
/// each on its osculating orbit about the barycentre of its primary and of
/// the satellites inside it.
#[derive(Debug, Clone)]
pub struct HierarchicalSystem<K: Ord + Copy, F: Frame> {
    primary: K,
    nodes: BTreeMap<K, Node<K>>,
    frame: std::marker::PhantomData<F>,
}

impl<K: Ord + Copy, F: Frame> HierarchicalSystem<K, F> {
    pub fn new(primary: K, body: MassiveBody) -> Self {
        let node = Node {
            body,
            parent: None,
            elements: None,
            satellites: Vec::new(),
        };
        Self {
            primary,
            nodes: BTreeMap::from([(primary, node)]),
            frame: std::marker::PhantomData,
        }
    }

    pub fn primary(&self) -> K {
        self.primary
    }

    pub fn contains(&self, key: &K) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds `body` on the orbit given by `elements` about `parent`, which
    /// must already be in the system.
    pub fn add(
        &mut self,
        key: K,
        parent: K,
        elements: KeplerianElements,
        body: MassiveBody,
    ) -> Result<(), OrbitError> {
        if self.nodes.contains_key(&key) {
            return Err(OrbitError::DuplicateBody);
        }
        elements.validate()?;
        self.nodes
            .get_mut(&parent)
            .ok_or(OrbitError::UnknownParent)?
            .satellites
            .push(key);
        self.nodes.insert(
            key,
            Node {
                body,
                parent: Some(parent),
                elements: Some(elements),
                satellites: Vec::new(),
            },
        );
        Ok(())
    }

    /// Every body of the system, parents before their satellites.
    pub fn barycentric_system(&self) -> Result<Vec<SystemBody<K, F>>, OrbitError> {
        let (_, states) = self.subsystem(self.primary)?;
        states
            .into_iter()
            .map(|(key, relative)| {
                let node = self.nodes.get(&key).ok_or(OrbitError::UnknownParent)?;
                Ok(SystemBody {
                    key,
                    parent: node.parent,
                    body: node.body.clone(),
                    degrees_of_freedom: DegreesOfFreedom::new(Position::origin(), Velocity::zero())
                        + relative,
                })
            })
            .collect()
    }

    /// The gravitational parameter of the subsystem rooted at `key` and the
    /// states of its bodies relative to its barycentre.
    fn subsystem(
        &self,
        key: K,
    ) -> Result<(GravitationalParameter, Vec<(K, RelativeDegreesOfFreedom<F>)>), OrbitError> {
        let node = self.nodes.get(&key).ok_or(OrbitError::UnknownParent)?;
        let mut satellites = node
            .satellites
            .iter()
            .map(|satellite| {
                let elements = self
                    .nodes
                    .get(satellite)
                    .and_then(|node| node.elements)
                    .ok_or(OrbitError::UnknownParent)?;
                Ok((*satellite, elements))
            })
            .collect::<Result<Vec<_>, OrbitError>>()?;
        satellites.sort_by(|(_, a), (_, b)| {
            a.semimajor_axis
                .to_meters()
                .total_cmp(&b.semimajor_axis.to_meters())
        });

        let origin = DegreesOfFreedom::new(Position::origin(), Velocity::zero());
        let mut jacobi = JacobiCoordinates::new(node.body.gravitational_parameter());
        let mut states = vec![(key, RelativeDegreesOfFreedom::zero())];
        for (satellite, elements) in satellites {
            let (mu, satellite_states) = self.subsystem(satellite)?;
            let offset = jacobi.add_keplerian(mu, &elements)? - origin;
            states.extend(
                satellite_states
                    .into_iter()
                    .map(|(key, relative)| (key, offset + relative)),
            );
        }

        let shift = -(jacobi.barycentre() - origin);
        let states = states
            .into_iter()
            .map(|(key, relative)| (key, relative + shift))
            .collect();
        Ok((jacobi.system_gravitational_parameter(), states))
    }
}
