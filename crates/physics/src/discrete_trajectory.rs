//! Forking trajectory trees stored in an arena
//!
//! A [`DiscreteTrajectoryTree`] holds any number of trees of time-sampled
//! trajectories. Each node owns its samples and its child forks; a child
//! shares the samples of its ancestors up to its fork time instead of
//! copying them. Nodes live contiguously in a `Vec` and refer to each other
//! through generational [`TrajectoryId`] handles, so that a handle to a
//! deleted node is detected instead of silently reading whatever node reuses
//! its slot.
//!
//! # Example
//!
//! ```rust
//! use geometry::{Barycentric, DegreesOfFreedom, Position, Velocity};
//! use physics::discrete_trajectory::DiscreteTrajectoryTree;
//! use units::{Instant, Time};
//!
//! let dof = DegreesOfFreedom::<Barycentric>::new(Position::origin(), Velocity::zero());
//! let t = |s: f64| Instant::J2000 + Time::from_seconds(s);
//!
//! let mut tree = DiscreteTrajectoryTree::new();
//! let history = tree.new_root();
//! tree.append(history, t(0.0), dof).unwrap();
//! tree.append(history, t(1.0), dof).unwrap();
//!
//! let prediction = tree.fork(history, t(1.0)).unwrap();
//! tree.append(prediction, t(2.0), dof).unwrap();
//!
//! let times: Vec<_> = tree.iter(prediction).unwrap().map(|s| s.time).collect();
//! assert_eq!(times, vec![t(0.0), t(1.0), t(2.0)]);
//! ```

use geometry::{DegreesOfFreedom, Frame, Position, Velocity};
use integrators::Hermite3;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use units::Instant;

use crate::error::TrajectoryError;

/// Handle to a node of a [`DiscreteTrajectoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrajectoryId {
    index: u32,
    generation: u32,
}

/// Degrees of freedom at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Sample<F: Frame> {
    pub time: Instant,
    pub degrees_of_freedom: DegreesOfFreedom<F>,
}

impl<F: Frame> Sample<F> {
    pub fn new(time: Instant, degrees_of_freedom: DegreesOfFreedom<F>) -> Self {
        Self {
            time,
            degrees_of_freedom,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ParentLink {
    parent: TrajectoryId,
    fork_time: Instant,
}

#[derive(Debug, Clone)]
struct Node<F: Frame> {
    samples: Vec<Sample<F>>,
    parent: Option<ParentLink>,
    children: Vec<TrajectoryId>,
}

#[derive(Debug, Clone)]
struct Slot<F: Frame> {
    generation: u32,
    node: Option<Node<F>>,
}

/// An arena of trajectory trees.
#[derive(Debug, Clone)]
pub struct DiscreteTrajectoryTree<F: Frame> {
    slots: Vec<Slot<F>>,
    free: Vec<u32>,
}

impl<F: Frame> Default for DiscreteTrajectoryTree<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Frame> DiscreteTrajectoryTree<F> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Creates an empty root trajectory.
    pub fn new_root(&mut self) -> TrajectoryId {
        self.allocate(Node {
            samples: Vec::new(),
            parent: None,
            children: Vec::new(),
        })
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: TrajectoryId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn parent(&self, id: TrajectoryId) -> Result<Option<TrajectoryId>, TrajectoryError> {
        Ok(self.node(id)?.parent.map(|link| link.parent))
    }

    /// The time of the sample this node was forked at, `None` for a root.
    pub fn fork_time(&self, id: TrajectoryId) -> Result<Option<Instant>, TrajectoryError> {
        Ok(self.node(id)?.parent.map(|link| link.fork_time))
    }

    pub fn children(&self, id: TrajectoryId) -> Result<&[TrajectoryId], TrajectoryError> {
        Ok(&self.node(id)?.children)
    }

    pub fn root_of(&self, id: TrajectoryId) -> Result<TrajectoryId, TrajectoryError> {
        let mut current = id;
        while let Some(link) = self.node(current)?.parent {
            current = link.parent;
        }
        Ok(current)
    }

    /// The samples owned by this node, excluding those of its ancestors.
    pub fn own_samples(&self, id: TrajectoryId) -> Result<&[Sample<F>], TrajectoryError> {
        Ok(&self.node(id)?.samples)
    }

    /// Appends a sample after the last one of the timeline of `id`.
    pub fn append(
        &mut self,
        id: TrajectoryId,
        time: Instant,
        degrees_of_freedom: DegreesOfFreedom<F>,
    ) -> Result<(), TrajectoryError> {
        if let Some(last) = self.last_time(id)? {
            if time <= last {
                return Err(TrajectoryError::NonMonotonicAppend { time, last });
            }
        }
        self.node_mut(id)?
            .samples
            .push(Sample::new(time, degrees_of_freedom));
        Ok(())
    }

    /// The time of the last sample of the timeline of `id`.
    pub fn last_time(&self, id: TrajectoryId) -> Result<Option<Instant>, TrajectoryError> {
        let node = self.node(id)?;
        Ok(match node.samples.last() {
            Some(sample) => Some(sample.time),
            None => node.parent.map(|link| link.fork_time),
        })
    }

    /// The last sample of the timeline of `id`, which is the fork point if
    /// the node has no samples of its own.
    pub fn last(&self, id: TrajectoryId) -> Result<Option<Sample<F>>, TrajectoryError> {
        let node = self.node(id)?;
        match (node.samples.last(), node.parent) {
            (Some(sample), _) => Ok(Some(*sample)),
            (None, Some(link)) => self.find(link.parent, link.fork_time),
            (None, None) => Ok(None),
        }
    }

    pub fn first(&self, id: TrajectoryId) -> Result<Option<Sample<F>>, TrajectoryError> {
        Ok(self.iter(id)?.next().copied())
    }

    /// The sample at exactly `time` in the timeline of `id`.
    pub fn find(
        &self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<Option<Sample<F>>, TrajectoryError> {
        Ok(self
            .owner_of(id, time)?
            .and_then(|(owner, index)| self.node(owner).ok().map(|n| n.samples[index])))
    }

    /// Iterates over the timeline of `id`, from the first sample of its root
    /// to its own last sample.
    pub fn iter(
        &self,
        id: TrajectoryId,
    ) -> Result<impl Iterator<Item = &Sample<F>> + '_, TrajectoryError> {
        Ok(self.segments(id)?.into_iter().flatten())
    }

    /// Number of samples in the timeline of `id`.
    pub fn len(&self, id: TrajectoryId) -> Result<usize, TrajectoryError> {
        Ok(self.iter(id)?.count())
    }

    /// Creates a child of `id` anchored at the sample at `time`.
    ///
    /// The child hangs from whichever node of the lineage owns that sample,
    /// so deleting `id` later does not delete the new fork unless `id` owns
    /// the fork point.
    pub fn fork(
        &mut self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<TrajectoryId, TrajectoryError> {
        let (owner, _) = self
            .owner_of(id, time)?
            .ok_or(TrajectoryError::NoSampleAt(time))?;
        Ok(self.attach_child(owner, time))
    }

    /// Deletes `id` and its whole subtree.
    pub fn delete_fork(&mut self, id: TrajectoryId) -> Result<(), TrajectoryError> {
        let parent = self
            .node(id)?
            .parent
            .ok_or(TrajectoryError::CannotDeleteRoot)?
            .parent;
        self.node_mut(parent)?.children.retain(|child| *child != id);
        self.free_subtree(id);
        Ok(())
    }

    /// Deletes a whole tree given its root.
    pub fn delete_tree(&mut self, root: TrajectoryId) -> Result<(), TrajectoryError> {
        if self.node(root)?.parent.is_some() {
            return Err(TrajectoryError::NotARoot(root));
        }
        self.free_subtree(root);
        Ok(())
    }

    /// Removes the samples strictly before `time` from the whole tree that
    /// contains `id`.
    ///
    /// Forks made before `time` whose subtree keeps no samples are deleted;
    /// the others are kept and their timelines now start at their own first
    /// sample.
    pub fn forget_before(
        &mut self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<(), TrajectoryError> {
        let root = self.root_of(id)?;
        let deleted = self.forget_node_before(root, time)?;
        if deleted > 0 {
            debug!(deleted, %time, "forgot trajectory forks");
        }
        Ok(())
    }

    /// Builds an independent tree holding the timeline of `id`, mapping each
    /// sample through `map`.
    pub fn copy_timeline<G, M>(
        &self,
        id: TrajectoryId,
        map: M,
    ) -> Result<(DiscreteTrajectoryTree<G>, TrajectoryId), TrajectoryError>
    where
        G: Frame,
        M: Fn(&Sample<F>) -> Sample<G>,
    {
        let mut tree = DiscreteTrajectoryTree::new();
        let root = tree.new_root();
        for sample in self.iter(id)? {
            let mapped = map(sample);
            tree.append(root, mapped.time, mapped.degrees_of_freedom)?;
        }
        Ok((tree, root))
    }

    /// Degrees of freedom at `time`, interpolated between the surrounding
    /// samples of the timeline of `id`.
    pub fn evaluate_degrees_of_freedom(
        &self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<DegreesOfFreedom<F>, TrajectoryError> {
        let segments = self.segments(id)?;
        let first = segments.first().and_then(|segment| segment.first());
        let last = segments.last().and_then(|segment| segment.last());
        let (Some(first), Some(last)) = (first, last) else {
            return Err(TrajectoryError::Empty);
        };
        if time < first.time || time > last.time {
            return Err(TrajectoryError::OutOfRange {
                time,
                t_min: first.time,
                t_max: last.time,
            });
        }

        // The first segment that does not end before `time`.
        let k = segments.partition_point(|segment| segment.last().is_some_and(|s| s.time < time));
        let segment = segments[k];
        let upper = segment.partition_point(|s| s.time < time);
        if segment[upper].time == time {
            return Ok(segment[upper].degrees_of_freedom);
        }
        let lower = match upper.checked_sub(1) {
            Some(index) => &segment[index],
            None => segments[..k]
                .last()
                .and_then(|previous| previous.last())
                .ok_or(TrajectoryError::Empty)?,
        };
        Ok(interpolate(lower, &segment[upper], time))
    }

    /// Position of `id` among its siblings at each level, from the root
    /// down.
    pub fn child_path(&self, id: TrajectoryId) -> Result<Vec<usize>, TrajectoryError> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(link) = self.node(current)?.parent {
            let siblings = &self.node(link.parent)?.children;
            let position = siblings
                .iter()
                .position(|child| *child == current)
                .ok_or(TrajectoryError::StaleHandle(current))?;
            path.push(position);
            current = link.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// The node reached from `root` by following `path`.
    pub fn node_at_path(
        &self,
        root: TrajectoryId,
        path: &[usize],
    ) -> Result<TrajectoryId, TrajectoryError> {
        path.iter().try_fold(root, |current, &index| {
            self.node(current)?
                .children
                .get(index)
                .copied()
                .ok_or_else(|| TrajectoryError::InvalidForkPath(path.to_vec()))
        })
    }

    /// Serializes the subtree rooted at `id`, which need not be a root.
    pub fn to_message(
        &self,
        id: TrajectoryId,
    ) -> Result<DiscreteTrajectoryMessage<F>, TrajectoryError> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|child| -> Result<ForkMessage<F>, TrajectoryError> {
                Ok(ForkMessage {
                    fork_time: self.fork_time(*child)?.ok_or(TrajectoryError::StaleHandle(*child))?,
                    trajectory: self.to_message(*child)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DiscreteTrajectoryMessage {
            samples: node.samples.clone(),
            children,
        })
    }

    /// Adds the tree described by `message` to the arena and returns its
    /// root.
    pub fn read_message(
        &mut self,
        message: &DiscreteTrajectoryMessage<F>,
    ) -> Result<TrajectoryId, TrajectoryError> {
        let root = self.new_root();
        if let Err(error) = self.fill_from_message(root, message) {
            self.free_subtree(root);
            return Err(error);
        }
        Ok(root)
    }

    /// Builds a new arena holding only the tree described by `message`.
    pub fn from_message(
        message: &DiscreteTrajectoryMessage<F>,
    ) -> Result<(Self, TrajectoryId), TrajectoryError> {
        let mut tree = Self::new();
        let root = tree.read_message(message)?;
        Ok((tree, root))
    }

    fn fill_from_message(
        &mut self,
        id: TrajectoryId,
        message: &DiscreteTrajectoryMessage<F>,
    ) -> Result<(), TrajectoryError> {
        for sample in &message.samples {
            self.append(id, sample.time, sample.degrees_of_freedom)?;
        }
        for fork in &message.children {
            let owned = self.node(id)?.samples.binary_search_by(|s| s.time.cmp(&fork.fork_time));
            // A fork made before a forget may point before the first sample.
            let first = self.node(id)?.samples.first().map(|s| s.time);
            if owned.is_err() && first.map_or(false, |first| fork.fork_time >= first) {
                return Err(TrajectoryError::NoSampleAt(fork.fork_time));
            }
            let child = self.attach_child(id, fork.fork_time);
            self.fill_from_message(child, &fork.trajectory)?;
        }
        Ok(())
    }

    // The non-empty sample slices making up the timeline of `id`, root first.
    fn segments(&self, id: TrajectoryId) -> Result<Vec<&[Sample<F>]>, TrajectoryError> {
        let mut segments = Vec::new();
        let mut node = self.node(id)?;
        segments.push(node.samples.as_slice());
        while let Some(link) = node.parent {
            node = self.node(link.parent)?;
            let end = node.samples.partition_point(|s| s.time <= link.fork_time);
            segments.push(&node.samples[..end]);
        }
        segments.retain(|segment| !segment.is_empty());
        segments.reverse();
        Ok(segments)
    }

    fn attach_child(&mut self, parent: TrajectoryId, fork_time: Instant) -> TrajectoryId {
        let child = self.allocate(Node {
            samples: Vec::new(),
            parent: Some(ParentLink { parent, fork_time }),
            children: Vec::new(),
        });
        if let Ok(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        child
    }

    /// The node of the lineage of `id` owning the sample at `time`, and the
    /// index of that sample.
    fn owner_of(
        &self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<Option<(TrajectoryId, usize)>, TrajectoryError> {
        let mut current = id;
        let mut bound: Option<Instant> = None;
        loop {
            if bound.map_or(false, |bound| time > bound) {
                return Ok(None);
            }
            let node = self.node(current)?;
            if let Ok(index) = node.samples.binary_search_by(|s| s.time.cmp(&time)) {
                return Ok(Some((current, index)));
            }
            match node.parent {
                Some(link) => {
                    bound = Some(link.fork_time);
                    current = link.parent;
                }
                None => return Ok(None),
            }
        }
    }

    /// Returns the number of nodes deleted.
    fn forget_node_before(
        &mut self,
        id: TrajectoryId,
        time: Instant,
    ) -> Result<usize, TrajectoryError> {
        let node = self.node_mut(id)?;
        let end = node.samples.partition_point(|s| s.time < time);
        node.samples.drain(..end);

        let mut deleted = 0;
        let children = node.children.clone();
        for child in children {
            if self.fork_time(child)?.map_or(false, |fork_time| fork_time < time) {
                deleted += self.forget_node_before(child, time)?;
                let child_node = self.node(child)?;
                if child_node.samples.is_empty() && child_node.children.is_empty() {
                    deleted += 1;
                    self.delete_fork(child)?;
                }
            }
        }
        Ok(deleted)
    }

    fn allocate(&mut self, node: Node<F>) -> TrajectoryId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                TrajectoryId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                TrajectoryId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn free_subtree(&mut self, id: TrajectoryId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index as usize)
                .filter(|slot| slot.generation == current.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    fn node(&self, id: TrajectoryId) -> Result<&Node<F>, TrajectoryError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(TrajectoryError::StaleHandle(id))
    }

    fn node_mut(&mut self, id: TrajectoryId) -> Result<&mut Node<F>, TrajectoryError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TrajectoryError::StaleHandle(id))
    }
}

/// Cubic Hermite interpolation of the degrees of freedom between two
/// samples, velocities being the derivatives of positions.
pub(crate) fn interpolate<F: Frame>(
    lower: &Sample<F>,
    upper: &Sample<F>,
    time: Instant,
) -> DegreesOfFreedom<F> {
    let hermite = Hermite3::<Vector3<f64>>::new(
        (lower.time, upper.time),
        (
            lower.degrees_of_freedom.position.coordinates(),
            upper.degrees_of_freedom.position.coordinates(),
        ),
        (
            lower.degrees_of_freedom.velocity.coordinates(),
            upper.degrees_of_freedom.velocity.coordinates(),
        ),
    );
    DegreesOfFreedom::new(
        Position::from_coordinates(hermite.evaluate(time)),
        Velocity::from_coordinates(hermite.evaluate_derivative(time)),
    )
}

/// Persisted form of a trajectory and its forks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DiscreteTrajectoryMessage<F: Frame> {
    pub samples: Vec<Sample<F>>,
    #[serde(default)]
    pub children: Vec<ForkMessage<F>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ForkMessage<F: Frame> {
    pub fork_time: Instant,
    pub trajectory: DiscreteTrajectoryMessage<F>,
}
