//! Union-find over arbitrary keys
//!
//! Used to partition the vessels of the physics bubble into pile-ups: two
//! vessels reported in contact end up in the same subset. The forest uses
//! path compression and union by rank.

use std::collections::BTreeMap;

/// A partition of keys into disjoint subsets.
///
/// # Examples
///
/// ```
/// use plugin::disjoint_sets::DisjointSets;
///
/// let mut sets = DisjointSets::new();
/// for key in ["a", "b", "c", "d"] {
///     sets.insert(key);
/// }
/// sets.union(&"a", &"b");
/// sets.union(&"c", &"b");
///
/// assert_eq!(sets.find(&"a"), sets.find(&"c"));
/// assert_ne!(sets.find(&"a"), sets.find(&"d"));
/// assert_eq!(sets.subsets(), vec![vec!["a", "b", "c"], vec!["d"]]);
/// ```
#[derive(Debug, Clone)]
pub struct DisjointSets<K: Ord + Clone> {
    indices: BTreeMap<K, usize>,
    keys: Vec<K>,
    parents: Vec<usize>,
    ranks: Vec<u32>,
}

impl<K: Ord + Clone> Default for DisjointSets<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> DisjointSets<K> {
    pub fn new() -> Self {
        Self {
            indices: BTreeMap::new(),
            keys: Vec::new(),
            parents: Vec::new(),
            ranks: Vec::new(),
        }
    }

    /// Adds `key` as a singleton. Returns false if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.indices.contains_key(&key) {
            return false;
        }
        let index = self.keys.len();
        self.indices.insert(key.clone(), index);
        self.keys.push(key);
        self.parents.push(index);
        self.ranks.push(0);
        true
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.indices.contains_key(key)
    }

    /// The representative of the subset containing `key`.
    pub fn find(&mut self, key: &K) -> Option<K> {
        let index = *self.indices.get(key)?;
        let root = self.find_root(index);
        Some(self.keys[root].clone())
    }

    /// Merges the subsets of `a` and `b`. Returns false if either key is
    /// unknown or if they were already in the same subset.
    pub fn union(&mut self, a: &K, b: &K) -> bool {
        let (Some(&a), Some(&b)) = (self.indices.get(a), self.indices.get(b)) else {
            return false;
        };
        let (a, b) = (self.find_root(a), self.find_root(b));
        if a == b {
            return false;
        }
        match self.ranks[a].cmp(&self.ranks[b]) {
            std::cmp::Ordering::Less => self.parents[a] = b,
            std::cmp::Ordering::Greater => self.parents[b] = a,
            std::cmp::Ordering::Equal => {
                self.parents[b] = a;
                self.ranks[a] += 1;
            }
        }
        true
    }

    /// All the subsets, each sorted, ordered by their smallest key.
    pub fn subsets(&mut self) -> Vec<Vec<K>> {
        let mut by_root: BTreeMap<usize, Vec<K>> = BTreeMap::new();
        for index in 0..self.keys.len() {
            let root = self.find_root(index);
            by_root.entry(root).or_default().push(self.keys[index].clone());
        }
        let mut subsets: Vec<Vec<K>> = by_root
            .into_values()
            .map(|mut subset| {
                subset.sort();
                subset
            })
            .collect();
        subsets.sort();
        subsets
    }

    fn find_root(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        // Path compression.
        let mut current = index;
        while self.parents[current] != root {
            let next = self.parents[current];
            self.parents[current] = root;
            current = next;
        }
        root
    }
}
