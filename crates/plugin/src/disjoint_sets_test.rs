use crate::disjoint_sets::DisjointSets;

#[test]
fn test_singletons() {
    let mut sets = DisjointSets::new();
    assert!(sets.is_empty());
    assert!(sets.insert(3));
    assert!(sets.insert(1));
    assert!(!sets.insert(3));
    assert_eq!(sets.len(), 2);
    assert_eq!(sets.find(&3), Some(3));
    assert_eq!(sets.subsets(), vec![vec![1], vec![3]]);
}

#[test]
fn test_unknown_keys() {
    let mut sets = DisjointSets::new();
    sets.insert(1);
    assert!(!sets.contains(&2));
    assert_eq!(sets.find(&2), None);
    assert!(!sets.union(&1, &2));
    assert_eq!(sets.subsets(), vec![vec![1]]);
}

#[test]
fn test_union_is_transitive() {
    let mut sets = DisjointSets::new();
    for key in 0..8 {
        sets.insert(key);
    }
    assert!(sets.union(&0, &5));
    assert!(sets.union(&5, &7));
    assert!(sets.union(&2, &3));
    assert!(!sets.union(&7, &0));

    assert_eq!(sets.find(&0), sets.find(&7));
    assert_ne!(sets.find(&0), sets.find(&2));
    assert_eq!(
        sets.subsets(),
        vec![vec![0, 5, 7], vec![1], vec![2, 3], vec![4], vec![6]]
    );
}

#[test]
fn test_long_chain_collapses_into_one_subset() {
    let mut sets = DisjointSets::new();
    for key in 0..100 {
        sets.insert(key);
    }
    for key in 1..100 {
        sets.union(&(key - 1), &key);
    }
    let subsets = sets.subsets();
    assert_eq!(subsets.len(), 1);
    assert_eq!(subsets[0], (0..100).collect::<Vec<_>>());
    let representative = sets.find(&0);
    assert!((0..100).all(|key| sets.find(&key) == representative));
}
