use serde::Serialize;
use std::collections::BTreeMap;

/// The result of a clustering run.
///
/// `assignments[i]` is the exemplar index chosen by item `i`. Convergence only
/// means the set of items choosing themselves was stable, so an item can still
/// point at an exemplar that chose someone else; see
/// [`Clustering::inconsistent_exemplars`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clustering {
    pub assignments: Vec<usize>,
    /// Distinct values of `assignments`, ascending.
    pub exemplars: Vec<usize>,
    pub converged: bool,
    pub iterations: usize,
}

impl Clustering {
    pub(crate) fn new(assignments: Vec<usize>, converged: bool, iterations: usize) -> Self {
        let mut exemplars = assignments.clone();
        exemplars.sort_unstable();
        exemplars.dedup();

        Self {
            assignments,
            exemplars,
            converged,
            iterations,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn n_clusters(&self) -> usize {
        self.exemplars.len()
    }

    /// Exemplars that don't pick themselves. Can be non-empty whether or not
    /// the run converged.
    pub fn inconsistent_exemplars(&self) -> Vec<usize> {
        self.exemplars
            .iter()
            .copied()
            .filter(|&e| self.assignments[e] != e)
            .collect()
    }

    pub fn is_self_consistent(&self) -> bool {
        self.exemplars.iter().all(|&e| self.assignments[e] == e)
    }

    pub fn cluster_map(&self) -> ClusterMap {
        ClusterMap::from_assignments(&self.assignments)
    }
}

/// Members of each cluster keyed by exemplar, both in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClusterMap(BTreeMap<usize, Vec<usize>>);

impl ClusterMap {
    pub fn from_assignments(assignments: &[usize]) -> Self {
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &exemplar) in assignments.iter().enumerate() {
            clusters.entry(exemplar).or_default().push(i);
        }
        Self(clusters)
    }

    pub fn get(&self, exemplar: usize) -> Option<&[usize]> {
        self.0.get(&exemplar).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.0.iter().map(|(&e, members)| (e, members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<usize, Vec<usize>> {
        self.0
    }
}
