//! Clustering traits and types.

use crate::Hit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A set of spatially adjacent hits.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Hits belonging to this cluster.
    pub hits: Vec<Hit>,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self { hits: Vec::new() }
    }

    /// Creates a cluster with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Adds a hit to the cluster.
    pub fn push(&mut self, hit: Hit) {
        self.hits.push(hit);
    }

    /// Returns the number of hits in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    /// Mean position of the member hits, `None` for an empty cluster.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        if self.hits.is_empty() {
            return None;
        }
        let n = self.hits.len() as f64;
        let (sx, sy) = self.hits.iter().fold((0.0, 0.0), |(sx, sy), h| {
            (sx + f64::from(h.x()), sy + f64::from(h.y()))
        });
        Some((sx / n, sy / n))
    }

    /// Sum of the member amplitudes.
    #[must_use]
    pub fn total_amplitude(&self) -> f64 {
        self.hits.iter().map(|h| h.amplitude).sum()
    }
}

impl FromIterator<Hit> for Cluster {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// Configuration for clustering algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringConfig {
    /// Largest column distance at which two hits are neighbours.
    pub max_x_distance: u32,
    /// Largest row distance at which two hits are neighbours.
    pub max_y_distance: u32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_x_distance: 1, // 8-connectivity
            max_y_distance: 1,
        }
    }
}

impl ClusteringConfig {
    /// Creates a new clustering configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column neighbour distance.
    #[must_use]
    pub fn with_max_x_distance(mut self, distance: u32) -> Self {
        self.max_x_distance = distance;
        self
    }

    /// Sets the row neighbour distance.
    #[must_use]
    pub fn with_max_y_distance(mut self, distance: u32) -> Self {
        self.max_y_distance = distance;
        self
    }

    /// Checks whether two hits are neighbours under this configuration.
    #[inline]
    #[must_use]
    pub fn are_neighbours(&self, a: &Hit, b: &Hit) -> bool {
        a.x().abs_diff(b.x()) <= self.max_x_distance
            && a.y().abs_diff(b.y()) <= self.max_y_distance
    }
}

/// Trait for clustering algorithms.
///
/// Implementations group the hits of one plane into clusters. Every input
/// hit ends up in exactly one returned cluster.
pub trait ClusteringAlgorithm: Send + Sync {
    /// Clusters the given hits into groups.
    fn cluster(&self, hits: &[Hit]) -> Vec<Cluster>;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}
