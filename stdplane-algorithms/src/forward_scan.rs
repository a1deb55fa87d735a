//! Single-pass forward-scan clustering.
//!
//! Hits are sorted by `(x, y)` and every hit is compared with the hits
//! that follow it until the first non-neighbour. Labels are propagated
//! greedily; when two labelled hits meet, both take the smaller label but
//! other members of the larger label are not relabelled.
//!
//! Stopping at the first non-neighbour misses neighbours that sort after
//! an unrelated hit, e.g. `(0,5)` and `(1,5)` separated by `(1,0)`. On
//! dense planes this splits connected hits into several clusters; it never
//! merges hits that are not connected.

use stdplane_core::{Cluster, ClusteringAlgorithm, ClusteringConfig, Hit};

/// Greedy forward-scan clustering with early break.
#[derive(Debug, Clone, Default)]
pub struct ForwardScanClustering {
    config: ClusteringConfig,
}

impl ForwardScanClustering {
    /// Creates a forward-scan instance with 8-connectivity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a forward-scan instance with custom neighbour distances.
    #[must_use]
    pub fn with_config(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Labels hits that are already sorted by `(x, y)`.
    ///
    /// Labels start at 1. Unpaired hits get fresh labels after the scan,
    /// in sorted order.
    #[must_use]
    pub fn assign_labels(&self, sorted: &[Hit]) -> Vec<u32> {
        let n = sorted.len();
        let mut labels: Vec<Option<u32>> = vec![None; n];
        let mut n_labels = 0;

        for a in 0..n {
            for b in (a + 1)..n {
                if !self.config.are_neighbours(&sorted[a], &sorted[b]) {
                    break;
                }
                match (labels[a], labels[b]) {
                    (None, None) => {
                        n_labels += 1;
                        labels[a] = Some(n_labels);
                        labels[b] = Some(n_labels);
                    }
                    (None, Some(label)) => labels[a] = Some(label),
                    (Some(label), None) => labels[b] = Some(label),
                    (Some(la), Some(lb)) => {
                        let label = la.min(lb);
                        labels[a] = Some(label);
                        labels[b] = Some(label);
                    }
                }
            }
        }

        labels
            .into_iter()
            .map(|label| {
                label.unwrap_or_else(|| {
                    n_labels += 1;
                    n_labels
                })
            })
            .collect()
    }
}

impl ClusteringAlgorithm for ForwardScanClustering {
    fn cluster(&self, hits: &[Hit]) -> Vec<Cluster> {
        let mut sorted = hits.to_vec();
        sorted.sort_by_key(|h| (h.x(), h.y()));
        let labels = self.assign_labels(&sorted);

        let mut grouped: std::collections::BTreeMap<u32, Cluster> =
            std::collections::BTreeMap::new();
        for (hit, label) in sorted.into_iter().zip(labels) {
            grouped.entry(label).or_default().push(hit);
        }
        grouped.into_values().collect()
    }

    fn name(&self) -> &'static str {
        "ForwardScan"
    }
}
