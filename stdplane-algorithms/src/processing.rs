use rayon::prelude::*;
use stdplane_core::{ClusteringAlgorithm, ClusteringConfig, Plane};

use crate::{ForwardScanClustering, GraphClustering};

/// Selectable clustering algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Single-pass forward scan with early break.
    #[default]
    ForwardScan,
    /// Full union-find connected components.
    Graph,
}

impl Algorithm {
    /// Builds the algorithm with the given neighbour distances.
    #[must_use]
    pub fn build(self, config: &ClusteringConfig) -> Box<dyn ClusteringAlgorithm> {
        match self {
            Algorithm::ForwardScan => Box::new(ForwardScanClustering::with_config(config.clone())),
            Algorithm::Graph => Box::new(GraphClustering::with_config(config.clone())),
        }
    }
}

/// Clusters every plane in place, in parallel across planes.
pub fn cluster_planes<A: ClusteringAlgorithm + ?Sized>(planes: &mut [Plane], algorithm: &A) {
    planes
        .par_iter_mut()
        .for_each(|plane| plane.compute_clusters(algorithm));
}

/// Clusters every plane with the selected algorithm.
pub fn cluster_planes_with(planes: &mut [Plane], algorithm: Algorithm, config: &ClusteringConfig) {
    let algo = algorithm.build(config);
    cluster_planes(planes, algo.as_ref());
}
