//! stdplane-algorithms: Clustering algorithms for pixel planes.
//!
//! This crate provides two clustering algorithms:
//! - **Forward scan** - Single pass over `(x, y)`-sorted hits with early break
//! - **Graph** - Union-Find connected components, O(n²) reference
//!
#![warn(missing_docs)]

mod forward_scan;
mod graph;
mod processing;

pub use forward_scan::ForwardScanClustering;
pub use graph::GraphClustering;
pub use processing::{cluster_planes, cluster_planes_with, Algorithm};

// Re-export core clustering traits
pub use stdplane_core::clustering::{Cluster, ClusteringAlgorithm, ClusteringConfig};
