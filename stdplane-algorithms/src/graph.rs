//! Graph-based clustering algorithm.
//!
//! Uses a union-find data structure over all neighbouring hit pairs, so
//! every connected component becomes exactly one cluster regardless of the
//! hit order.

use std::collections::HashMap;

use stdplane_core::{Cluster, ClusteringAlgorithm, ClusteringConfig, Hit};

/// Connected-component clustering using union-find.
///
/// This algorithm compares every pair of hits, O(n²), and is the
/// reference the forward scan is measured against.
#[derive(Debug, Clone, Default)]
pub struct GraphClustering {
    config: ClusteringConfig,
}

impl GraphClustering {
    /// Creates a new graph-based clustering instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an instance with custom neighbour distances.
    #[must_use]
    pub fn with_config(config: ClusteringConfig) -> Self {
        Self { config }
    }
}

/// Union-Find data structure for connected component detection.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);

        if px == py {
            return;
        }

        match self.rank[px].cmp(&self.rank[py]) {
            std::cmp::Ordering::Less => self.parent[px] = py,
            std::cmp::Ordering::Greater => self.parent[py] = px,
            std::cmp::Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] += 1;
            }
        }
    }
}

impl ClusteringAlgorithm for GraphClustering {
    fn cluster(&self, hits: &[Hit]) -> Vec<Cluster> {
        let n = hits.len();
        let mut uf = UnionFind::new(n);

        // Build edges between neighboring hits
        for i in 0..n {
            for j in (i + 1)..n {
                if self.config.are_neighbours(&hits[i], &hits[j]) {
                    uf.union(i, j);
                }
            }
        }

        // Clusters in order of their first hit
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut clusters: Vec<Cluster> = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            let root = uf.find(i);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                clusters.push(Cluster::new());
                clusters.len() - 1
            });
            clusters[slot].push(hit.clone());
        }
        clusters
    }

    fn name(&self) -> &'static str {
        "Graph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_single_cluster() {
        let hits = vec![Hit::new(0, 0, 10.0), Hit::new(1, 0, 15.0), Hit::new(1, 1, 12.0)];

        let clusters = GraphClustering::new().cluster(&hits);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_graph_separate_clusters() {
        let hits = vec![
            Hit::new(0, 0, 10.0),
            Hit::new(100, 100, 20.0),
            Hit::new(1, 0, 15.0),
            Hit::new(101, 100, 25.0),
        ];

        let clusters = GraphClustering::new().cluster(&hits);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].hits[1].x(), 1);
        assert_eq!(clusters[1].hits[0].x(), 100);
    }

    #[test]
    fn test_graph_order_independent_chain() {
        // A diagonal chain that the forward scan would split.
        let hits = vec![
            Hit::new(0, 5, 1.0),
            Hit::new(0, 6, 1.0),
            Hit::new(1, 0, 1.0),
            Hit::new(1, 5, 1.0),
        ];
        assert_eq!(GraphClustering::new().cluster(&hits).len(), 2);
    }

    #[test]
    fn test_graph_empty_input() {
        let clusters = GraphClustering::new().cluster(&[]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 2);

        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
    }
}
