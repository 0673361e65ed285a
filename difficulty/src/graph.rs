//! Explicit adjacency over cutting points.

use crate::network::{CuttingPointId, Network};
use geo::geometry::Line;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Straight connection, oriented away from the owning node.
    pub geometry: Line<f64>,

    /// Number of times propagation relaxed this edge.
    pub processed: u32,
}

/// Undirected graph, stored as symmetric directed adjacency.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adjacency: BTreeMap<CuttingPointId, BTreeMap<CuttingPointId, Edge>>,
}

impl Graph {
    pub fn from_network(network: &Network) -> Self {
        let mut graph = Self {
            adjacency: network.ids().map(|id| (id, BTreeMap::new())).collect(),
        };
        for chain in &network.trail_points {
            for pair in chain.windows(2) {
                graph.add_edge(network, pair[0], pair[1]);
            }
        }
        for id in network.ids() {
            for (neighbor, _) in network[id].neighbors.iter() {
                graph.add_edge(network, id, neighbor);
            }
        }
        graph
    }

    fn add_edge(&mut self, network: &Network, a: CuttingPointId, b: CuttingPointId) {
        let (pa, pb) = (network[a].position, network[b].position);
        self.adjacency.entry(a).or_default().entry(b).or_insert(Edge {
            geometry: Line::new(pa, pb),
            processed: 0,
        });
        self.adjacency.entry(b).or_default().entry(a).or_insert(Edge {
            geometry: Line::new(pb, pa),
            processed: 0,
        });
    }

    pub fn edge(&self, a: CuttingPointId, b: CuttingPointId) -> Option<&Edge> {
        self.adjacency.get(&a).and_then(|edges| edges.get(&b))
    }

    /// Counts a relaxation of the edge between `a` and `b`.
    pub fn edge_processed(&mut self, a: CuttingPointId, b: CuttingPointId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(edge) = self.adjacency.get_mut(&from).and_then(|e| e.get_mut(&to)) {
                edge.processed += 1;
            }
            if a == b {
                break;
            }
        }
    }

    pub fn neighbors(&self, id: CuttingPointId) -> impl Iterator<Item = CuttingPointId> + '_ {
        self.adjacency
            .get(&id)
            .into_iter()
            .flat_map(|edges| edges.keys().copied())
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency
            .iter()
            .map(|(a, edges)| edges.keys().filter(|b| a <= *b).count())
            .sum()
    }

    /// Groups of mutually reachable nodes, ordered by their lowest id.
    pub fn connected_components(&self) -> Vec<Vec<CuttingPointId>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for &root in self.adjacency.keys() {
            if !seen.insert(root) {
                continue;
            }
            let mut component = vec![root];
            let mut queue = VecDeque::from([root]);
            while let Some(id) = queue.pop_front() {
                for next in self.neighbors(id) {
                    if seen.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}
