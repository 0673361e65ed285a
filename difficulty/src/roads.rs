//! Road network distances.

use crate::{math::closest_point, network::PositionKey, state::State};
use geo::{
    algorithm::{EuclideanDistance, EuclideanLength},
    geometry::{Coord, Line, LineString, Point},
};
use log::{debug, warn};
use rstar::{
    primitives::{GeomWithData, Line as RLine},
    RTree,
};
use std::collections::{BTreeMap, BinaryHeap, HashMap};

type NodeEntry = GeomWithData<[f64; 2], usize>;
type SegmentEntry = GeomWithData<RLine<[f64; 2]>, usize>;

/// Undirected graph over road vertices, weighted by segment length.
pub struct RoadNetwork {
    nodes: Vec<Coord<f64>>,

    /// Shortest known edge weight to each adjacent node.
    adjacency: Vec<BTreeMap<usize, f64>>,

    node_index: RTree<NodeEntry>,

    segment_index: RTree<SegmentEntry>,

    segments: Vec<Line<f64>>,
}

impl RoadNetwork {
    pub fn new(roads: &[LineString<f64>]) -> Self {
        let mut lookup: HashMap<PositionKey, usize> = HashMap::new();
        let mut nodes = Vec::new();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = Vec::new();
        let mut segments = Vec::new();

        for road in roads {
            for line in road.lines() {
                let [a, b] = [line.start, line.end].map(|coord| {
                    *lookup.entry(coord.into()).or_insert_with(|| {
                        nodes.push(coord);
                        adjacency.push(BTreeMap::new());
                        nodes.len() - 1
                    })
                });
                segments.push(line);
                if a == b {
                    continue;
                }
                let weight = line.euclidean_length();
                for (from, to) in [(a, b), (b, a)] {
                    adjacency[from]
                        .entry(to)
                        .and_modify(|w| *w = w.min(weight))
                        .or_insert(weight);
                }
            }
        }

        let node_index = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(i, c)| GeomWithData::new([c.x, c.y], i))
                .collect(),
        );
        let segment_index = RTree::bulk_load(
            segments
                .iter()
                .enumerate()
                .map(|(i, l)| {
                    GeomWithData::new(RLine::new([l.start.x, l.start.y], [l.end.x, l.end.y]), i)
                })
                .collect(),
        );

        debug!(
            "road network; nodes: {}, segments: {}",
            nodes.len(),
            segments.len()
        );

        Self {
            nodes,
            adjacency,
            node_index,
            segment_index,
            segments,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges between distinct vertices.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Minimum distance from `coord` to any road, or infinity when
    /// there are no roads.
    pub fn distance_to(&self, coord: Coord<f64>) -> f64 {
        self.nearest_segment(coord)
            .map_or(f64::INFINITY, |line| line.euclidean_distance(&Point::from(coord)))
    }

    /// Projects `coord` onto the closest road.
    pub fn project_onto_nearest_road(&self, coord: Coord<f64>) -> Coord<f64> {
        self.nearest_segment(coord)
            .map_or(coord, |line| closest_point(line, coord))
    }

    /// Shortest road distances from the vertex nearest `start` to every
    /// other vertex.
    pub fn shortest_distances_from(&self, start: Coord<f64>) -> RoadDistances<'_> {
        let mut distances = vec![f64::INFINITY; self.nodes.len()];
        if self.edge_count() == 0 {
            warn!("road network has no edges, road distances are unbounded");
            return RoadDistances {
                roads: self,
                distances,
            };
        }
        let Some(source) = self.nearest_node(start) else {
            return RoadDistances {
                roads: self,
                distances,
            };
        };

        let now = std::time::Instant::now();
        let mut heap = BinaryHeap::new();
        distances[source] = 0.0;
        heap.push(State::new(0.0, source));
        while let Some(State { cost, node }) = heap.pop() {
            if cost.0 > distances[node] {
                continue;
            }
            for (&next, &weight) in &self.adjacency[node] {
                let candidate = cost.0 + weight;
                if candidate < distances[next] {
                    distances[next] = candidate;
                    heap.push(State::new(candidate, next));
                }
            }
        }

        let reachable = distances.iter().filter(|d| d.is_finite()).count();
        if reachable < distances.len() {
            warn!(
                "{} of {} road vertices unreachable from start",
                distances.len() - reachable,
                distances.len()
            );
        }
        debug!("road dijkstra; reachable: {reachable}, exec: {:?}", now.elapsed());

        RoadDistances {
            roads: self,
            distances,
        }
    }

    fn nearest_node(&self, coord: Coord<f64>) -> Option<usize> {
        self.node_index
            .nearest_neighbor(&[coord.x, coord.y])
            .map(|entry| entry.data)
    }

    /// Closest segment, preferring the earliest on ties.
    fn nearest_segment(&self, coord: Coord<f64>) -> Option<&Line<f64>> {
        let mut candidates = self
            .segment_index
            .nearest_neighbor_iter_with_distance_2(&[coord.x, coord.y]);
        let (first, best) = candidates.next()?;
        let idx = candidates
            .take_while(|(_, d2)| *d2 <= best)
            .map(|(entry, _)| entry.data)
            .fold(first.data, usize::min);
        self.segments.get(idx)
    }
}

/// Result of a single-source search over a [RoadNetwork].
pub struct RoadDistances<'a> {
    roads: &'a RoadNetwork,
    distances: Vec<f64>,
}

impl RoadDistances<'_> {
    /// Road distance from the start to the vertex nearest `coord`.
    ///
    /// Unreachable vertices and empty networks yield infinity.
    pub fn road_distance(&self, coord: Coord<f64>) -> f64 {
        self.roads
            .nearest_node(coord)
            .and_then(|node| self.distances.get(node).copied())
            .unwrap_or(f64::INFINITY)
    }
}
