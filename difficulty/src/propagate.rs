//! Multi-source difficulty propagation.
//!
//! A lazy-deletion Dijkstra over cutting points where edge costs are
//! sampled from the raster on demand. Because elevation gain and
//! descent depend on travel direction, a neighbor that already holds a
//! cheaper cost triggers a backward traversal; if the two directions
//! disagree, the segments between the pair are replaced by the cheaper
//! alternative at each trail position.

use crate::{
    graph::Graph,
    network::{CuttingPointId, Network, TrailIdx},
    roads::RoadDistances,
    sample::RasterSample,
    segment::{merge, SegmentResult, SegmentSampler, Traversal},
    state::State,
};
use log::{debug, info};
use ordered_float::OrderedFloat;
use std::{
    collections::{BinaryHeap, HashSet},
    time::{Duration, Instant},
};

/// Summary of a propagation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub elapsed: Duration,
    pub points_visited: usize,
    pub segments_created: usize,
    pub max_segment_difficulty: Option<f64>,
    pub mean_segment_difficulty: Option<f64>,
}

impl Metrics {
    fn new(elapsed: Duration, points_visited: usize, segments: &[SegmentResult]) -> Self {
        let max_segment_difficulty = segments
            .iter()
            .map(|s| s.segment_difficulty)
            .reduce(f64::max);
        #[allow(clippy::cast_precision_loss)]
        let mean_segment_difficulty = (!segments.is_empty()).then(|| {
            segments.iter().map(|s| s.segment_difficulty).sum::<f64>() / segments.len() as f64
        });
        Self {
            elapsed,
            points_visited,
            segments_created: segments.len(),
            max_segment_difficulty,
            mean_segment_difficulty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Propagation {
    pub segments: Vec<SegmentResult>,
    pub metrics: Metrics,
}

pub struct Propagator<'a, R: ?Sized> {
    sampler: SegmentSampler<'a, R>,

    /// Keep only the most recent segment per trail position.
    dedup: bool,
}

impl<'a, R> Propagator<'a, R>
where
    R: RasterSample + ?Sized,
{
    pub fn new(sampler: SegmentSampler<'a, R>, dedup: bool) -> Self {
        Self { sampler, dedup }
    }

    /// Propagates difficulty from every road connected point.
    pub fn run(
        &self,
        network: &mut Network,
        graph: &mut Graph,
        roads: &RoadDistances<'_>,
    ) -> Propagation {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        let seeds: Vec<CuttingPointId> = network.seeds().collect();
        for &seed in &seeds {
            let road_distance = roads.road_distance(network[seed].position);
            network[seed].seed(road_distance);
            heap.push(State::new(0.0, seed));
        }
        debug!("propagation; seeds: {}", seeds.len());

        let mut visited = vec![false; network.len()];
        let mut points_visited = 0;
        let mut segments = Vec::new();
        while let Some(State { node: cp, .. }) = heap.pop() {
            if visited[cp.0] {
                continue;
            }
            visited[cp.0] = true;
            points_visited += 1;

            let neighbors: Vec<(CuttingPointId, Vec<TrailIdx>)> = network[cp]
                .neighbors
                .iter()
                .map(|(n, trails)| (n, trails.to_vec()))
                .collect();
            for (n, trails) in neighbors {
                if n == cp {
                    continue;
                }
                for trail in trails {
                    graph.edge_processed(cp, n);
                    self.relax(network, &mut segments, cp, n, trail);
                    heap.push(State::new(network[n].best_difficulty, n));
                }
            }
        }

        if self.dedup {
            let before = segments.len();
            segments = dedup_latest(segments);
            debug!("dedup; removed: {}", before - segments.len());
        }

        let metrics = Metrics::new(now.elapsed(), points_visited, &segments);
        info!(
            "propagation; visited: {}, segments: {}, max: {:?}, mean: {:?}, exec: {:?}",
            metrics.points_visited,
            metrics.segments_created,
            metrics.max_segment_difficulty,
            metrics.mean_segment_difficulty,
            metrics.elapsed
        );
        Propagation { segments, metrics }
    }

    fn relax(
        &self,
        network: &mut Network,
        segments: &mut Vec<SegmentResult>,
        cp: CuttingPointId,
        n: CuttingPointId,
        trail: TrailIdx,
    ) {
        let forward = self.sampler.traverse(network, trail, cp, n);
        if network[n].best_difficulty >= forward.final_difficulty {
            let road_distance = network[cp].road_distance;
            adopt(network, n, &forward, road_distance);
            segments.extend(forward.segments);
            return;
        }

        let backward = self.sampler.traverse(network, trail, n, cp);
        if backward.final_difficulty > network[cp].best_difficulty {
            segments.retain(|s| !s.joins(trail, cp, n));
            segments.extend(merge(forward.segments, backward.segments));
        }
    }
}

fn adopt(network: &mut Network, id: CuttingPointId, traversal: &Traversal, road_distance: f64) {
    let point = &mut network[id];
    point.best_difficulty = traversal.final_difficulty;
    point.total_trail_distance = traversal.total_trail_distance;
    point.total_elevation_gain = traversal.total_elevation_gain;
    point.total_descent = traversal.total_descent;
    point.road_distance = road_distance;
}

/// Keeps the last segment computed for each trail position.
fn dedup_latest(segments: Vec<SegmentResult>) -> Vec<SegmentResult> {
    let mut seen = HashSet::new();
    let mut kept: Vec<SegmentResult> = segments
        .into_iter()
        .rev()
        .filter(|s| seen.insert((s.trail, OrderedFloat(s.position_along_trail))))
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::{dedup_latest, Propagator};
    use crate::{
        graph::Graph,
        network::{CuttingPointId, Network, Trail, TrailId, TrailIdx},
        roads::RoadNetwork,
        sample::RasterSample,
        segment::SegmentSampler,
    };
    use approx::assert_relative_eq;
    use geo::{coord, line_string, Coord, LineString, Rect};

    struct Constant(f32);

    impl RasterSample for Constant {
        fn sample(&self, _: Coord<f64>) -> f32 {
            self.0
        }

        fn nodata(&self) -> f32 {
            -9999.0
        }

        fn extent(&self) -> Rect<f64> {
            Rect::new(coord! { x: -1e6, y: -1e6 }, coord! { x: 1e6, y: 1e6 })
        }
    }

    fn run(
        trails: Vec<LineString<f64>>,
        road: LineString<f64>,
    ) -> (Network, Graph, super::Propagation) {
        let roads = RoadNetwork::new(&[road]);
        let trails = trails
            .into_iter()
            .enumerate()
            .map(|(i, g)| Trail::new(TrailId::new(i as u64, 0), g))
            .collect();
        let mut network = Network::builder()
            .trails_threshold(1.0)
            .roads_threshold(1.0)
            .build(trails, &roads)
            .unwrap();
        let mut graph = Graph::from_network(&network);
        let distances = roads.shortest_distances_from(coord! { x: 0.0, y: -10.0 });
        let raster = Constant(1.0);
        let propagation = Propagator::new(SegmentSampler::new(&raster, 50.0, 50), true).run(
            &mut network,
            &mut graph,
            &distances,
        );
        (network, graph, propagation)
    }

    #[test]
    fn test_chain_accumulates() {
        let (network, graph, propagation) = run(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
                line_string![(x: 100.0, y: 0.0), (x: 150.0, y: 0.0)],
            ],
            line_string![(x: 0.0, y: -10.0), (x: 0.0, y: 0.5)],
        );
        // Two 50 unit steps on the first trail, one on the second.
        assert_eq!(propagation.segments.len(), 3);
        assert_eq!(propagation.metrics.points_visited, 3);
        let end = CuttingPointId(2);
        assert_eq!(network[end].position, coord! { x: 150.0, y: 0.0 });
        assert_relative_eq!(network[end].best_difficulty, 150.0, epsilon = 1e-9);
        assert_relative_eq!(network[end].total_trail_distance, 150.0, epsilon = 1e-9);
        assert_relative_eq!(network[end].road_distance, 10.5, epsilon = 1e-9);
        assert_relative_eq!(propagation.metrics.max_segment_difficulty.unwrap(), 50.0);
        assert!(graph.edge(CuttingPointId(0), CuttingPointId(1)).unwrap().processed > 0);
    }

    #[test]
    fn test_unreachable_points_stay_unbounded() {
        let (network, _, propagation) = run(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                line_string![(x: 500.0, y: 0.0), (x: 510.0, y: 0.0)],
            ],
            line_string![(x: 0.0, y: -10.0), (x: 0.0, y: 0.5)],
        );
        assert_eq!(propagation.metrics.points_visited, 2);
        assert!(network[CuttingPointId(2)].best_difficulty.is_infinite());
        assert!(propagation
            .segments
            .iter()
            .all(|s| s.trail == TrailIdx(0)));
    }

    #[test]
    fn test_no_seeds() {
        let (_, _, propagation) = run(
            vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]],
            line_string![(x: 900.0, y: 900.0), (x: 901.0, y: 900.0)],
        );
        assert!(propagation.segments.is_empty());
        assert_eq!(propagation.metrics.points_visited, 0);
        assert_eq!(propagation.metrics.max_segment_difficulty, None);
        assert_eq!(propagation.metrics.mean_segment_difficulty, None);
    }

    #[test]
    fn test_dedup_keeps_latest() {
        let (_, _, propagation) = run(
            vec![line_string![(x: 0.0, y: 0.0), (x: 60.0, y: 0.0)]],
            line_string![(x: 0.0, y: -10.0), (x: 0.0, y: 0.5)],
        );
        let mut first = propagation.segments[0].clone();
        first.total_difficulty = -1.0;
        let mut segments = propagation.segments.clone();
        segments.insert(0, first);
        let deduped = dedup_latest(segments);
        assert_eq!(deduped, propagation.segments);
    }
}
