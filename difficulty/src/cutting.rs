//! Cutting point construction.
//!
//! Trail endpoints are deduplicated into shared cutting points, each
//! endpoint is connected to every other trail passing within the
//! trails threshold, and finally the points collected on each trail
//! are ordered along it and chained together.

use crate::{
    math::{interpolate, project},
    network::{CuttingPoint, CuttingPointId, Network, PositionKey, Trail, TrailIdx},
    roads::RoadNetwork,
    DifficultyError,
};
use geo::{
    algorithm::EuclideanDistance,
    geometry::{Coord, Line, Point},
};
use log::debug;
use rstar::{
    primitives::{GeomWithData, Line as RLine},
    RTree, AABB,
};
use std::collections::HashMap;

/// Endpoints closer than this resolve to the same cutting point.
pub const DEDUP_TOLERANCE: f64 = 0.2;

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder {
            trails_threshold: None,
            roads_threshold: None,
        }
    }
}

pub struct NetworkBuilder {
    /// Maximum distance between an endpoint and another trail for
    /// the two to be connected.
    trails_threshold: Option<f64>,

    /// Maximum distance to the road network for a point to seed
    /// propagation.
    roads_threshold: Option<f64>,
}

impl NetworkBuilder {
    pub fn trails_threshold(mut self, distance: f64) -> Self {
        self.trails_threshold = Some(distance);
        self
    }

    pub fn roads_threshold(mut self, distance: f64) -> Self {
        self.roads_threshold = Some(distance);
        self
    }

    pub fn build(
        &self,
        trails: Vec<Trail>,
        roads: &RoadNetwork,
    ) -> Result<Network, DifficultyError> {
        let trails_threshold = self
            .trails_threshold
            .ok_or(DifficultyError::Builder("trails_threshold"))?;
        let roads_threshold = self
            .roads_threshold
            .ok_or(DifficultyError::Builder("roads_threshold"))?;

        let now = std::time::Instant::now();
        let endpoints = trails
            .iter()
            .map(|trail| trail.endpoints().ok_or(DifficultyError::EmptyTrail(trail.id)))
            .collect::<Result<Vec<_>, _>>()?;
        let trail_index = TrailIndex::new(&trails);

        let mut registry = Registry {
            network: Network {
                trail_points: vec![Vec::new(); trails.len()],
                trails,
                points: Vec::new(),
            },
            lookup: HashMap::new(),
            index: RTree::new(),
            roads,
            roads_threshold,
        };

        for (idx, (first, last)) in endpoints.into_iter().enumerate() {
            let trail = TrailIdx(idx);
            let ends = [first, last].map(|coord| (coord, registry.resolve(coord, trail)));
            for (coord, cp) in ends {
                registry.connect_nearby(cp, coord, trail, &trail_index, trails_threshold);
            }
        }

        let mut network = registry.network;
        chain_trails(&mut network);

        debug!(
            "cutting points; trails: {}, points: {}, exec: {:?}",
            network.trails.len(),
            network.points.len(),
            now.elapsed()
        );
        Ok(network)
    }
}

struct Registry<'a> {
    network: Network,
    lookup: HashMap<PositionKey, CuttingPointId>,
    index: RTree<GeomWithData<[f64; 2], usize>>,
    roads: &'a RoadNetwork,
    roads_threshold: f64,
}

impl Registry<'_> {
    /// Finds or creates the cutting point at `coord` and records it on
    /// `trail`.
    fn resolve(&mut self, coord: Coord<f64>, trail: TrailIdx) -> CuttingPointId {
        let id = self.find(coord).unwrap_or_else(|| self.create(coord));
        let on_trail = &mut self.network.trail_points[trail.0];
        if !on_trail.contains(&id) {
            on_trail.push(id);
        }
        id
    }

    fn find(&self, coord: Coord<f64>) -> Option<CuttingPointId> {
        if let Some(id) = self.lookup.get(&PositionKey::from(coord)) {
            return Some(*id);
        }
        let tolerance_2 = DEDUP_TOLERANCE * DEDUP_TOLERANCE;
        self.index
            .nearest_neighbor_iter_with_distance_2(&[coord.x, coord.y])
            .take_while(|(_, d2)| *d2 < tolerance_2)
            .map(|(entry, _)| entry.data)
            .min()
            .map(CuttingPointId)
    }

    fn create(&mut self, coord: Coord<f64>) -> CuttingPointId {
        let id = CuttingPointId(self.network.points.len());
        let is_road_connected = self.roads.distance_to(coord) < self.roads_threshold;
        self.network
            .points
            .push(CuttingPoint::new(coord, is_road_connected));
        self.lookup.insert(coord.into(), id);
        self.index.insert(GeomWithData::new([coord.x, coord.y], id.0));
        id
    }

    /// Links `cp` to a point on every other trail passing within
    /// `threshold` of the trail endpoint `position`.
    fn connect_nearby(
        &mut self,
        cp: CuttingPointId,
        position: Coord<f64>,
        trail: TrailIdx,
        trail_index: &TrailIndex,
        threshold: f64,
    ) {
        for other in trail_index.within(position, threshold) {
            if other == trail {
                continue;
            }
            let geometry = &self.network.trail(other).geometry;
            let point = interpolate(geometry, project(geometry, position));
            let target = self.resolve(point, other);
            self.network[cp].neighbors.link(target, other);
            self.network[target].neighbors.link(cp, other);
        }
    }
}

/// Orders each trail's points along it and links consecutive ones.
fn chain_trails(network: &mut Network) {
    for idx in 0..network.trails.len() {
        let geometry = &network.trails[idx].geometry;
        let mut keyed: Vec<(f64, CuttingPointId)> = network.trail_points[idx]
            .iter()
            .map(|id| (project(geometry, network.points[id.0].position), *id))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        let ordered: Vec<CuttingPointId> = keyed.into_iter().map(|(_, id)| id).collect();

        for pair in ordered.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            network[a].neighbors.link(b, TrailIdx(idx));
            network[b].neighbors.link(a, TrailIdx(idx));
        }
        network.trail_points[idx] = ordered;
    }
}

/// Spatial index over the segments of every trail.
struct TrailIndex {
    tree: RTree<GeomWithData<RLine<[f64; 2]>, (TrailIdx, Line<f64>)>>,
}

impl TrailIndex {
    fn new(trails: &[Trail]) -> Self {
        let entries = trails
            .iter()
            .enumerate()
            .flat_map(|(idx, trail)| {
                trail.geometry.lines().map(move |line| {
                    GeomWithData::new(
                        RLine::new([line.start.x, line.start.y], [line.end.x, line.end.y]),
                        (TrailIdx(idx), line),
                    )
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Trails passing strictly closer than `threshold` to `coord`, in
    /// ascending order.
    fn within(&self, coord: Coord<f64>, threshold: f64) -> Vec<TrailIdx> {
        let envelope = AABB::from_corners(
            [coord.x - threshold, coord.y - threshold],
            [coord.x + threshold, coord.y + threshold],
        );
        let mut found: Vec<TrailIdx> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.data.1.euclidean_distance(&Point::from(coord)) < threshold)
            .map(|entry| entry.data.0)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        math::project,
        network::{CuttingPointId, Network, Trail, TrailId, TrailIdx},
        roads::RoadNetwork,
        DifficultyError,
    };
    use approx::assert_relative_eq;
    use geo::{coord, line_string, LineString};

    fn trails(geometries: Vec<LineString<f64>>) -> Vec<Trail> {
        geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| Trail::new(TrailId::new(i as u64, 0), g))
            .collect()
    }

    fn build(geometries: Vec<LineString<f64>>, threshold: f64) -> Network {
        Network::builder()
            .trails_threshold(threshold)
            .roads_threshold(1.0)
            .build(trails(geometries), &RoadNetwork::new(&[]))
            .unwrap()
    }

    #[test]
    fn test_shared_endpoint() {
        let network = build(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
            ],
            1.0,
        );
        assert_eq!(network.len(), 3);
        assert_eq!(network.points_on(TrailIdx(0)).len(), 2);
        assert_eq!(network.points_on(TrailIdx(1)).len(), 2);
        let shared = network.points_on(TrailIdx(0))[1];
        assert_eq!(shared, network.points_on(TrailIdx(1))[0]);
        assert_eq!(network[shared].position, coord! { x: 10.0, y: 0.0 });
    }

    #[test]
    fn test_dedup_within_tolerance() {
        let network = build(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                line_string![(x: 10.15, y: 0.0), (x: 10.0, y: 30.0)],
                line_string![(x: 50.0, y: 0.0), (x: 10.3, y: 0.0)],
            ],
            0.1,
        );
        let a = network.points_on(TrailIdx(0))[1];
        assert!(network.points_on(TrailIdx(1)).contains(&a));
        // 0.3 apart is beyond the reuse tolerance.
        assert!(!network.points_on(TrailIdx(2)).contains(&a));
    }

    #[test]
    fn test_nearby_trails_linked() {
        // Endpoint (5, 1) lies 1 unit off the first trail.
        let network = build(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                line_string![(x: 5.0, y: 1.0), (x: 5.0, y: 20.0)],
            ],
            2.0,
        );
        assert_eq!(network.len(), 5);
        let end = network.points_on(TrailIdx(1))[0];
        assert_eq!(network[end].position, coord! { x: 5.0, y: 1.0 });
        let projected = network.points_on(TrailIdx(0))[1];
        assert_eq!(network[projected].position, coord! { x: 5.0, y: 0.0 });
        assert_eq!(network[end].neighbors.trails(projected), &[TrailIdx(0)]);
        assert_eq!(network[projected].neighbors.trails(end), &[TrailIdx(0)]);

        let far = build(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                line_string![(x: 5.0, y: 1.0), (x: 5.0, y: 20.0)],
            ],
            0.5,
        );
        assert_eq!(far.len(), 4);
    }

    #[test]
    fn test_points_sorted_along_trail() {
        let network = build(
            vec![
                line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
                line_string![(x: 70.0, y: 1.0), (x: 70.0, y: 50.0)],
                line_string![(x: 30.0, y: -1.0), (x: 30.0, y: -50.0)],
            ],
            5.0,
        );
        let main = &network.trails[0].geometry;
        let distances: Vec<f64> = network
            .points_on(TrailIdx(0))
            .iter()
            .map(|id| project(main, network[*id].position))
            .collect();
        assert_eq!(distances.len(), 4);
        for (distance, expected) in distances.iter().zip([0.0, 30.0, 70.0, 100.0]) {
            assert_relative_eq!(*distance, expected, epsilon = 1e-9);
        }
        let chain = network.points_on(TrailIdx(0));
        for pair in chain.windows(2) {
            assert!(network[pair[0]].neighbors.trails(pair[1]).contains(&TrailIdx(0)));
            assert!(network[pair[1]].neighbors.trails(pair[0]).contains(&TrailIdx(0)));
        }
    }

    #[test]
    fn test_road_connected_points() {
        let network = Network::builder()
            .trails_threshold(1.0)
            .roads_threshold(5.0)
            .build(
                trails(vec![line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]]),
                &RoadNetwork::new(&[line_string![(x: -3.0, y: -10.0), (x: -3.0, y: 10.0)]]),
            )
            .unwrap();
        assert!(network[CuttingPointId(0)].is_road_connected);
        assert!(!network[CuttingPointId(1)].is_road_connected);
        assert_eq!(network.seeds().collect::<Vec<_>>(), vec![CuttingPointId(0)]);
    }

    #[test]
    fn test_builder_errors() {
        let roads = RoadNetwork::new(&[]);
        assert!(matches!(
            Network::builder().roads_threshold(1.0).build(Vec::new(), &roads),
            Err(DifficultyError::Builder("trails_threshold"))
        ));
        assert!(matches!(
            Network::builder()
                .trails_threshold(1.0)
                .roads_threshold(1.0)
                .build(trails(vec![line_string![(x: 0.0, y: 0.0)]]), &roads),
            Err(DifficultyError::EmptyTrail(_))
        ));
    }
}
