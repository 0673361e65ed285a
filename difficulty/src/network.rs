//! Trails, cutting points and the arena that owns them.

use geo::geometry::{Coord, LineString};
use ordered_float::OrderedFloat;
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Identifies a single-part trail.
///
/// Multi-part input features are split into parts sharing `feature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrailId {
    pub feature: u64,
    pub part: u32,
}

impl TrailId {
    pub fn new(feature: u64, part: u32) -> Self {
        Self { feature, part }
    }
}

impl fmt::Display for TrailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.feature, self.part)
    }
}

#[derive(Debug, Clone)]
pub struct Trail {
    pub id: TrailId,
    pub geometry: LineString<f64>,
}

impl Trail {
    pub fn new(id: TrailId, geometry: LineString<f64>) -> Self {
        Self { id, geometry }
    }

    /// Returns the first and last coordinate of this trail.
    pub fn endpoints(&self) -> Option<(Coord<f64>, Coord<f64>)> {
        match self.geometry.0.as_slice() {
            [first, .., last] => Some((*first, *last)),
            _ => None,
        }
    }
}

impl PartialEq for Trail {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Trail {}

/// Index of a [CuttingPoint] in its [Network].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CuttingPointId(pub usize);

impl fmt::Display for CuttingPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cp{}", self.0)
    }
}

/// Index of a [Trail] in its [Network].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrailIdx(pub usize);

/// Exact-position key for hashing cutting points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey(OrderedFloat<f64>, OrderedFloat<f64>);

impl From<Coord<f64>> for PositionKey {
    fn from(coord: Coord<f64>) -> Self {
        Self(OrderedFloat(coord.x), OrderedFloat(coord.y))
    }
}

/// Neighboring cutting points and the trails connecting to each, in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Neighbors(Vec<(CuttingPointId, Vec<TrailIdx>)>);

impl Neighbors {
    /// Records that `trail` connects to `neighbor`.
    ///
    /// Returns false if the link was already present.
    pub fn link(&mut self, neighbor: CuttingPointId, trail: TrailIdx) -> bool {
        match self.0.iter_mut().find(|(id, _)| *id == neighbor) {
            Some((_, trails)) if trails.contains(&trail) => false,
            Some((_, trails)) => {
                trails.push(trail);
                true
            }
            None => {
                self.0.push((neighbor, vec![trail]));
                true
            }
        }
    }

    /// Trails connecting to `neighbor`.
    pub fn trails(&self, neighbor: CuttingPointId) -> &[TrailIdx] {
        self.0
            .iter()
            .find(|(id, _)| *id == neighbor)
            .map_or(&[], |(_, trails)| trails.as_slice())
    }

    pub fn contains(&self, neighbor: CuttingPointId) -> bool {
        self.0.iter().any(|(id, _)| *id == neighbor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CuttingPointId, &[TrailIdx])> + '_ {
        self.0.iter().map(|(id, trails)| (*id, trails.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A trail endpoint, intersection or projected connection point.
#[derive(Debug, Clone)]
pub struct CuttingPoint {
    pub position: Coord<f64>,

    pub neighbors: Neighbors,

    /// Road network distance back to the start point.
    pub road_distance: f64,

    /// Lowest cumulative difficulty found so far.
    pub best_difficulty: f64,

    pub total_trail_distance: f64,
    pub total_elevation_gain: f64,
    pub total_descent: f64,

    /// Within the roads threshold of the road network.
    pub is_road_connected: bool,
}

impl CuttingPoint {
    pub fn new(position: Coord<f64>, is_road_connected: bool) -> Self {
        Self {
            position,
            neighbors: Neighbors::default(),
            road_distance: f64::INFINITY,
            best_difficulty: f64::INFINITY,
            total_trail_distance: f64::INFINITY,
            total_elevation_gain: f64::INFINITY,
            total_descent: f64::INFINITY,
            is_road_connected,
        }
    }

    /// Makes this point a propagation source.
    pub fn seed(&mut self, road_distance: f64) {
        self.road_distance = road_distance;
        self.best_difficulty = 0.0;
        self.total_trail_distance = 0.0;
        self.total_elevation_gain = 0.0;
        self.total_descent = 0.0;
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::from(self.position)
    }
}

impl PartialEq for CuttingPoint {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

/// Arena of trails and cutting points.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub trails: Vec<Trail>,

    pub points: Vec<CuttingPoint>,

    /// Cutting points on each trail, ordered by distance along the
    /// trail once built.
    pub trail_points: Vec<Vec<CuttingPointId>>,
}

impl Network {
    pub fn trail(&self, idx: TrailIdx) -> &Trail {
        &self.trails[idx.0]
    }

    /// Cutting points on `idx`, in order along the trail.
    pub fn points_on(&self, idx: TrailIdx) -> &[CuttingPointId] {
        &self.trail_points[idx.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = CuttingPointId> {
        (0..self.points.len()).map(CuttingPointId)
    }

    /// Road connected points, in id order.
    pub fn seeds(&self) -> impl Iterator<Item = CuttingPointId> + '_ {
        self.ids().filter(|id| self[*id].is_road_connected)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Index<CuttingPointId> for Network {
    type Output = CuttingPoint;

    fn index(&self, id: CuttingPointId) -> &CuttingPoint {
        &self.points[id.0]
    }
}

impl IndexMut<CuttingPointId> for Network {
    fn index_mut(&mut self, id: CuttingPointId) -> &mut CuttingPoint {
        &mut self.points[id.0]
    }
}
