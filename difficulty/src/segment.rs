//! Raster-sampled trail segments.

use crate::{
    math::{closest_point, interpolate, linspace, project},
    network::{CuttingPointId, Network, TrailId, TrailIdx},
    sample::RasterSample,
};
use geo::geometry::{Coord, Line};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rstar::{
    primitives::{GeomWithData, Line as RLine},
    RTree,
};
use std::collections::{btree_map::Entry, BTreeMap};

/// A difficulty-annotated piece of trail.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentResult {
    /// Chord from the segment's entry to its exit, in travel order.
    pub geometry: Line<f64>,

    /// Sum of absolute raster values sampled along this segment.
    pub segment_difficulty: f64,

    /// Cumulative difficulty from the seed, including this segment.
    pub total_difficulty: f64,

    /// Distance along the trail of the segment's lower bound.
    pub position_along_trail: f64,

    pub road_distance_at_entry: f64,

    pub trail_id: TrailId,

    pub trail: TrailIdx,

    pub start_point: CuttingPointId,

    pub end_point: CuttingPointId,

    pub segment_length: f64,

    pub total_trail_distance: f64,

    pub elevation_gain: f64,

    pub total_elevation_gain: f64,

    /// Sum of negative sample deltas, kept negative.
    pub descent: f64,

    pub total_descent: f64,
}

impl SegmentResult {
    fn key(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.position_along_trail)
    }

    /// True if this segment lies on `trail` between `a` and `b`, in
    /// either direction.
    pub fn joins(&self, trail: TrailIdx, a: CuttingPointId, b: CuttingPointId) -> bool {
        self.trail == trail
            && ((self.start_point == a && self.end_point == b)
                || (self.start_point == b && self.end_point == a))
    }
}

/// Cost of walking a trail between two cutting points.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub segments: Vec<SegmentResult>,
    pub final_difficulty: f64,
    pub total_trail_distance: f64,
    pub total_elevation_gain: f64,
    pub total_descent: f64,
}

pub struct SegmentSampler<'a, R: ?Sized> {
    raster: &'a R,
    step_length: f64,
    samples_per_step: usize,
}

impl<'a, R> SegmentSampler<'a, R>
where
    R: RasterSample + ?Sized,
{
    pub fn new(raster: &'a R, step_length: f64, samples_per_step: usize) -> Self {
        Self {
            raster,
            step_length,
            samples_per_step,
        }
    }

    /// Samples `trail` from `from` to `to`, accumulating onto the
    /// current totals of `from`.
    pub fn traverse(
        &self,
        network: &Network,
        trail: TrailIdx,
        from: CuttingPointId,
        to: CuttingPointId,
    ) -> Traversal {
        let geometry = &network.trail(trail).geometry;
        let source = &network[from];
        let da = project(geometry, source.position);
        let db = project(geometry, network[to].position);
        let forward = da <= db;

        let mut bounds = Vec::new();
        let (mut current, end) = (da.min(db), da.max(db));
        while current < end {
            let next = (current + self.step_length).min(end);
            if next <= current {
                break;
            }
            bounds.push((current, next));
            current = next;
        }
        if !forward {
            bounds.reverse();
        }

        let mut traversal = Traversal {
            segments: Vec::with_capacity(bounds.len()),
            final_difficulty: source.best_difficulty,
            total_trail_distance: source.total_trail_distance,
            total_elevation_gain: source.total_elevation_gain,
            total_descent: source.total_descent,
        };

        for (lo, hi) in bounds {
            let (entry, exit) = if forward { (lo, hi) } else { (hi, lo) };
            let values: Vec<f64> = linspace(entry, exit, self.samples_per_step)
                .filter_map(|d| self.raster.valid_sample(interpolate(geometry, d)))
                .map(f64::from)
                .collect();
            let Some(stats) = StepStats::from_samples(&values) else {
                continue;
            };

            let segment_length = hi - lo;
            traversal.final_difficulty += stats.difficulty;
            traversal.total_trail_distance += segment_length;
            traversal.total_elevation_gain += stats.gain;
            traversal.total_descent += stats.descent;

            traversal.segments.push(SegmentResult {
                geometry: Line::new(interpolate(geometry, entry), interpolate(geometry, exit)),
                segment_difficulty: stats.difficulty,
                total_difficulty: traversal.final_difficulty,
                position_along_trail: lo,
                road_distance_at_entry: source.road_distance,
                trail_id: network.trail(trail).id,
                trail,
                start_point: from,
                end_point: to,
                segment_length,
                total_trail_distance: traversal.total_trail_distance,
                elevation_gain: stats.gain,
                total_elevation_gain: traversal.total_elevation_gain,
                descent: stats.descent,
                total_descent: traversal.total_descent,
            });
        }
        traversal
    }
}

#[derive(Debug, PartialEq)]
struct StepStats {
    difficulty: f64,
    gain: f64,
    descent: f64,
}

impl StepStats {
    /// Returns `None` when there are no valid samples.
    fn from_samples(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (gain, descent) =
            values
                .iter()
                .tuple_windows()
                .fold((0.0, 0.0), |(gain, descent), (a, b)| {
                    let delta = b - a;
                    if delta > 0.0 {
                        (gain + delta, descent)
                    } else {
                        (gain, descent + delta)
                    }
                });
        Some(Self {
            difficulty: values.iter().map(|v| v.abs()).sum(),
            gain,
            descent,
        })
    }
}

/// Keeps, at every trail position covered by either direction, the
/// segment with the lower cumulative difficulty.
///
/// `forward` wins ties.
pub fn merge(forward: Vec<SegmentResult>, backward: Vec<SegmentResult>) -> Vec<SegmentResult> {
    let mut merged: BTreeMap<OrderedFloat<f64>, SegmentResult> =
        forward.into_iter().map(|s| (s.key(), s)).collect();
    for segment in backward {
        match merged.entry(segment.key()) {
            Entry::Vacant(slot) => {
                slot.insert(segment);
            }
            Entry::Occupied(mut slot) => {
                if segment.total_difficulty < slot.get().total_difficulty {
                    slot.insert(segment);
                }
            }
        }
    }
    merged.into_values().collect()
}

/// Nearest-segment lookup.
pub struct SegmentIndex {
    tree: RTree<GeomWithData<RLine<[f64; 2]>, usize>>,
}

impl SegmentIndex {
    pub fn new(segments: &[SegmentResult]) -> Self {
        let entries = segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let Line { start, end } = s.geometry;
                GeomWithData::new(RLine::new([start.x, start.y], [end.x, end.y]), i)
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index of and distance to the segment nearest `coord`.
    ///
    /// Equidistant segments resolve to the lowest index.
    pub fn nearest(&self, coord: Coord<f64>) -> Option<(usize, f64)> {
        let mut candidates = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[coord.x, coord.y]);
        let (first, best) = candidates.next()?;
        let idx = candidates
            .take_while(|(_, d2)| *d2 <= best)
            .map(|(entry, _)| entry.data)
            .fold(first.data, usize::min);
        Some((idx, best.sqrt()))
    }
}

/// Point on `segment` closest to `coord`.
pub fn project_onto(segment: &SegmentResult, coord: Coord<f64>) -> Coord<f64> {
    closest_point(&segment.geometry, coord)
}
