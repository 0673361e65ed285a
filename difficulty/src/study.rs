//! Difficulty at arbitrary off-trail locations.

use crate::{
    sample::RasterSample,
    segment::{project_onto, SegmentIndex, SegmentResult},
};
use geo::geometry::Coord;

#[derive(Debug, Clone, PartialEq)]
pub struct StudyPoint {
    pub point: Coord<f64>,

    /// Index of the nearest segment.
    pub segment: usize,

    pub total_trail_distance: f64,
    pub total_elevation_gain: f64,
    pub total_descent: f64,
    pub distance_off_trail: f64,

    /// Altitude of the point minus that of its projection onto the
    /// nearest segment; positive above the trail.
    pub altitude_difference: f64,

    pub road_distance: f64,
    pub difficulty: f64,
}

/// Evaluates each of `points` against its nearest segment.
///
/// Returns nothing when there are no segments.
pub fn analyze_study_points<R>(
    points: &[Coord<f64>],
    segments: &[SegmentResult],
    raster: &R,
    w_diff_on_tr: f64,
    w_diff_off_tr: f64,
) -> Vec<StudyPoint>
where
    R: RasterSample + ?Sized,
{
    let index = SegmentIndex::new(segments);
    points
        .iter()
        .filter_map(|&point| {
            let (idx, distance) = index.nearest(point)?;
            let segment = &segments[idx];
            let projected = project_onto(segment, point);
            let altitude_difference = raster
                .valid_sample(point)
                .zip(raster.valid_sample(projected))
                .map_or(0.0, |(here, trail)| f64::from(here) - f64::from(trail));
            Some(StudyPoint {
                point,
                segment: idx,
                total_trail_distance: segment.total_trail_distance,
                total_elevation_gain: segment.total_elevation_gain,
                total_descent: segment.total_descent,
                distance_off_trail: distance,
                altitude_difference,
                road_distance: segment.road_distance_at_entry,
                difficulty: distance * altitude_difference * w_diff_on_tr
                    + segment.total_difficulty * w_diff_off_tr,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::analyze_study_points;
    use crate::{
        network::{CuttingPointId, TrailId, TrailIdx},
        sample::RasterSample,
        segment::SegmentResult,
    };
    use approx::assert_relative_eq;
    use geo::{coord, Coord, Line, Rect};

    /// Altitude equals `y`, no data west of `x = -50`.
    struct Slope;

    impl RasterSample for Slope {
        fn sample(&self, coord: Coord<f64>) -> f32 {
            if coord.x < -50.0 {
                -9999.0
            } else {
                coord.y as f32
            }
        }

        fn nodata(&self) -> f32 {
            -9999.0
        }

        fn extent(&self) -> Rect<f64> {
            Rect::new(coord! { x: -100.0, y: -100.0 }, coord! { x: 100.0, y: 100.0 })
        }
    }

    fn segment() -> SegmentResult {
        SegmentResult {
            geometry: Line::new(coord! { x: -100.0, y: 0.0 }, coord! { x: 50.0, y: 0.0 }),
            segment_difficulty: 40.0,
            total_difficulty: 100.0,
            position_along_trail: 0.0,
            road_distance_at_entry: 250.0,
            trail_id: TrailId::new(3, 0),
            trail: TrailIdx(0),
            start_point: CuttingPointId(0),
            end_point: CuttingPointId(1),
            segment_length: 150.0,
            total_trail_distance: 300.0,
            elevation_gain: 0.0,
            total_elevation_gain: 12.0,
            descent: 0.0,
            total_descent: -4.0,
        }
    }

    #[test]
    fn test_study_point_above_trail() {
        let results =
            analyze_study_points(&[coord! { x: 10.0, y: 5.0 }], &[segment()], &Slope, 0.8, 0.2);
        assert_eq!(results.len(), 1);
        let point = &results[0];
        assert_relative_eq!(point.distance_off_trail, 5.0, epsilon = 1e-9);
        assert_relative_eq!(point.altitude_difference, 5.0, epsilon = 1e-6);
        assert_relative_eq!(point.difficulty, 5.0 * 5.0 * 0.8 + 100.0 * 0.2, epsilon = 1e-6);
        assert_relative_eq!(point.road_distance, 250.0);
        assert_relative_eq!(point.total_trail_distance, 300.0);
        assert_relative_eq!(point.total_descent, -4.0);
    }

    #[test]
    fn test_study_point_without_data() {
        let results =
            analyze_study_points(&[coord! { x: -80.0, y: -3.0 }], &[segment()], &Slope, 0.8, 0.2);
        assert_relative_eq!(results[0].altitude_difference, 0.0);
        assert_relative_eq!(results[0].difficulty, 20.0);
    }

    #[test]
    fn test_no_segments() {
        let results = analyze_study_points(&[coord! { x: 0.0, y: 0.0 }], &[], &Slope, 0.8, 0.2);
        assert!(results.is_empty());
    }
}
