//! Off-trail difficulty around the propagated segments.

use crate::{
    sample::RasterSample,
    segment::{SegmentIndex, SegmentResult},
    DifficultyError,
};
use geo::{
    algorithm::BoundingRect,
    geometry::{Coord, Rect},
};
use log::debug;
use raster::GeoTransform;

/// A grid cell within the buffer width of some segment.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferCell {
    pub center: Coord<f64>,
    pub row: usize,
    pub col: usize,
    pub altitude: f64,
    pub distance_to_segment: f64,

    /// Index of the nearest segment.
    pub segment: usize,

    pub difficulty: f64,
}

/// Rasterized buffer and the cells retained from it.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub transform: GeoTransform,

    /// Number of (columns, rows) in `mask`.
    pub dimensions: (usize, usize),

    /// Row-major, true where the cell center lies within the buffer.
    pub mask: Vec<Vec<bool>>,

    /// Cells inside the buffer with positive difficulty.
    pub cells: Vec<BufferCell>,
}

pub struct BufferAnalyzer {
    pub width: f64,
    pub cell_size: f64,
    pub w_diff_on_tr: f64,
    pub w_diff_off_tr: f64,
}

impl BufferAnalyzer {
    pub fn analyze<R>(
        &self,
        segments: &[SegmentResult],
        raster: &R,
    ) -> Result<Buffer, DifficultyError>
    where
        R: RasterSample + ?Sized,
    {
        let now = std::time::Instant::now();
        let Some(bounds) = segments
            .iter()
            .map(|s| s.geometry.bounding_rect())
            .reduce(union)
        else {
            return Ok(Buffer {
                transform: GeoTransform::new(Coord { x: 0.0, y: 0.0 }, self.cell_size)?,
                dimensions: (0, 0),
                mask: Vec::new(),
                cells: Vec::new(),
            });
        };

        let origin = Coord {
            x: bounds.min().x - self.width,
            y: bounds.max().y + self.width,
        };
        let transform = GeoTransform::new(origin, self.cell_size)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let dimensions = (
            ((bounds.width() + 2.0 * self.width) / self.cell_size).ceil() as usize,
            ((bounds.height() + 2.0 * self.width) / self.cell_size).ceil() as usize,
        );

        let index = SegmentIndex::new(segments);
        let mut mask = vec![vec![false; dimensions.0]; dimensions.1];
        let mut cells = Vec::new();
        for (row, mask_row) in mask.iter_mut().enumerate() {
            for (col, inside) in mask_row.iter_mut().enumerate() {
                let center = transform.cell_center((col, row));
                let Some((segment, distance)) = index.nearest(center) else {
                    continue;
                };
                if distance > self.width {
                    continue;
                }
                *inside = true;

                let Some(altitude) = raster.valid_sample(center).map(f64::from) else {
                    continue;
                };
                let difficulty = altitude * distance * self.w_diff_on_tr
                    + segments[segment].total_difficulty * self.w_diff_off_tr;
                if difficulty > 0.0 {
                    cells.push(BufferCell {
                        center,
                        row,
                        col,
                        altitude,
                        distance_to_segment: distance,
                        segment,
                        difficulty,
                    });
                }
            }
        }

        debug!(
            "buffer; grid: {:?}, cells: {}, exec: {:?}",
            dimensions,
            cells.len(),
            now.elapsed()
        );
        Ok(Buffer {
            transform,
            dimensions,
            mask,
            cells,
        })
    }
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::BufferAnalyzer;
    use crate::{
        network::{CuttingPointId, TrailId, TrailIdx},
        sample::RasterSample,
        segment::SegmentResult,
    };
    use approx::assert_relative_eq;
    use geo::{coord, Coord, Line, Rect};

    struct Flat(f32);

    impl RasterSample for Flat {
        fn sample(&self, coord: Coord<f64>) -> f32 {
            if coord.y < -5.0 {
                -9999.0
            } else {
                self.0
            }
        }

        fn nodata(&self) -> f32 {
            -9999.0
        }

        fn extent(&self) -> Rect<f64> {
            Rect::new(coord! { x: -1e3, y: -1e3 }, coord! { x: 1e3, y: 1e3 })
        }
    }

    fn segment(total_difficulty: f64) -> SegmentResult {
        SegmentResult {
            geometry: Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 50.0, y: 0.0 }),
            segment_difficulty: total_difficulty,
            total_difficulty,
            position_along_trail: 0.0,
            road_distance_at_entry: 0.0,
            trail_id: TrailId::new(0, 0),
            trail: TrailIdx(0),
            start_point: CuttingPointId(0),
            end_point: CuttingPointId(1),
            segment_length: 50.0,
            total_trail_distance: 50.0,
            elevation_gain: 0.0,
            total_elevation_gain: 0.0,
            descent: 0.0,
            total_descent: 0.0,
        }
    }

    fn analyzer() -> BufferAnalyzer {
        BufferAnalyzer {
            width: 10.0,
            cell_size: 5.0,
            w_diff_on_tr: 0.8,
            w_diff_off_tr: 0.2,
        }
    }

    #[test]
    fn test_single_segment_buffer() {
        let buffer = analyzer().analyze(&[segment(10.0)], &Flat(2.0)).unwrap();
        assert_eq!(buffer.dimensions, (14, 4));
        assert!(!buffer.cells.is_empty());
        assert!(buffer.cells.iter().all(|c| c.distance_to_segment <= 10.0));
        // Rows centred 2.5 units off the segment cover its full length.
        let row_cells = buffer.cells.iter().filter(|c| c.row == 1).count();
        assert!(row_cells >= 10);
        let cell = buffer
            .cells
            .iter()
            .find(|c| c.center == coord! { x: 12.5, y: 2.5 })
            .unwrap();
        assert_relative_eq!(cell.difficulty, 2.0 * 2.5 * 0.8 + 10.0 * 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_mask_excludes_far_cells() {
        let buffer = analyzer().analyze(&[segment(10.0)], &Flat(2.0)).unwrap();
        // Corner cells lie more than 10 units from the segment's ends.
        assert!(!buffer.mask[0][0]);
        assert!(buffer.mask[1][2]);
        let masked = buffer.mask.iter().flatten().filter(|m| **m).count();
        // The southern-most row has no data and yields no cells.
        assert!(buffer.cells.len() < masked);
        assert!(buffer.cells.iter().all(|c| c.row != 3));
    }

    #[test]
    fn test_non_positive_cells_dropped() {
        let buffer = analyzer().analyze(&[segment(0.0)], &Flat(-1.0)).unwrap();
        assert!(buffer.cells.is_empty());
    }

    #[test]
    fn test_no_segments() {
        let buffer = analyzer().analyze(&[], &Flat(1.0)).unwrap();
        assert_eq!(buffer.dimensions, (0, 0));
        assert!(buffer.cells.is_empty());
    }
}
