use geo::geometry::{Coord, Rect};
use raster::Raster;

/// Point sampling of a single band raster.
pub trait RasterSample {
    /// Returns the value at `coord`, or [`RasterSample::nodata`]
    /// where there is no information.
    fn sample(&self, coord: Coord<f64>) -> f32;

    /// Sentinel returned for cells without data.
    fn nodata(&self) -> f32;

    /// Area covered by the raster.
    fn extent(&self) -> Rect<f64>;

    /// Returns the value at `coord` if it carries information.
    fn valid_sample(&self, coord: Coord<f64>) -> Option<f32> {
        let value = self.sample(coord);
        (!value.is_nan() && value != self.nodata()).then_some(value)
    }
}

impl RasterSample for Raster {
    fn sample(&self, coord: Coord<f64>) -> f32 {
        Raster::sample(self, coord)
    }

    fn nodata(&self) -> f32 {
        Raster::nodata(self)
    }

    fn extent(&self) -> Rect<f64> {
        Raster::extent(self)
    }
}
