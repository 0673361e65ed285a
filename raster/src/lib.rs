//! Single band floating point rasters.
//!
//! Rasters are square-celled grids of `f32` samples anchored by an
//! upper-left origin. Row 0 is the northern-most row. Samples equal
//! to the raster's `nodata` sentinel (or NaN) carry no information.
//!
//! # References
//!
//! 1. [GDAL EHdr driver](https://gdal.org/drivers/raster/ehdr.html), which
//!    documents the `.hdr` keys of ESRI float grids.

mod error;
mod header;

pub use crate::{error::RasterError, header::Endian};
use byteorder::{BigEndian as BE, ByteOrder, LittleEndian as LE, ReadBytesExt};
use geo::geometry::{Coord, Rect};
use log::debug;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, mem::size_of, path::Path};

/// Base floating point type used for all coordinates.
pub type C = f64;

/// Maps grid indices to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Upper-left (north-west) corner of the grid.
    pub origin: Coord<C>,

    /// Width and height of a cell in world units.
    pub cell_size: C,
}

impl GeoTransform {
    pub fn new(origin: Coord<C>, cell_size: C) -> Result<Self, RasterError> {
        if cell_size > 0.0 && cell_size.is_finite() {
            Ok(Self { origin, cell_size })
        } else {
            Err(RasterError::CellSize(cell_size))
        }
    }

    /// Returns the `(col, row)` of the cell containing `coord`.
    ///
    /// The result may lie outside of any particular grid.
    pub fn coord_to_xy(&self, coord: Coord<C>) -> (isize, isize) {
        #[allow(clippy::cast_possible_truncation)]
        let col = ((coord.x - self.origin.x) / self.cell_size).floor() as isize;
        #[allow(clippy::cast_possible_truncation)]
        let row = ((self.origin.y - coord.y) / self.cell_size).floor() as isize;
        (col, row)
    }

    /// Returns the world coordinate of the center of cell `(col, row)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, (col, row): (usize, usize)) -> Coord<C> {
        Coord {
            x: self.origin.x + (col as C + 0.5) * self.cell_size,
            y: self.origin.y - (row as C + 0.5) * self.cell_size,
        }
    }
}

pub struct Raster {
    transform: GeoTransform,

    /// Number of (columns, rows) in this raster.
    dimensions: (usize, usize),

    /// Sentinel marking cells without data.
    nodata: f32,

    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    MemMap(Mmap, Endian),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw, endian) => {
                let start = index * size_of::<f32>();
                let bytes = &raw[start..start + size_of::<f32>()];
                match endian {
                    Endian::Little => LE::read_f32(bytes),
                    Endian::Big => BE::read_f32(bytes),
                }
            }
        }
    }
}

impl Raster {
    /// Returns an in-memory raster.
    ///
    /// `samples` are row-major, starting at the north-west corner.
    pub fn new(
        transform: GeoTransform,
        dimensions: (usize, usize),
        nodata: f32,
        samples: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let expected = dimensions.0 * dimensions.1;
        if samples.len() != expected {
            return Err(RasterError::SampleCount {
                expected,
                found: samples.len(),
            });
        }
        Ok(Self {
            transform,
            dimensions,
            nodata,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns a Raster read into memory from the float grid at `path`.
    ///
    /// The header is read from the `.hdr` file next to `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let header = header::Header::for_grid(&path)?;
        let (cols, rows) = header.dimensions;
        check_len(&path, cols * rows)?;
        debug!("loading {:?}", path.as_ref());

        let mut file = BufReader::new(File::open(&path)?);
        let mut samples = Vec::with_capacity(cols * rows);
        for _ in 0..(cols * rows) {
            let sample = match header.endian {
                Endian::Little => file.read_f32::<LE>()?,
                Endian::Big => file.read_f32::<BE>()?,
            };
            samples.push(sample);
        }

        Ok(Self {
            transform: header.transform,
            dimensions: header.dimensions,
            nodata: header.nodata,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns a Raster using the memory-mapped float grid as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let header = header::Header::for_grid(&path)?;
        let (cols, rows) = header.dimensions;
        check_len(&path, cols * rows)?;
        debug!("mapping {:?}", path.as_ref());

        let samples = {
            let file = File::open(&path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap(mmap, header.endian)
        };

        Ok(Self {
            transform: header.transform,
            dimensions: header.dimensions,
            nodata: header.nodata,
            samples,
        })
    }

    /// Returns the number of samples in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let (x, y) = self.dimensions;
        x * y
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Returns true if `value` carries no information.
    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || value == self.nodata
    }

    /// Returns the area covered by this raster.
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> Rect<C> {
        let GeoTransform { origin, cell_size } = self.transform;
        let (cols, rows) = self.dimensions;
        Rect::new(
            Coord {
                x: origin.x,
                y: origin.y - rows as C * cell_size,
            },
            Coord {
                x: origin.x + cols as C * cell_size,
                y: origin.y,
            },
        )
    }

    /// Returns the sample at the given coordinates, or `None` outside
    /// of the raster.
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        let (col, row) = self.transform.coord_to_xy(coord);
        let (cols, rows) = self.dimensions;
        #[allow(clippy::cast_possible_wrap)]
        if 0 <= col && col < cols as isize && 0 <= row && row < rows as isize {
            #[allow(clippy::cast_sign_loss)]
            let idx_1d = self.xy_to_linear_index((col as usize, row as usize));
            Some(self.samples.get_unchecked(idx_1d))
        } else {
            None
        }
    }

    /// Returns the sample at the given coordinates, or the `nodata`
    /// sentinel outside of the raster.
    pub fn sample(&self, coord: Coord<C>) -> f32 {
        self.get(coord).unwrap_or(self.nodata)
    }

    /// Returns the lowest valid sample, if any.
    pub fn min_value(&self) -> Option<f32> {
        self.valid_values().reduce(f32::min)
    }

    /// Returns the highest valid sample, if any.
    pub fn max_value(&self) -> Option<f32> {
        self.valid_values().reduce(f32::max)
    }

    /// Returns the portion of this raster covered by `bounds`.
    ///
    /// Cells are included when they overlap `bounds`. Returns `None`
    /// when `bounds` misses the raster entirely.
    pub fn crop(&self, bounds: &Rect<C>) -> Option<Crop> {
        let (cols, rows) = self.dimensions;
        if cols == 0 || rows == 0 {
            return None;
        }
        let (col_min, row_min) = self.transform.coord_to_xy(Coord {
            x: bounds.min().x,
            y: bounds.max().y,
        });
        let (col_max, row_max) = self.transform.coord_to_xy(Coord {
            x: bounds.max().x,
            y: bounds.min().y,
        });
        #[allow(clippy::cast_possible_wrap)]
        let (last_col, last_row) = (cols as isize - 1, rows as isize - 1);
        if col_max < 0 || row_max < 0 || col_min > last_col || row_min > last_row {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let (col_min, col_max) = (col_min.max(0) as usize, col_max.min(last_col) as usize);
        #[allow(clippy::cast_sign_loss)]
        let (row_min, row_max) = (row_min.max(0) as usize, row_max.min(last_row) as usize);

        let samples = (row_min..=row_max)
            .map(|row| {
                (col_min..=col_max)
                    .map(|col| {
                        let value = self.get_xy((col, row));
                        (!self.is_nodata(value)).then_some(value)
                    })
                    .collect()
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let transform = GeoTransform {
            origin: Coord {
                x: self.transform.origin.x + col_min as C * self.transform.cell_size,
                y: self.transform.origin.y - row_min as C * self.transform.cell_size,
            },
            cell_size: self.transform.cell_size,
        };
        Some(Crop { transform, samples })
    }

    /// Returns and iterator over `self`'s cells.
    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        (0..self.len()).map(|index| Sample {
            raster: self,
            index,
        })
    }
}

/// Private API
impl Raster {
    fn get_xy(&self, (x, y): (usize, usize)) -> f32 {
        self.samples.get_unchecked(self.xy_to_linear_index((x, y)))
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        self.dimensions.0 * y + x
    }

    fn linear_index_to_xy(&self, idx: usize) -> (usize, usize) {
        (idx % self.dimensions.0, idx / self.dimensions.0)
    }

    fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.iter()
            .map(|sample| sample.value())
            .filter(|value| !self.is_nodata(*value))
    }
}

/// A rectangular window cut out of a [Raster].
#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    /// Geotransform of the window's north-west cell.
    pub transform: GeoTransform,

    /// Row-major samples, `None` where the source had no data.
    pub samples: Vec<Vec<Option<f32>>>,
}

/// A single raster cell.
pub struct Sample<'a> {
    /// The parent [Raster] this cell belongs to.
    raster: &'a Raster,
    /// Index into parent's sample data corresponding to this cell.
    index: usize,
}

impl<'a> Sample<'a> {
    pub fn value(&self) -> f32 {
        self.raster.samples.get_unchecked(self.index)
    }

    /// Returns the world coordinate of this cell's center.
    pub fn center(&self) -> Coord<C> {
        self.raster
            .transform
            .cell_center(self.raster.linear_index_to_xy(self.index))
    }
}

fn check_len<P: AsRef<Path>>(path: P, n_samples: usize) -> Result<(), RasterError> {
    let expected = (n_samples * size_of::<f32>()) as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        len if len == expected => Ok(()),
        invalid_len => Err(RasterError::FltLen(invalid_len, path.as_ref().to_owned())),
    }
}
