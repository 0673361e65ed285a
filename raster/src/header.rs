//! ESRI `.hdr` sidecar parsing.

use crate::{GeoTransform, RasterError, C};
use geo::geometry::Coord;
use std::{fs, path::Path};

/// Byte order of `.flt` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

pub(crate) struct Header {
    pub(crate) transform: GeoTransform,
    pub(crate) dimensions: (usize, usize),
    pub(crate) nodata: f32,
    pub(crate) endian: Endian,
}

impl Header {
    /// Parses the `.hdr` file accompanying the float grid at `path`.
    pub(crate) fn for_grid<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let hdr_path = path.as_ref().with_extension("hdr");
        let text = fs::read_to_string(&hdr_path)?;
        Self::parse(&text, &hdr_path)
    }

    fn parse(text: &str, hdr_path: &Path) -> Result<Self, RasterError> {
        let entries: Vec<(String, &str)> = text
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                Some((parts.next()?.to_lowercase(), parts.next()?))
            })
            .collect();
        let lookup = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, value)| *value)
        };
        let missing = |key: &'static str| RasterError::HdrMissing(key, hdr_path.to_owned());

        let cols: usize = parse_value("ncols", lookup("ncols").ok_or_else(|| missing("ncols"))?)?;
        let rows: usize = parse_value("nrows", lookup("nrows").ok_or_else(|| missing("nrows"))?)?;
        let cell_size: C = parse_value(
            "cellsize",
            lookup("cellsize").ok_or_else(|| missing("cellsize"))?,
        )?;

        // Corner registration is the default; center registration is
        // shifted back by half a cell.
        let (xll, yll) = match (lookup("xllcorner"), lookup("yllcorner")) {
            (Some(x), Some(y)) => (parse_value("xllcorner", x)?, parse_value("yllcorner", y)?),
            _ => {
                let x: C = parse_value(
                    "xllcenter",
                    lookup("xllcenter").ok_or_else(|| missing("xllcorner"))?,
                )?;
                let y: C = parse_value(
                    "yllcenter",
                    lookup("yllcenter").ok_or_else(|| missing("yllcorner"))?,
                )?;
                (x - cell_size / 2.0, y - cell_size / 2.0)
            }
        };

        let nodata = match lookup("nodata_value").or_else(|| lookup("nodata")) {
            Some(value) => parse_value("nodata_value", value)?,
            None => -9999.0,
        };

        let endian = match lookup("byteorder").map(str::to_uppercase).as_deref() {
            None | Some("LSBFIRST" | "I") => Endian::Little,
            Some("MSBFIRST" | "M") => Endian::Big,
            Some(other) => {
                return Err(RasterError::HdrValue("byteorder".into(), other.to_owned()));
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let origin = Coord {
            x: xll,
            y: yll + rows as C * cell_size,
        };
        let transform = GeoTransform::new(origin, cell_size)?;

        Ok(Self {
            transform,
            dimensions: (cols, rows),
            nodata,
            endian,
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RasterError> {
    value
        .parse()
        .map_err(|_| RasterError::HdrValue(key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{Endian, Header};
    use crate::RasterError;
    use std::path::Path;

    #[test]
    fn test_parse_corner_header() {
        let text = "NCOLS 3\nNROWS 2\nXLLCORNER 10\nYLLCORNER 20\nCELLSIZE 5\n\
                    NODATA_VALUE -1\nBYTEORDER MSBFIRST\n";
        let header = Header::parse(text, Path::new("a.hdr")).unwrap();
        assert_eq!(header.dimensions, (3, 2));
        assert_eq!(header.transform.origin.x, 10.0);
        assert_eq!(header.transform.origin.y, 30.0);
        assert_eq!(header.nodata, -1.0);
        assert_eq!(header.endian, Endian::Big);
    }

    #[test]
    fn test_parse_center_header_defaults() {
        let text = "ncols 1\nnrows 1\nxllcenter 5\nyllcenter 5\ncellsize 10\n";
        let header = Header::parse(text, Path::new("a.hdr")).unwrap();
        assert_eq!(header.transform.origin.x, 0.0);
        assert_eq!(header.transform.origin.y, 10.0);
        assert_eq!(header.nodata, -9999.0);
        assert_eq!(header.endian, Endian::Little);
    }

    #[test]
    fn test_parse_missing_key() {
        let text = "ncols 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n";
        assert!(matches!(
            Header::parse(text, Path::new("a.hdr")),
            Err(RasterError::HdrMissing("nrows", _))
        ));
    }

    #[test]
    fn test_parse_bad_value() {
        let text = "ncols x\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n";
        assert!(matches!(
            Header::parse(text, Path::new("a.hdr")),
            Err(RasterError::HdrValue(..))
        ));
    }
}
