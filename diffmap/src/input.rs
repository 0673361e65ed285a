use anyhow::Result;
use difficulty::TrailFeature;
use geo::geometry::{Coord, Geometry, GeometryCollection, LineString, MultiLineString};
use geojson::{quick_collection, GeoJson};
use log::warn;
use serde::Deserialize;
use std::{
    fs::{self, File},
    path::Path,
};

fn open(path: &Path) -> Result<GeometryCollection<f64>> {
    let file = File::open(path)?;
    let json = GeoJson::from_reader(file)?;
    Ok(quick_collection(&json)?)
}

/// Reads line features, numbering them in file order.
pub fn trails(path: &Path) -> Result<Vec<TrailFeature>> {
    let features = open(path)?
        .into_iter()
        .enumerate()
        .filter_map(|(id, geometry)| {
            let geometry = lines(geometry, path)?;
            Some(TrailFeature {
                id: id as u64,
                geometry,
            })
        })
        .collect();
    Ok(features)
}

/// Reads line features as single-part lines.
pub fn roads(path: &Path) -> Result<Vec<LineString<f64>>> {
    Ok(open(path)?
        .into_iter()
        .filter_map(|geometry| lines(geometry, path))
        .flatten()
        .collect())
}

fn lines(geometry: Geometry<f64>, path: &Path) -> Option<MultiLineString<f64>> {
    match geometry {
        Geometry::LineString(line) => Some(MultiLineString::new(vec![line])),
        Geometry::MultiLineString(lines) => Some(lines),
        Geometry::GeometryCollection(collection) => Some(
            collection
                .into_iter()
                .filter_map(|g| lines(g, path))
                .flatten()
                .collect(),
        ),
        other => {
            warn!("{path:?}: skipping non-line geometry {other:?}");
            None
        }
    }
}

#[derive(Deserialize)]
struct PointRow {
    #[serde(rename = "X", alias = "x")]
    x: f64,
    #[serde(rename = "Y", alias = "y")]
    y: f64,
}

/// Reads study points from a CSV file with `X` and `Y` columns.
///
/// The delimiter is `;` if the header contains one, `,` otherwise.
pub fn points(path: &Path) -> Result<Vec<Coord<f64>>> {
    let text = fs::read_to_string(path)?;
    let delimiter = match text.lines().next() {
        Some(header) if header.contains(';') => b';',
        _ => b',',
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader
        .deserialize()
        .map(|row| {
            let PointRow { x, y } = row?;
            Ok(Coord { x, y })
        })
        .collect()
}
