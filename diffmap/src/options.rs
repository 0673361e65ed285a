use anyhow::{anyhow, Error as AnyError};
use clap::{Args, Parser, Subcommand};
use difficulty::Config;
use geo::geometry::{Coord, Rect};
use std::{path::PathBuf, str::FromStr};

/// Estimate how difficult it is to reach any point of a trail network
/// from a starting location.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Trail lines (GeoJSON).
    #[arg(long)]
    pub trails: PathBuf,

    /// Road lines (GeoJSON).
    #[arg(long)]
    pub roads: PathBuf,

    /// Slope or elevation raster (ESRI .flt with .hdr sidecar).
    #[arg(long)]
    pub raster: PathBuf,

    /// Study area "xmin,ymin,xmax,ymax".
    #[arg(long)]
    pub study_area: BBox,

    /// Start point "x,y".
    #[arg(long)]
    pub start: XY,

    /// Move the start point onto the nearest road.
    #[arg(long)]
    pub snap_start: bool,

    /// JSON file with analysis parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub cmd: Command,
}

/// Parameters taking precedence over the config file.
#[derive(Args, Debug)]
pub struct Overrides {
    #[arg(long)]
    pub trails_threshold: Option<f64>,

    #[arg(long)]
    pub roads_threshold: Option<f64>,

    #[arg(long)]
    pub step_length: Option<f64>,

    #[arg(long)]
    pub samples_per_step: Option<usize>,

    #[arg(long)]
    pub buffer_width: Option<f64>,

    #[arg(long)]
    pub cell_size: Option<f64>,

    #[arg(long)]
    pub w_diff_on_tr: Option<f64>,

    #[arg(long)]
    pub w_diff_off_tr: Option<f64>,

    /// Skip the buffer analysis.
    #[arg(long)]
    pub no_buffer: bool,

    /// Keep every computed segment, including repeated positions.
    #[arg(long)]
    pub keep_duplicates: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        let values = [
            (self.trails_threshold, &mut config.trails_threshold),
            (self.roads_threshold, &mut config.roads_threshold),
            (self.step_length, &mut config.step_length),
            (self.buffer_width, &mut config.buffer_width),
            (self.cell_size, &mut config.cell_size),
            (self.w_diff_on_tr, &mut config.w_diff_on_tr),
            (self.w_diff_off_tr, &mut config.w_diff_off_tr),
        ];
        for (value, target) in values {
            if let Some(value) = value {
                *target = value;
            }
        }
        if let Some(samples) = self.samples_per_step {
            config.samples_per_step = samples;
        }
        if self.no_buffer {
            config.process_buffer = false;
        }
        if self.keep_duplicates {
            config.dedup_segments = false;
        }
    }
}

#[derive(Clone, Debug)]
pub struct XY(pub Coord<f64>);

impl FromStr for XY {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        match parse_floats(s)?.as_slice() {
            [x, y] => Ok(Self(Coord { x: *x, y: *y })),
            _ => Err(anyhow!("not a valid x,y pair")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BBox(pub Rect<f64>);

impl FromStr for BBox {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        match parse_floats(s)?.as_slice() {
            [xmin, ymin, xmax, ymax] => Ok(Self(Rect::new(
                Coord { x: *xmin, y: *ymin },
                Coord { x: *xmax, y: *ymax },
            ))),
            _ => Err(anyhow!("not a valid xmin,ymin,xmax,ymax box")),
        }
    }
}

fn parse_floats(s: &str) -> Result<Vec<f64>, AnyError> {
    s.split(',')
        .map(|part| f64::from_str(part.trim()).map_err(AnyError::from))
        .collect()
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print difficulty-annotated trail segments as JSON.
    Segments,

    /// Print buffer cells as JSON.
    Cells,

    /// Print run metrics as JSON.
    Summary,

    /// Evaluate off-trail points read from a CSV file.
    StudyPoints {
        /// CSV with `X` and `Y` columns, `;` or `,` separated.
        #[arg(long)]
        points: PathBuf,
    },

    /// Print the raster cropped to the study area as JSON.
    Landform,
}

#[cfg(test)]
mod tests {
    use super::{BBox, Overrides, XY};
    use difficulty::Config;

    #[test]
    fn test_parse_xy() {
        let xy: XY = "12.5, -3".parse().unwrap();
        assert_eq!((xy.0.x, xy.0.y), (12.5, -3.0));
        assert!("1".parse::<XY>().is_err());
        assert!("a,b".parse::<XY>().is_err());
    }

    #[test]
    fn test_parse_bbox() {
        let bbox: BBox = "10,0,0,20".parse().unwrap();
        assert_eq!((bbox.0.min().x, bbox.0.max().y), (0.0, 20.0));
        assert!("1,2,3".parse::<BBox>().is_err());
    }

    #[test]
    fn test_overrides() {
        let overrides = Overrides {
            trails_threshold: Some(3.0),
            roads_threshold: None,
            step_length: None,
            samples_per_step: Some(10),
            buffer_width: None,
            cell_size: None,
            w_diff_on_tr: None,
            w_diff_off_tr: Some(0.5),
            no_buffer: true,
            keep_duplicates: false,
        };
        let mut config = Config::default();
        overrides.apply(&mut config);
        assert_eq!(config.trails_threshold, 3.0);
        assert_eq!(config.samples_per_step, 10);
        assert_eq!(config.w_diff_off_tr, 0.5);
        assert_eq!(config.roads_threshold, 40.0);
        assert!(!config.process_buffer);
        assert!(config.dedup_segments);
    }
}
