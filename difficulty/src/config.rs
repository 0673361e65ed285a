use crate::{cutting::DEDUP_TOLERANCE, DifficultyError};
use serde::Deserialize;

/// Parameters of a difficulty analysis run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum distance for connecting an endpoint to another trail.
    pub trails_threshold: f64,

    /// Maximum distance for a cutting point to count as road connected.
    pub roads_threshold: f64,

    /// Length of a sampled trail segment.
    pub step_length: f64,

    /// Raster samples taken along each segment.
    pub samples_per_step: usize,

    /// Run the buffer analysis after propagation.
    pub process_buffer: bool,

    pub buffer_width: f64,

    pub cell_size: f64,

    /// Weight of local off-trail effort in buffer and study point
    /// difficulty.
    pub w_diff_on_tr: f64,

    /// Weight of the nearest segment's cumulative difficulty.
    pub w_diff_off_tr: f64,

    /// Keep only the latest segment per trail position.
    pub dedup_segments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trails_threshold: 20.0,
            roads_threshold: 40.0,
            step_length: 50.0,
            samples_per_step: 50,
            process_buffer: true,
            buffer_width: 50.0,
            cell_size: 10.0,
            w_diff_on_tr: 0.8,
            w_diff_off_tr: 0.2,
            dedup_segments: true,
        }
    }
}

impl Config {
    /// Checks every parameter before a run.
    ///
    /// `trails_threshold` must exceed [`DEDUP_TOLERANCE`], so thresholds
    /// at or below 0.2 are rejected here even though
    /// [`Network::builder`](crate::Network::builder) accepts them.
    pub fn validate(&self) -> Result<(), DifficultyError> {
        let positive = [
            ("trails_threshold", self.trails_threshold),
            ("roads_threshold", self.roads_threshold),
            ("step_length", self.step_length),
            ("buffer_width", self.buffer_width),
            ("cell_size", self.cell_size),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(DifficultyError::Config(name));
            }
        }
        if self.samples_per_step < 2 {
            return Err(DifficultyError::Config("samples_per_step"));
        }
        if DEDUP_TOLERANCE >= self.trails_threshold {
            return Err(DifficultyError::Config("trails_threshold"));
        }
        if !self.w_diff_on_tr.is_finite() {
            return Err(DifficultyError::Config("w_diff_on_tr"));
        }
        if !self.w_diff_off_tr.is_finite() {
            return Err(DifficultyError::Config("w_diff_off_tr"));
        }
        Ok(())
    }
}
