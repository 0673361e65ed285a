use crate::network::TrailId;
use raster::RasterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DifficultyError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid configuration: {0}")]
    Config(&'static str),

    #[error("trail {0} has fewer than two coordinates")]
    EmptyTrail(TrailId),

    #[error("study area is outside the raster extent")]
    StudyAreaOutsideRaster,

    #[error("{0}")]
    Raster(#[from] RasterError),
}
