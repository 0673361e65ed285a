mod buffer;
mod config;
mod cutting;
mod error;
mod graph;
mod math;
mod network;
mod pipeline;
mod propagate;
mod roads;
mod sample;
mod segment;
mod state;
mod study;

pub use crate::{
    buffer::{Buffer, BufferAnalyzer, BufferCell},
    config::Config,
    cutting::{NetworkBuilder, DEDUP_TOLERANCE},
    error::DifficultyError,
    graph::{Edge, Graph},
    network::{
        CuttingPoint, CuttingPointId, Network, Neighbors, PositionKey, Trail, TrailId, TrailIdx,
    },
    pipeline::{run, Analysis, Inputs, TrailFeature},
    propagate::{Metrics, Propagation, Propagator},
    roads::{RoadDistances, RoadNetwork},
    sample::RasterSample,
    segment::{merge, SegmentIndex, SegmentResult, SegmentSampler, Traversal},
    study::{analyze_study_points, StudyPoint},
};
pub use geo;
