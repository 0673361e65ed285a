//! End to end difficulty analysis.

use crate::{
    buffer::{Buffer, BufferAnalyzer},
    graph::Graph,
    network::{Network, Trail, TrailId},
    propagate::{Metrics, Propagator},
    roads::RoadNetwork,
    sample::RasterSample,
    segment::{SegmentResult, SegmentSampler},
    Config, DifficultyError,
};
use geo::{
    algorithm::{BooleanOps, Intersects},
    geometry::{Coord, LineString, MultiLineString, Polygon},
};
use log::{debug, info};

/// A trail feature as read from a vector layer.
#[derive(Debug, Clone)]
pub struct TrailFeature {
    pub id: u64,
    pub geometry: MultiLineString<f64>,
}

/// Vector inputs of a run, in the raster's coordinate system.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub trails: Vec<TrailFeature>,
    pub roads: Vec<LineString<f64>>,
    pub study_area: Polygon<f64>,

    /// Where road distances are measured from.
    pub start: Coord<f64>,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub network: Network,
    pub graph: Graph,
    pub segments: Vec<SegmentResult>,

    /// Present when buffer processing is enabled.
    pub buffer: Option<Buffer>,

    pub metrics: Metrics,

    /// Number of connected trail components.
    pub components: usize,
}

/// Runs the full analysis over `raster`.
///
/// Fails before doing any work if `config` is invalid or the study
/// area misses the raster.
pub fn run<R>(inputs: Inputs, config: &Config, raster: &R) -> Result<Analysis, DifficultyError>
where
    R: RasterSample + ?Sized,
{
    config.validate()?;
    if !inputs
        .study_area
        .intersects(&raster.extent().to_polygon())
    {
        return Err(DifficultyError::StudyAreaOutsideRaster);
    }

    let trails = clip_trails(&inputs.trails, &inputs.study_area);
    let roads: Vec<LineString<f64>> = inputs
        .study_area
        .clip(&MultiLineString::new(inputs.roads), false)
        .into_iter()
        .filter(|road| road.0.len() >= 2)
        .collect();
    info!("clipped; trails: {}, roads: {}", trails.len(), roads.len());

    let roads = RoadNetwork::new(&roads);
    let mut network = Network::builder()
        .trails_threshold(config.trails_threshold)
        .roads_threshold(config.roads_threshold)
        .build(trails, &roads)?;
    let mut graph = Graph::from_network(&network);
    let components = graph.connected_components().len();
    info!(
        "graph; nodes: {}, edges: {}, components: {}, seeds: {}",
        graph.node_count(),
        graph.edge_count(),
        components,
        network.seeds().count()
    );

    let distances = roads.shortest_distances_from(inputs.start);
    let sampler = SegmentSampler::new(raster, config.step_length, config.samples_per_step);
    let propagation =
        Propagator::new(sampler, config.dedup_segments).run(&mut network, &mut graph, &distances);

    let buffer = if config.process_buffer {
        let analyzer = BufferAnalyzer {
            width: config.buffer_width,
            cell_size: config.cell_size,
            w_diff_on_tr: config.w_diff_on_tr,
            w_diff_off_tr: config.w_diff_off_tr,
        };
        let buffer = analyzer.analyze(&propagation.segments, raster)?;
        info!("buffer; cells: {}", buffer.cells.len());
        Some(buffer)
    } else {
        None
    };

    Ok(Analysis {
        network,
        graph,
        segments: propagation.segments,
        buffer,
        metrics: propagation.metrics,
        components,
    })
}

/// Clips trails to `area`, splitting them into single parts.
fn clip_trails(features: &[TrailFeature], area: &Polygon<f64>) -> Vec<Trail> {
    let mut trails = Vec::new();
    for feature in features {
        let parts = area.clip(&feature.geometry, false);
        let mut part = 0;
        for geometry in parts {
            if geometry.0.len() < 2 {
                debug!("dropping degenerate part of trail {}", feature.id);
                continue;
            }
            trails.push(Trail::new(TrailId::new(feature.id, part), geometry));
            part += 1;
        }
    }
    trails
}
