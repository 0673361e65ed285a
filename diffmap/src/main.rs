mod input;
mod options;

use anyhow::Error as AnyError;
use clap::Parser;
use difficulty::{analyze_study_points, Analysis, Config, DifficultyError, Inputs, RoadNetwork};
use geo::geometry::{Coord, Rect};
use log::info;
use options::{Cli, Command as CliCmd};
use raster::Raster;
use serde::Serialize;
use std::{fs::File, io::Write, path::Path, process::ExitCode};
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<ExitCode, AnyError> {
    let Cli {
        trails,
        roads,
        raster,
        study_area,
        start,
        snap_start,
        config,
        overrides,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let mut config = match config {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => Config::default(),
    };
    overrides.apply(&mut config);

    let raster = Raster::memmap(&raster)?;
    let analysis = || {
        analyze(&trails, &roads, &study_area.0, start.0, snap_start, &config, &raster)
    };

    let outcome = match cmd {
        CliCmd::Landform => return landform(&raster, &study_area.0),
        CliCmd::Segments => analysis()?.map(|a| segments(&a)),
        CliCmd::Cells => analysis()?.map(|a| cells(&a)),
        CliCmd::Summary => analysis()?.map(|a| summary(&a)),
        CliCmd::StudyPoints { points } => {
            analysis()?.map(|a| study_points(&a, &config, &raster, &points))
        }
    };
    match outcome {
        Ok(written) => written.map(|()| ExitCode::SUCCESS),
        Err(err) => Ok(aborted(&err)),
    }
}

/// Loads the vector layers and runs the analysis.
///
/// Input errors are returned in the outer result, analysis aborts in
/// the inner one.
fn analyze(
    trails: &Path,
    roads: &Path,
    study_area: &Rect<f64>,
    start: Coord<f64>,
    snap_start: bool,
    config: &Config,
    raster: &Raster,
) -> Result<Result<Analysis, DifficultyError>, AnyError> {
    let roads = input::roads(roads)?;
    let start = if snap_start {
        let snapped = RoadNetwork::new(&roads).project_onto_nearest_road(start);
        info!("start snapped from {:?} to {:?}", start, snapped);
        snapped
    } else {
        start
    };
    let inputs = Inputs {
        trails: input::trails(trails)?,
        roads,
        study_area: study_area.to_polygon(),
        start,
    };
    Ok(difficulty::run(inputs, config, raster))
}

fn aborted(err: &DifficultyError) -> ExitCode {
    eprintln!("aborted: {err}");
    ExitCode::FAILURE
}

fn output<T: Serialize>(value: &T) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn segments(analysis: &Analysis) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        trail_id: String,
        start_point: usize,
        end_point: usize,
        geometry: [[f64; 2]; 2],
        segment_difficulty: f64,
        total_difficulty: f64,
        position_along_trail: f64,
        road_distance_at_entry: Option<f64>,
        segment_length: f64,
        total_trail_distance: f64,
        elevation_gain: f64,
        total_elevation_gain: f64,
        descent: f64,
        total_descent: f64,
    }

    let entries: Vec<JsonEntry> = analysis
        .segments
        .iter()
        .map(|s| JsonEntry {
            trail_id: s.trail_id.to_string(),
            start_point: s.start_point.0,
            end_point: s.end_point.0,
            geometry: [
                [s.geometry.start.x, s.geometry.start.y],
                [s.geometry.end.x, s.geometry.end.y],
            ],
            segment_difficulty: s.segment_difficulty,
            total_difficulty: s.total_difficulty,
            position_along_trail: s.position_along_trail,
            road_distance_at_entry: s
                .road_distance_at_entry
                .is_finite()
                .then_some(s.road_distance_at_entry),
            segment_length: s.segment_length,
            total_trail_distance: s.total_trail_distance,
            elevation_gain: s.elevation_gain,
            total_elevation_gain: s.total_elevation_gain,
            descent: s.descent,
            total_descent: s.total_descent,
        })
        .collect();
    output(&entries)
}

fn cells(analysis: &Analysis) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        center: [f64; 2],
        row: usize,
        col: usize,
        altitude: f64,
        distance_to_segment: f64,
        segment: usize,
        difficulty: f64,
    }

    let entries: Vec<JsonEntry> = analysis
        .buffer
        .iter()
        .flat_map(|buffer| &buffer.cells)
        .map(|c| JsonEntry {
            center: [c.center.x, c.center.y],
            row: c.row,
            col: c.col,
            altitude: c.altitude,
            distance_to_segment: c.distance_to_segment,
            segment: c.segment,
            difficulty: c.difficulty,
        })
        .collect();
    output(&entries)
}

fn summary(analysis: &Analysis) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonSummary {
        elapsed_ms: f64,
        points_visited: usize,
        segments_created: usize,
        max_segment_difficulty: Option<f64>,
        mean_segment_difficulty: Option<f64>,
        cutting_points: usize,
        seeds: usize,
        edges: usize,
        components: usize,
        buffer_cells: Option<usize>,
    }

    let metrics = &analysis.metrics;
    output(&JsonSummary {
        elapsed_ms: metrics.elapsed.as_secs_f64() * 1e3,
        points_visited: metrics.points_visited,
        segments_created: metrics.segments_created,
        max_segment_difficulty: metrics.max_segment_difficulty,
        mean_segment_difficulty: metrics.mean_segment_difficulty,
        cutting_points: analysis.network.len(),
        seeds: analysis.network.seeds().count(),
        edges: analysis.graph.edge_count(),
        components: analysis.components,
        buffer_cells: analysis.buffer.as_ref().map(|b| b.cells.len()),
    })
}

fn study_points(
    analysis: &Analysis,
    config: &Config,
    raster: &Raster,
    path: &Path,
) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        point: [f64; 2],
        dist_on_trails: f64,
        total_elevation_gain: f64,
        total_descent: f64,
        dist_out_trail: f64,
        altitude_difference: f64,
        road_distance: Option<f64>,
        difficulty: f64,
    }

    let points = input::points(path)?;
    let entries: Vec<JsonEntry> = analyze_study_points(
        &points,
        &analysis.segments,
        raster,
        config.w_diff_on_tr,
        config.w_diff_off_tr,
    )
    .into_iter()
    .map(|p| JsonEntry {
        point: [p.point.x, p.point.y],
        dist_on_trails: p.total_trail_distance,
        total_elevation_gain: p.total_elevation_gain,
        total_descent: p.total_descent,
        dist_out_trail: p.distance_off_trail,
        altitude_difference: p.altitude_difference,
        road_distance: p.road_distance.is_finite().then_some(p.road_distance),
        difficulty: p.difficulty,
    })
    .collect();
    output(&entries)
}

fn landform(raster: &Raster, study_area: &Rect<f64>) -> Result<ExitCode, AnyError> {
    #[derive(Serialize)]
    struct JsonGrid {
        origin: [f64; 2],
        cell_size: f64,
        min_value: Option<f32>,
        max_value: Option<f32>,
        rows: Vec<Vec<Option<f32>>>,
    }

    let Some(crop) = raster.crop(study_area) else {
        return Ok(aborted(&DifficultyError::StudyAreaOutsideRaster));
    };
    output(&JsonGrid {
        origin: [crop.transform.origin.x, crop.transform.origin.y],
        cell_size: crop.transform.cell_size,
        min_value: raster.min_value(),
        max_value: raster.max_value(),
        rows: crop.samples,
    })?;
    Ok(ExitCode::SUCCESS)
}
