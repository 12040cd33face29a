#![forbid(unsafe_code)]

//! heatfield-harness binary entry point.

use std::env;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use heatfield_core::config::ENV_RENDERER;
use heatfield_core::{EngineConfig, SampleSlot};
use heatfield_fx::{FrameStats, HeatEngine, Raster};
use heatfield_harness::cli::{Opts, SnapshotFormat};
use heatfield_harness::golden::{
    GoldenOutcome, complete_record, compute_raster_checksum, frame_record,
};
use heatfield_harness::scenario::{ScenarioSource, run_scenario_with};
use heatfield_harness::{logging, snapshot};
use tracing::{info, warn};

/// Delay between producer publishes in `--live` mode.
const PRODUCER_INTERVAL: Duration = Duration::from_millis(5);
/// Delay between engine frames in `--live` mode.
const FRAME_INTERVAL: Duration = Duration::from_millis(8);

fn main() {
    let opts = Opts::parse();
    logging::init(opts.log_json);

    let config = load_config(&opts);
    info!(
        scenario = opts.scenario.as_str(),
        frames = opts.frames,
        size = %opts.size,
        config = %config.summary_short(),
        "starting"
    );

    if let Some(dir) = &opts.out
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("Cannot create {}: {e}", dir.display());
        std::process::exit(1);
    }

    let result = if opts.live {
        run_live(&opts, config)
    } else {
        run_fixed(&opts, config)
    };

    match result {
        Ok(checksums) => {
            println!(
                "{}",
                complete_record(opts.scenario.as_str(), GoldenOutcome::Pass, &checksums)
            );
        }
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    }
}

/// Engine config from `HEATFIELD_*`, defaulting the renderer to the
/// scenario's preset.
fn load_config(opts: &Opts) -> EngineConfig {
    let preset = opts.scenario.preset().renderer;
    let parsed = EngineConfig::from_env_with(|key| {
        let value = env::var(key).ok();
        if key == ENV_RENDERER {
            value.or_else(|| Some(preset.as_str().to_string()))
        } else {
            value
        }
    });
    for error in &parsed.errors {
        warn!(field = error.field, value = %error.value, message = %error.message, "config");
    }
    parsed.config
}

fn emit_frame(
    opts: &Opts,
    stats: &FrameStats,
    raster: &Raster,
    checksum: &str,
) -> Result<(), String> {
    println!("{}", frame_record(stats, raster, checksum));
    let Some(dir) = &opts.out else {
        return Ok(());
    };
    write_snapshot(opts, dir, stats.frame, raster)
}

fn write_snapshot(opts: &Opts, dir: &Path, frame: u64, raster: &Raster) -> Result<(), String> {
    let name = snapshot::frame_file_name(opts.scenario.as_str(), frame, opts.format.extension());
    let path = dir.join(name);
    let written = match opts.format {
        SnapshotFormat::Png => snapshot::write_png(raster, &path).map_err(|e| e.to_string()),
        SnapshotFormat::Ppm => snapshot::write_ppm(raster, &path).map_err(|e| e.to_string()),
    };
    written.map_err(|e| format!("Cannot write {}: {e}", path.display()))
}

/// Synchronous run: one sample per frame, fully deterministic.
fn run_fixed(opts: &Opts, config: EngineConfig) -> Result<Vec<String>, String> {
    let mut failure = None;
    let run = run_scenario_with(
        opts.scenario,
        config,
        opts.size,
        opts.frames,
        opts.seed,
        |stats, raster, checksum| {
            if failure.is_none()
                && let Err(e) = emit_frame(opts, stats, raster, checksum)
            {
                failure = Some(e);
            }
        },
    )
    .map_err(|e| e.to_string())?;
    match failure {
        Some(e) => Err(e),
        None => Ok(run.checksums),
    }
}

/// Threaded run: a producer publishes into a [`SampleSlot`] at its own pace
/// and the engine takes whatever is latest each frame.
fn run_live(opts: &Opts, config: EngineConfig) -> Result<Vec<String>, String> {
    let mut engine = HeatEngine::new(config, opts.size).map_err(|e| e.to_string())?;
    let slot = SampleSlot::new();

    let producer = {
        let slot = slot.clone();
        let mut source = ScenarioSource::new(opts.scenario, opts.seed);
        let frames = opts.frames;
        thread::spawn(move || {
            for frame in 0..frames {
                slot.publish(source.sample(frame));
                thread::sleep(PRODUCER_INTERVAL);
            }
        })
    };

    let mut checksums = Vec::with_capacity(opts.frames as usize);
    for _ in 0..opts.frames {
        let stats = engine.render_from_slot(&slot);
        let checksum = compute_raster_checksum(engine.raster());
        emit_frame(opts, &stats, engine.raster(), &checksum)?;
        checksums.push(checksum);
        thread::sleep(FRAME_INTERVAL);
    }

    if producer.join().is_err() {
        warn!("producer thread panicked");
    }
    info!(published = slot.published_count(), frames = opts.frames, "live run finished");
    Ok(checksums)
}
