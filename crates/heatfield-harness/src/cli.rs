#![forbid(unsafe_code)]

//! Command-line argument parsing for the harness.
//!
//! Parses args manually to keep the binary lean. Harness options can be
//! preset with `HEATFIELD_HARNESS_*`; engine tunables come from the
//! `HEATFIELD_*` variables read by `EngineConfig::from_env`.

use std::env;
use std::path::PathBuf;
use std::process;

use heatfield_core::Size;

use crate::scenario::{DEFAULT_SEED, Scenario};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_SCENARIO: &str = "HEATFIELD_HARNESS_SCENARIO";
pub const ENV_FRAMES: &str = "HEATFIELD_HARNESS_FRAMES";
pub const ENV_SIZE: &str = "HEATFIELD_HARNESS_SIZE";

const HELP_TEXT: &str = "\
heatfield-harness - headless heat-field renderer

USAGE:
    heatfield-harness [OPTIONS]

OPTIONS:
    --scenario=NAME    Input: 'walkers' (default), 'mask' or 'video'
    --frames=N         Frames to render (default: 120)
    --size=WxH         Output raster size (default: 640x360)
    --seed=N           Seed for synthetic input (default: fixed)
    --out=DIR          Write a PNG snapshot per frame into DIR
    --ppm              Write PPM instead of PNG
    --live             Feed input from a producer thread (latest wins)
    --log-json         Emit logs as JSON on stderr
    --help, -h         Show this help message
    --version, -V      Show version

OUTPUT:
    One JSON object per frame on stdout, then a closing 'complete' record.

ENVIRONMENT VARIABLES:
    HEATFIELD_HARNESS_SCENARIO   Override --scenario
    HEATFIELD_HARNESS_FRAMES     Override --frames
    HEATFIELD_HARNESS_SIZE       Override --size
    HEATFIELD_RENDERER, HEATFIELD_DECAY, ...   Engine tunables
    RUST_LOG                     Log filter (default: warn)";

/// Snapshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Png,
    Ppm,
}

impl SnapshotFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Ppm => "ppm",
        }
    }
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    pub scenario: Scenario,
    pub frames: u64,
    pub size: Size,
    pub seed: u32,
    /// Snapshot directory, if any.
    pub out: Option<PathBuf>,
    pub format: SnapshotFormat,
    pub live: bool,
    pub log_json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            scenario: Scenario::Walkers,
            frames: 120,
            size: Size::new(640, 360),
            seed: DEFAULT_SEED,
            out: None,
            format: SnapshotFormat::Png,
            live: false,
            log_json: false,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or invalid input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(args, |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("heatfield-harness {VERSION}");
                process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with environment lookups through `get`.
    ///
    /// Environment values apply first; explicit flags override them.
    pub fn parse_from<I, F>(args: I, mut get: F) -> Result<Command, String>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = get(ENV_SCENARIO) {
            opts.scenario = parse_scenario(&val)?;
        }
        if let Some(val) = get(ENV_FRAMES) {
            opts.frames = parse_frames(&val)?;
        }
        if let Some(val) = get(ENV_SIZE) {
            opts.size = parse_size(&val)?;
        }

        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--log-json" => opts.log_json = true,
                "--live" => opts.live = true,
                "--ppm" => opts.format = SnapshotFormat::Ppm,
                other => {
                    if let Some(val) = other.strip_prefix("--scenario=") {
                        opts.scenario = parse_scenario(val)?;
                    } else if let Some(val) = other.strip_prefix("--frames=") {
                        opts.frames = parse_frames(val)?;
                    } else if let Some(val) = other.strip_prefix("--size=") {
                        opts.size = parse_size(val)?;
                    } else if let Some(val) = other.strip_prefix("--seed=") {
                        opts.seed = val
                            .parse()
                            .map_err(|_| format!("Invalid --seed value: {val}"))?;
                    } else if let Some(val) = other.strip_prefix("--out=") {
                        if val.is_empty() {
                            return Err("Invalid --out value: empty path".to_string());
                        }
                        opts.out = Some(PathBuf::from(val));
                    } else {
                        return Err(format!("Unknown argument: {other}"));
                    }
                }
            }
        }

        Ok(Command::Run(opts))
    }
}

fn parse_scenario(val: &str) -> Result<Scenario, String> {
    Scenario::parse(val).ok_or_else(|| format!("Invalid --scenario value: {val}"))
}

fn parse_frames(val: &str) -> Result<u64, String> {
    val.trim()
        .parse()
        .map_err(|_| format!("Invalid --frames value: {val}"))
}

fn parse_size(val: &str) -> Result<Size, String> {
    Size::parse(val)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Invalid --size value: {val}"))
}
