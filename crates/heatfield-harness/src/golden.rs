#![forbid(unsafe_code)]

//! Golden output support for deterministic scenario runs.
//!
//! Every rendered raster is reduced to a stable checksum. A scenario's
//! checksums are compared against `tests/golden/<scenario>.checksums`; with
//! `BLESS=1` the file is rewritten instead.
//!
//! # JSONL Schema
//!
//! ```json
//! {"event":"frame","frame":0,"renderer":"metaballs","width":320,"height":240,"checksum":"fnv1a64:...","detections":1,"blobs":12,"peak":41.2,"active":18,"elapsed_us":812}
//! {"event":"complete","scenario":"walkers","outcome":"pass","frames":30,"checksums":["fnv1a64:..."]}
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use heatfield_fx::{FrameStats, Raster};
use serde_json::{Value, json};

/// Checksum prefix naming the hash.
const CHECKSUM_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

// ============================================================================
// Checksum Computation
// ============================================================================

/// FNV-1a over the raster dimensions and every pixel's RGBA bytes.
///
/// Stable across platforms and toolchains, unlike `DefaultHasher`.
pub fn compute_raster_checksum(raster: &Raster) -> String {
    let size = raster.size();
    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };
    feed(&size.width.to_le_bytes());
    feed(&size.height.to_le_bytes());
    for px in raster.pixels() {
        feed(&px.to_array());
    }
    format!("{CHECKSUM_PREFIX}{hash:016x}")
}

// ============================================================================
// JSONL Records
// ============================================================================

/// One `frame` event.
pub fn frame_record(stats: &FrameStats, raster: &Raster, checksum: &str) -> Value {
    json!({
        "event": "frame",
        "frame": stats.frame,
        "renderer": stats.renderer,
        "width": raster.size().width,
        "height": raster.size().height,
        "checksum": checksum,
        "detections": stats.detections,
        "blobs": stats.blob_count,
        "peak": stats.peak,
        "active": stats.active_cells,
        "elapsed_us": stats.elapsed.as_micros() as u64,
    })
}

/// Closing `complete` event.
pub fn complete_record(scenario: &str, outcome: GoldenOutcome, checksums: &[String]) -> Value {
    json!({
        "event": "complete",
        "scenario": scenario,
        "outcome": outcome.as_str(),
        "frames": checksums.len(),
        "checksums": checksums,
    })
}

// ============================================================================
// Golden File Management
// ============================================================================

/// Path to the golden checksums file for a scenario.
pub fn golden_checksum_path(base_dir: &Path, scenario_name: &str) -> PathBuf {
    base_dir
        .join("tests")
        .join("golden")
        .join(format!("{scenario_name}.checksums"))
}

/// Load expected checksums. A missing file yields an empty list.
pub fn load_golden_checksums(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Write checksums to a golden file, creating parent directories.
pub fn save_golden_checksums(path: &Path, checksums: &[String]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = format!(
        "# Golden checksums - regenerate with BLESS=1\n{}\n",
        checksums.join("\n")
    );
    fs::write(path, content)
}

/// `BLESS=1` (or `true`) rewrites golden files instead of comparing.
pub fn is_bless_mode() -> bool {
    std::env::var("BLESS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Verification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenOutcome {
    Pass,
    Fail,
    Skip,
}

impl GoldenOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

/// Compare checksums frame by frame.
///
/// No expected checksums is a skip. Returns the first mismatching index, if
/// any; a length mismatch fails without an index.
pub fn verify_checksums(actual: &[String], expected: &[String]) -> (GoldenOutcome, Option<usize>) {
    if expected.is_empty() {
        return (GoldenOutcome::Skip, None);
    }
    if actual.len() != expected.len() {
        return (GoldenOutcome::Fail, None);
    }
    match actual.iter().zip(expected).position(|(a, e)| a != e) {
        Some(i) => (GoldenOutcome::Fail, Some(i)),
        None => (GoldenOutcome::Pass, None),
    }
}
