//! EPS path-reconstruction engine.
//!
//! Post-processes plotter EPS output whose vector content arrives as
//! thousands of single-segment graphics-state blocks. The engine groups
//! blocks that share identical rendering state, rebuilds continuous
//! polylines from the resulting point-adjacency graphs, and can merge
//! adjacent filled polygons that share edges. Everything it does not
//! understand passes through byte-for-byte; the prolog (through
//! `%%EndPageSetup`) and the trailer (from `%%Trailer`) are never touched.
//!
//! The engine is strictly single-threaded and consumes its input
//! sequentially: working memory is proportional to the accumulated prefixes,
//! graphs, and passthrough indices, and nothing leaves the block registry
//! until the trailer (strict grouping) or a soft-grouping flush.

use std::io;
use std::path::{Path, PathBuf};

use core_source::Document;
use thiserror::Error;
use tracing::info;

mod block;
mod emit;
mod parse;

/// Cleaning policies. All default to off; each is independently valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Discard any block whose content contains a rectangle (`re`) operator,
    /// clipping path included.
    pub remove_boxes: bool,
    /// Flush the block registry on prefix change so Z-order is preserved;
    /// only runs of consecutive identical-state blocks coalesce.
    pub group_soft: bool,
    /// Merge adjacent fill polygons that share edges. Off, fill blocks stay
    /// opaque passthrough.
    pub combine_areas: bool,
    /// Insert the synthetic `1 setlinecap` before a linejoin even when the
    /// prefix uses `setdash` (earlier-revision compatibility; the default
    /// suppresses the insertion in dash mode).
    pub dash_linecap: bool,
}

/// Counters accumulated over one cleaning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub lines: usize,
    pub blocks: usize,
    pub prefixes: usize,
    pub blocks_discarded: usize,
    pub soft_flushes: usize,
    pub polylines: usize,
    pub fill_polygons: usize,
    pub polygons_merged: usize,
}

/// Fatal I/O failures. Malformed input is never an error: the engine is a
/// post-processor and preserves what it cannot attribute.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read input {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to replace {} with cleaned output", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Clean one document held in memory. This is the pure core: same input and
/// options, same output.
pub fn clean_document(input: &str, opts: &Options) -> (String, CleanStats) {
    let doc = Document::parse(input);
    parse::Machine::new(&doc, opts).run()
}

/// Clean a file on disk. With `out` absent or equal to `input`, the cleaned
/// bytes go to a sibling temporary file which is then renamed over the
/// original, so a failed write never corrupts the source.
pub fn clean_file(
    input: &Path,
    out: Option<&Path>,
    opts: &Options,
) -> Result<CleanStats, EngineError> {
    let text = std::fs::read_to_string(input).map_err(|source| EngineError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let (cleaned, stats) = clean_document(&text, opts);
    match out {
        Some(dest) if dest != input => {
            std::fs::write(dest, cleaned).map_err(|source| EngineError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
        }
        _ => {
            let tmp = sibling_tmp(input);
            std::fs::write(&tmp, cleaned).map_err(|source| EngineError::Write {
                path: tmp.clone(),
                source,
            })?;
            std::fs::rename(&tmp, input).map_err(|source| EngineError::Replace {
                path: input.to_path_buf(),
                source,
            })?;
        }
    }
    info!(
        target: "engine",
        lines = stats.lines,
        blocks = stats.blocks,
        prefixes = stats.prefixes,
        polylines = stats.polylines,
        merged = stats.polygons_merged,
        "clean_complete"
    );
    Ok(stats)
}

fn sibling_tmp(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{name}.tmp"))
}
