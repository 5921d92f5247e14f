//! Block emission.
//!
//! Layout per block: `GS`, the prefix lines, reconstructed content, `GR`.
//! When both graphs are empty the content is a plain `N` (omitted for blocks
//! whose prefix ends in a folded clip path) followed by the passthrough lines
//! verbatim. Otherwise the stroke tracer and the fill merger each emit their
//! own `N`-prefixed run, and any remaining passthrough lines follow.

use core_graph::{merge_fill_polygons, stroke_polylines};
use core_source::Document;

use crate::CleanStats;
use crate::block::BlockRecord;

pub(crate) fn write_block(
    out: &mut String,
    doc: &Document,
    prefix: &str,
    rec: &BlockRecord,
    stats: &mut CleanStats,
) {
    let nl = doc.newline().as_str();
    out.push_str("GS");
    out.push_str(nl);
    for line in prefix.split_terminator('\n') {
        out.push_str(line);
        out.push_str(nl);
    }
    if rec.stroke.is_empty() && rec.fill.is_empty() {
        if !prefix.ends_with("clip\n") {
            out.push_str("N");
            out.push_str(nl);
        }
        for &ix in &rec.passthrough {
            doc.line(ix).write_terminated(out, doc.newline());
        }
    } else {
        if !rec.stroke.is_empty() {
            let traced = stroke_polylines(&rec.stroke);
            stats.polylines += traced.polylines;
            for line in &traced.lines {
                out.push_str(line);
                out.push_str(nl);
            }
        }
        if !rec.fill.is_empty() {
            let merged = merge_fill_polygons(&rec.fill);
            stats.fill_polygons += merged.polygons;
            stats.polygons_merged += merged.merges;
            for line in &merged.lines {
                out.push_str(line);
                out.push_str(nl);
            }
        }
        for &ix in &rec.passthrough {
            doc.line(ix).write_terminated(out, doc.newline());
        }
    }
    out.push_str("GR");
    out.push_str(nl);
}
