//! Greedy Eulerian-style polyline tracing over a stroke graph.
//!
//! Seeds are taken in ascending-degree order so open polylines start at their
//! endpoints (degree 1) and interior cycles are traced only after all
//! endpoints are exhausted. Each connected component yields
//! `max(1, odd_vertices / 2)` polylines; the result is not required to be
//! optimal, only deterministic, and every edge is consumed exactly once.

use crate::{PointIx, StrokeGraph};

/// Reconstructed stroke content: operator lines `N`, `<id> M`, `<id> L`,
/// `cp`, terminated by one `S`.
#[derive(Debug, Default)]
pub struct TraceResult {
    pub lines: Vec<String>,
    pub polylines: usize,
}

struct Walker {
    // Parallel to the graph adjacency: per-entry consumed flag.
    used: Vec<Vec<bool>>,
    deg: Vec<usize>,
    remaining: usize,
}

impl Walker {
    fn new(g: &StrokeGraph) -> Self {
        let used = (0..g.point_count())
            .map(|v| vec![false; g.neighbors(v as PointIx).len()])
            .collect();
        let deg = (0..g.point_count())
            .map(|v| g.neighbors(v as PointIx).len())
            .collect();
        Self {
            used,
            deg,
            remaining: g.edge_count(),
        }
    }

    /// Consume and return the first unused edge at `at`, in adjacency
    /// insertion order.
    fn take_edge(&mut self, g: &StrokeGraph, at: PointIx) -> Option<PointIx> {
        let slot = self.used[at as usize].iter().position(|u| !u)?;
        let next = g.neighbors(at)[slot];
        self.used[at as usize][slot] = true;
        // Mirror entry; the graph is simple so exactly one exists.
        let back = g
            .neighbors(next)
            .iter()
            .zip(self.used[next as usize].iter())
            .position(|(&n, &u)| n == at && !u);
        if let Some(back) = back {
            self.used[next as usize][back] = true;
        }
        self.deg[at as usize] -= 1;
        self.deg[next as usize] -= 1;
        self.remaining -= 1;
        Some(next)
    }
}

/// Emit maximal continuous polylines covering every stroke edge once.
pub fn stroke_polylines(g: &StrokeGraph) -> TraceResult {
    let mut result = TraceResult::default();
    if g.is_empty() {
        return result;
    }
    result.lines.push("N".to_string());

    let mut order: Vec<PointIx> = (0..g.point_count() as PointIx).collect();
    order.sort_by_key(|&v| (g.neighbors(v).len(), v));

    let mut w = Walker::new(g);
    while w.remaining > 0 {
        let before = w.remaining;
        for &seed in &order {
            while w.deg[seed as usize] > 0 {
                result.polylines += 1;
                result.lines.push(format!("{} M", g.id(seed)));
                let mut cur = seed;
                while let Some(next) = w.take_edge(g, cur) {
                    if next == seed {
                        result.lines.push("cp".to_string());
                    } else {
                        result.lines.push(format!("{} L", g.id(next)));
                    }
                    cur = next;
                }
            }
        }
        // A full pass always consumes edges while any remain; the guard keeps
        // a corrupted adjacency from spinning.
        if w.remaining == before {
            tracing::warn!(
                target: "graph.trace",
                remaining = w.remaining,
                "stroke tracing stalled; dropping remaining edges"
            );
            break;
        }
    }

    result.lines.push("S".to_string());
    result
}
