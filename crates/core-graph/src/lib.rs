//! Point-adjacency graphs for EPS path reconstruction.
//!
//! Contract:
//! - Vertices are textual point ids (the coordinate text of a moveto/lineto
//!   line). Ids are interned per graph; the original text is recoverable
//!   verbatim at emission time, never re-formatted.
//! - Zero-length edges (identical endpoints) are discarded on insert.
//! - `StrokeGraph` collapses parallel edges: duplicated stroke segments are an
//!   upstream artifact to deduplicate. `FillGraph` keeps multiplicity and the
//!   polygon-ordered edge runs the merger depends on.
//! - Determinism: hash maps are lookup-only; every traversal that influences
//!   output walks insertion-ordered vectors.

use ahash::AHashMap;

pub mod geom;
pub mod merge;
pub mod trace;

pub use merge::{MergeResult, merge_fill_polygons};
pub use trace::{TraceResult, stroke_polylines};

/// Interned point index, local to one graph.
pub type PointIx = u32;

/// String-to-index interner. First use assigns the next index, so interned
/// order is input order.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    map: AHashMap<String, PointIx>,
    ids: Vec<String>,
}

impl Interner {
    pub fn intern(&mut self, id: &str) -> PointIx {
        if let Some(&ix) = self.map.get(id) {
            return ix;
        }
        let ix = self.ids.len() as PointIx;
        self.map.insert(id.to_string(), ix);
        self.ids.push(id.to_string());
        ix
    }

    pub fn resolve(&self, ix: PointIx) -> &str {
        &self.ids[ix as usize]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Undirected simple graph over point ids, built from stroke segments.
#[derive(Debug, Default, Clone)]
pub struct StrokeGraph {
    points: Interner,
    adj: Vec<Vec<PointIx>>,
    edges: usize,
}

impl StrokeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one segment. Zero-length segments and parallel duplicates of an
    /// existing edge are discarded.
    pub fn add_segment(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let a = self.intern(from);
        let b = self.intern(to);
        if self.adj[a as usize].contains(&b) {
            return;
        }
        self.adj[a as usize].push(b);
        self.adj[b as usize].push(a);
        self.edges += 1;
    }

    fn intern(&mut self, id: &str) -> PointIx {
        let ix = self.points.intern(id);
        if self.adj.len() <= ix as usize {
            self.adj.resize(ix as usize + 1, Vec::new());
        }
        ix
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn id(&self, ix: PointIx) -> &str {
        self.points.resolve(ix)
    }

    pub(crate) fn neighbors(&self, ix: PointIx) -> &[PointIx] {
        &self.adj[ix as usize]
    }
}

/// Undirected multigraph over point ids carrying fill polygons in input
/// order. A polygon is the contiguous edge run from a moveto until an edge
/// returns to the polygon's starting vertex, whether that edge came from a
/// closepath or a returning lineto.
#[derive(Debug, Default, Clone)]
pub struct FillGraph {
    points: Interner,
    polygons: Vec<Vec<(PointIx, PointIx)>>,
    current: Vec<(PointIx, PointIx)>,
    start: Option<PointIx>,
    edges: usize,
}

impl FillGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new polygon at a moveto target. Any unclosed run in flight is
    /// flushed first.
    pub fn begin_polygon(&mut self, at: &str) {
        self.close_current();
        self.start = Some(self.points.intern(at));
    }

    /// Append one directed edge; closes the polygon when the destination
    /// returns to the starting vertex. Zero-length edges are discarded.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let a = self.points.intern(from);
        let b = self.points.intern(to);
        if self.start.is_none() {
            // Defensive: edge stream without a preceding moveto.
            self.start = Some(a);
        }
        self.current.push((a, b));
        self.edges += 1;
        if self.start == Some(b) {
            self.close_current();
        }
    }

    /// Flush an unclosed polygon at the end of a block occurrence so runs
    /// never bleed across occurrences of the same prefix.
    pub fn end_path(&mut self) {
        self.close_current();
    }

    fn close_current(&mut self) {
        if !self.current.is_empty() {
            self.polygons.push(std::mem::take(&mut self.current));
        }
        self.start = None;
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len() + usize::from(!self.current.is_empty())
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn id(&self, ix: PointIx) -> &str {
        self.points.resolve(ix)
    }

    pub(crate) fn polygons(&self) -> &[Vec<(PointIx, PointIx)>] {
        &self.polygons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_assigns_stable_indices() {
        let mut i = Interner::default();
        let a = i.intern("0 0");
        let b = i.intern("1 0");
        assert_eq!(i.intern("0 0"), a);
        assert_ne!(a, b);
        assert_eq!(i.resolve(b), "1 0");
    }

    #[test]
    fn stroke_discards_zero_length_and_duplicates() {
        let mut g = StrokeGraph::new();
        g.add_segment("1 1", "1 1");
        assert!(g.is_empty());
        g.add_segment("0 0", "1 0");
        g.add_segment("1 0", "0 0");
        g.add_segment("0 0", "1 0");
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn fill_closes_on_closepath_edge() {
        let mut g = FillGraph::new();
        g.begin_polygon("0 0");
        g.add_edge("0 0", "1 0");
        g.add_edge("1 0", "1 1");
        g.add_edge("1 1", "0 0");
        assert_eq!(g.polygons().len(), 1);
        assert_eq!(g.polygons()[0].len(), 3);
    }

    #[test]
    fn fill_closes_on_returning_lineto() {
        // No explicit closepath: an edge whose destination equals the start
        // vertex closes the run all the same.
        let mut g = FillGraph::new();
        g.begin_polygon("0 0");
        g.add_edge("0 0", "2 0");
        g.add_edge("2 0", "0 0");
        g.begin_polygon("5 5");
        g.add_edge("5 5", "6 5");
        g.end_path();
        assert_eq!(g.polygons().len(), 2);
    }

    #[test]
    fn fill_keeps_parallel_edges() {
        let mut g = FillGraph::new();
        g.begin_polygon("0 0");
        g.add_edge("0 0", "1 0");
        g.add_edge("1 0", "0 0");
        g.begin_polygon("0 0");
        g.add_edge("0 0", "1 0");
        g.add_edge("1 0", "0 0");
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.polygons().len(), 2);
    }
}
