//! Prefix-keyed block registry.
//!
//! A block record accumulates everything attributed to one rendering-state
//! prefix: passthrough content line indices in original file order, the
//! stroke graph, and the fill graph. The registry pairs the record map with
//! an insertion-ordered prefix list; the list defines emission order and a
//! prefix enters it exactly once however often it recurs.

use ahash::AHashMap;
use core_graph::{FillGraph, StrokeGraph};

#[derive(Debug, Default)]
pub(crate) struct BlockRecord {
    pub passthrough: Vec<usize>,
    pub stroke: StrokeGraph,
    pub fill: FillGraph,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    map: AHashMap<String, BlockRecord>,
    order: Vec<String>,
}

impl Registry {
    pub fn contains(&self, prefix: &str) -> bool {
        self.map.contains_key(prefix)
    }

    /// Record for `prefix`, created (and appended to the block list) on first
    /// encounter.
    pub fn entry(&mut self, prefix: &str) -> &mut BlockRecord {
        if !self.map.contains_key(prefix) {
            self.order.push(prefix.to_string());
        }
        self.map.entry(prefix.to_string()).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove and return every block in insertion order.
    pub fn drain(&mut self) -> Vec<(String, BlockRecord)> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|p| self.map.remove(&p).map(|r| (p, r)))
            .collect()
    }

    /// Remove and return every block except `keep`, which survives the flush
    /// with its accumulated state and becomes the sole registered block.
    pub fn drain_except(&mut self, keep: &str) -> Vec<(String, BlockRecord)> {
        let order = std::mem::take(&mut self.order);
        let mut flushed = Vec::new();
        for p in order {
            if p == keep {
                self.order.push(p);
            } else if let Some(r) = self.map.remove(&p) {
                flushed.push((p, r));
            }
        }
        flushed
    }
}
