//! Greedy merging of adjacent fill polygons by shared-edge removal.
//!
//! Two passes over the polygons of one fill graph:
//! 1. Flag self-touching polygons (an undirected edge repeated inside one
//!    polygon's own run). Flagged polygons never merge; their edges are
//!    claimed upfront so the greedy pass leaves them alone.
//! 2. Walk the remaining polygons in input order. The first edge shared with
//!    another polygon is removed outright, joining the two outlines; further
//!    shared edges are removed only while they extend the recorded open ends
//!    of the removed run and removal cannot disconnect the outline. Shared
//!    edges that stay become double edges (use-count 2) and are traversed
//!    twice during emission.
//!
//! Emission walks surviving edges like the stroke tracer, with two
//! refinements: seeds ascend by remaining edge use, neighbor candidates are
//! taken double-edges-first, and once a double edge establishes a winding
//! side every later multi-choice vertex rejects neighbors on the other side.
//! Degenerate geometry falls back to insertion order; at worst the output is
//! the un-merged outline set.

use ahash::{AHashMap, AHashSet};

use crate::geom;
use crate::{FillGraph, PointIx};

type Key = (PointIx, PointIx);

fn key(a: PointIx, b: PointIx) -> Key {
    if a < b { (a, b) } else { (b, a) }
}

/// Reconstructed fill content: operator lines `N`, `<id> M`, `<id> L`, `cp`,
/// terminated by one `f`.
#[derive(Debug, Default)]
pub struct MergeResult {
    pub lines: Vec<String>,
    pub polygons: usize,
    pub merges: usize,
}

struct Matrices {
    /// Remaining traversals per undirected edge (0 = removed).
    edge_use: AHashMap<Key, u32>,
    /// Owning polygon label per in-use edge.
    edge_owner: AHashMap<Key, usize>,
    /// Per-vertex count of distinct in-use edges.
    deg: Vec<u32>,
}

impl Matrices {
    fn new(points: usize) -> Self {
        Self {
            edge_use: AHashMap::new(),
            edge_owner: AHashMap::new(),
            deg: vec![0; points],
        }
    }

    fn claim(&mut self, k: Key, owner: usize, uses: u32) {
        self.edge_use.insert(k, uses);
        self.edge_owner.insert(k, owner);
        self.deg[k.0 as usize] += 1;
        self.deg[k.1 as usize] += 1;
    }

    fn bump(&mut self, k: Key) {
        let u = self.edge_use.entry(k).or_insert(0);
        *u = (*u + 1).min(2);
    }

    fn remove(&mut self, k: Key) {
        self.edge_use.insert(k, 0);
        self.edge_owner.remove(&k);
        self.deg[k.0 as usize] -= 1;
        self.deg[k.1 as usize] -= 1;
    }
}

struct Labels {
    parent: Vec<usize>,
}

impl Labels {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn relabel(&mut self, from: usize, to: usize) {
        let root = self.find(from);
        self.parent[root] = to;
    }
}

/// Merge adjacent polygons and emit the surviving outlines.
pub fn merge_fill_polygons(g: &FillGraph) -> MergeResult {
    let polys = g.polygons();
    let mut result = MergeResult {
        polygons: polys.len(),
        ..MergeResult::default()
    };
    if g.is_empty() {
        return result;
    }

    let mut m = Matrices::new(g.point_count());
    let mut labels = Labels::new(polys.len());
    let mut self_touch = vec![false; polys.len()];

    // Pass 1: self-touching polygons opt out of merging entirely.
    for (p, poly) in polys.iter().enumerate() {
        let mut counts: AHashMap<Key, u32> = AHashMap::new();
        for &(a, b) in poly {
            *counts.entry(key(a, b)).or_insert(0) += 1;
        }
        if counts.values().any(|&c| c > 1) {
            self_touch[p] = true;
            // Claim upfront at the actual reference count (capped at the
            // double-edge maximum) so emission traverses each edge exactly as
            // often as the polygon references it.
            for &(a, b) in poly {
                let k = key(a, b);
                let uses = counts[&k].min(2);
                if m.edge_use.get(&k).copied().unwrap_or(0) == 0 {
                    m.claim(k, p, uses);
                } else {
                    m.edge_use.insert(k, 2);
                }
            }
        }
    }

    // Pass 2: greedy edge-removal merge in input order.
    for p in 0..polys.len() {
        if self_touch[labels.find(p)] {
            continue;
        }
        let mut handled: Vec<usize> = Vec::new();
        let mut open_ends: AHashMap<usize, (PointIx, PointIx)> = AHashMap::new();
        for &(u, v) in &polys[p] {
            let k = key(u, v);
            let lp = labels.find(p);
            let owner = match m.edge_owner.get(&k).copied() {
                None => {
                    m.claim(k, lp, 1);
                    continue;
                }
                Some(o) => labels.find(o),
            };
            if owner == lp {
                m.bump(k);
                continue;
            }
            if self_touch[owner] {
                // Flagged polygon; its edges were pre-marked and stay put.
                continue;
            }
            if !handled.contains(&owner) {
                // First shared edge with this polygon: removing it joins the
                // two outlines.
                m.remove(k);
                open_ends.insert(owner, (u, v));
                handled.push(owner);
                continue;
            }
            let (a, b) = open_ends[&owner];
            let connected = u == a || u == b || v == a || v == b;
            if connected && (m.deg[u as usize] == 1 || m.deg[v as usize] == 1) {
                m.remove(k);
                let ends = if (u == a || v == a) && (u == b || v == b) {
                    (a, b)
                } else if u == a {
                    (v, b)
                } else if v == a {
                    (u, b)
                } else if u == b {
                    (a, v)
                } else {
                    (a, u)
                };
                open_ends.insert(owner, ends);
            } else {
                // Unremovable shared edge: both outlines keep it, traversed
                // twice at emission.
                m.bump(k);
            }
        }
        if handled.is_empty() {
            continue;
        }
        let lp = labels.find(p);
        for q in handled {
            labels.relabel(q, lp);
            result.merges += 1;
        }
        // A merge can itself produce a self-touching polygon; re-check so
        // later polygons refuse to merge with it.
        let owned: Vec<(Key, usize)> = m.edge_owner.iter().map(|(k, &o)| (*k, o)).collect();
        let touching = owned
            .into_iter()
            .any(|(k, o)| labels.find(o) == lp && m.edge_use.get(&k).copied().unwrap_or(0) >= 2);
        if touching {
            self_touch[lp] = true;
        }
    }

    result.lines = emit(g, &m);
    result
}

struct AdjEntry {
    to: PointIx,
    remaining: u32,
}

/// Traverse every surviving edge (double edges twice) into `M`/`L`/`cp`
/// outlines terminated by `f`.
fn emit(g: &FillGraph, m: &Matrices) -> Vec<String> {
    let points = g.point_count();
    let mut adj: Vec<Vec<AdjEntry>> = (0..points).map(|_| Vec::new()).collect();
    let mut vert_use = vec![0u32; points];
    let mut total = 0usize;
    let mut added: AHashSet<Key> = AHashSet::new();
    for poly in g.polygons() {
        for &(a, b) in poly {
            let k = key(a, b);
            let uses = m.edge_use.get(&k).copied().unwrap_or(0);
            if uses == 0 || !added.insert(k) {
                continue;
            }
            adj[a as usize].push(AdjEntry { to: b, remaining: uses });
            adj[b as usize].push(AdjEntry { to: a, remaining: uses });
            vert_use[a as usize] += uses;
            vert_use[b as usize] += uses;
            total += uses as usize;
        }
    }
    if total == 0 {
        return Vec::new();
    }

    let mut order: Vec<PointIx> = (0..points as PointIx).collect();
    order.sort_by_key(|&v| (vert_use[v as usize], v));

    let mut out = vec!["N".to_string()];
    let mut chirality: Option<f64> = None;
    while total > 0 {
        let before = total;
        for &seed in &order {
            while vert_use[seed as usize] > 0 {
                out.push(format!("{} M", g.id(seed)));
                let mut prev: Option<PointIx> = None;
                let mut cur = seed;
                while let Some(next) = choose_step(g, &adj, cur, prev, &mut chirality) {
                    consume(&mut adj, &mut vert_use, &mut total, cur, next);
                    if next == seed {
                        out.push("cp".to_string());
                    } else {
                        out.push(format!("{} L", g.id(next)));
                    }
                    prev = Some(cur);
                    cur = next;
                }
            }
        }
        if total == before {
            tracing::warn!(
                target: "engine.merge",
                remaining = total,
                "fill traversal stalled; dropping remaining edges"
            );
            break;
        }
    }
    out.push("f".to_string());
    out
}

fn consume(
    adj: &mut [Vec<AdjEntry>],
    vert_use: &mut [u32],
    total: &mut usize,
    at: PointIx,
    to: PointIx,
) {
    for e in &mut adj[at as usize] {
        if e.to == to && e.remaining > 0 {
            e.remaining -= 1;
            break;
        }
    }
    for e in &mut adj[to as usize] {
        if e.to == at && e.remaining > 0 {
            e.remaining -= 1;
            break;
        }
    }
    vert_use[at as usize] -= 1;
    vert_use[to as usize] -= 1;
    *total -= 1;
}

struct Cand {
    to: PointIx,
    remaining: u32,
    cross: f64,
    dot: f64,
}

/// Pick the next vertex from `cur`. Candidates are ordered double-edges
/// first; with an incoming direction and more than one choice, an
/// established winding side filters the candidates and the turn rule breaks
/// remaining ties (tighter turn on the right of travel, looser on the left).
fn choose_step(
    g: &FillGraph,
    adj: &[Vec<AdjEntry>],
    cur: PointIx,
    prev: Option<PointIx>,
    chirality: &mut Option<f64>,
) -> Option<PointIx> {
    let mut cands: Vec<Cand> = adj[cur as usize]
        .iter()
        .filter(|e| e.remaining > 0)
        .map(|e| Cand {
            to: e.to,
            remaining: e.remaining,
            cross: 0.0,
            dot: 0.0,
        })
        .collect();
    if cands.is_empty() {
        return None;
    }
    // Stable: insertion order survives among equal use counts.
    cands.sort_by_key(|c| std::cmp::Reverse(c.remaining));
    if cands.len() == 1 {
        return Some(cands[0].to);
    }
    let multi_choice = cands.len() >= 2;
    let Some(p) = prev else {
        return Some(cands[0].to);
    };
    let Some(v1) = geom::unit_toward(g.id(p), g.id(cur)) else {
        return Some(cands[0].to);
    };
    for c in &mut cands {
        if let Some(vn) = geom::unit_toward(g.id(cur), g.id(c.to)) {
            c.cross = geom::side(vn, v1);
            c.dot = vn.dot(v1);
        }
    }
    if let Some(s) = *chirality {
        let agrees = |c: &Cand| c.cross == 0.0 || (c.cross > 0.0) == (s > 0.0);
        let n_agree = cands.iter().filter(|c| agrees(c)).count();
        if n_agree > 0 && n_agree < cands.len() {
            cands.retain(|c| agrees(c));
        }
    }
    Some(pick(&cands, chirality, multi_choice))
}

fn pick(cands: &[Cand], chirality: &mut Option<f64>, multi_choice: bool) -> PointIx {
    let mut best = 0usize;
    for i in 1..cands.len() {
        let (a, b) = (&cands[best], &cands[i]);
        if b.remaining != a.remaining {
            // Already sorted descending; keep the earlier (higher) one.
            continue;
        }
        if a.cross > 0.0 && b.cross > 0.0 {
            // Both to the right of travel: tighter turn wins.
            if b.dot < a.dot {
                best = i;
            }
        } else if a.cross < 0.0 && b.cross < 0.0 {
            // Both to the left: looser turn wins.
            if b.dot > a.dot {
                best = i;
            }
        }
        // Opposite sides with no established winding: first candidate stands.
    }
    let chosen = &cands[best];
    if chirality.is_none() && multi_choice && chosen.remaining == 2 && chosen.cross != 0.0 {
        *chirality = Some(chosen.cross);
    }
    chosen.to
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(g: &mut FillGraph, x: f64, y: f64) {
        let p = |dx: f64, dy: f64| format!("{} {}", x + dx, y + dy);
        g.begin_polygon(&p(0.0, 0.0));
        g.add_edge(&p(0.0, 0.0), &p(1.0, 0.0));
        g.add_edge(&p(1.0, 0.0), &p(1.0, 1.0));
        g.add_edge(&p(1.0, 1.0), &p(0.0, 1.0));
        g.add_edge(&p(0.0, 1.0), &p(0.0, 0.0));
    }

    #[test]
    fn single_polygon_round_trips() {
        let mut g = FillGraph::new();
        square(&mut g, 0.0, 0.0);
        let r = merge_fill_polygons(&g);
        assert_eq!(r.merges, 0);
        assert_eq!(
            r.lines,
            vec!["N", "0 0 M", "1 0 L", "1 1 L", "0 1 L", "cp", "f"]
        );
    }

    #[test]
    fn touching_squares_merge_into_one_outline() {
        let mut g = FillGraph::new();
        square(&mut g, 0.0, 0.0);
        square(&mut g, 1.0, 0.0);
        let r = merge_fill_polygons(&g);
        assert_eq!(r.polygons, 2);
        assert_eq!(r.merges, 1);
        assert_eq!(
            r.lines,
            vec![
                "N", "0 0 M", "1 0 L", "2 0 L", "2 1 L", "1 1 L", "0 1 L", "cp", "f"
            ]
        );
    }

    #[test]
    fn row_of_three_merges_fully() {
        let mut g = FillGraph::new();
        square(&mut g, 0.0, 0.0);
        square(&mut g, 1.0, 0.0);
        square(&mut g, 2.0, 0.0);
        let r = merge_fill_polygons(&g);
        assert_eq!(r.merges, 2);
        // One M, one cp, one closed outline covering all surviving edges.
        let moves = r.lines.iter().filter(|l| l.ends_with(" M")).count();
        assert_eq!(moves, 1);
        assert_eq!(r.lines.iter().filter(|l| *l == "cp").count(), 1);
        assert_eq!(r.lines.last().unwrap(), "f");
    }

    #[test]
    fn separate_squares_stay_separate() {
        let mut g = FillGraph::new();
        square(&mut g, 0.0, 0.0);
        square(&mut g, 5.0, 0.0);
        let r = merge_fill_polygons(&g);
        assert_eq!(r.merges, 0);
        let moves = r.lines.iter().filter(|l| l.ends_with(" M")).count();
        assert_eq!(moves, 2);
        assert_eq!(r.lines.iter().filter(|l| *l == "cp").count(), 2);
    }

    #[test]
    fn self_touching_polygon_is_excluded_from_merging() {
        let mut g = FillGraph::new();
        // Out-and-back spike: edge (0 0)-(1 0) appears twice in one polygon.
        g.begin_polygon("0 0");
        g.add_edge("0 0", "1 0");
        g.add_edge("1 0", "0 0");
        // A clean square sharing the spike edge must not merge with it.
        g.begin_polygon("0 0");
        g.add_edge("0 0", "1 0");
        g.add_edge("1 0", "1 1");
        g.add_edge("1 1", "0 1");
        g.add_edge("0 1", "0 0");
        let r = merge_fill_polygons(&g);
        assert_eq!(r.merges, 0);
        assert_eq!(r.lines.last().unwrap(), "f");
        // Every traversal is consumed: the spike edge is pre-marked at two
        // uses and the square contributes its three unshared sides.
        let seg_count = r
            .lines
            .iter()
            .filter(|l| l.ends_with(" L") || *l == "cp")
            .count();
        assert_eq!(seg_count, 5);
    }

    #[test]
    fn empty_graph_emits_nothing() {
        let r = merge_fill_polygons(&FillGraph::new());
        assert!(r.lines.is_empty());
    }
}
