//! Block state machine.
//!
//! Four states drive the partition of the post-prolog stream:
//! Prolog -> Idle -> Prefix -> Content, with the commit on block close
//! (Analyzed) folded into `finish_block`. Invariants:
//! * Every input line is emitted verbatim outside blocks or attributed to
//!   exactly one block (prefix line, passthrough content line, or edge
//!   contribution).
//! * A `GR` balancing the outermost `GS` terminates the block; deeper `GR`s
//!   are appended to whichever section is accumulating.
//! * `%AXGBegin`..`%AXGEnd` regions pass through untokenized.
//! * Unrecognized structure is tolerated, never an error: the input comes
//!   from a known-shape producer and this is a post-processor, not a
//!   validator.

use core_source::Document;
use core_token::{Token, classify};
use tracing::{debug, trace};

use crate::block::Registry;
use crate::emit::write_block;
use crate::{CleanStats, Options};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prolog,
    Idle,
    Prefix,
    Content,
}

/// One recognized path segment, replayed into a graph at block commit once
/// the block's stroke/fill nature is known.
#[derive(Debug)]
struct Seg {
    from: String,
    to: String,
    starts_path: bool,
}

#[derive(Debug, Default)]
struct ContentAcc {
    /// Every content line index in input order (the opaque fallback).
    full: Vec<usize>,
    /// Line indices re-emitted verbatim after reconstruction.
    passthrough: Vec<usize>,
    segs: Vec<Seg>,
    is_fill: bool,
    bad: bool,
    last_move: Option<String>,
    last_point: Option<String>,
    prev_was_cp: bool,
}

pub(crate) struct Machine<'d> {
    doc: &'d Document,
    opts: &'d Options,
    out: String,
    stats: CleanStats,
    state: State,
    registry: Registry,
    prev_prefix: Option<String>,
    prefix: String,
    has_line_cap: bool,
    is_dash: bool,
    nesting: u32,
    in_axg: bool,
    content: ContentAcc,
}

impl<'d> Machine<'d> {
    pub fn new(doc: &'d Document, opts: &'d Options) -> Self {
        Self {
            doc,
            opts,
            out: String::new(),
            stats: CleanStats {
                lines: doc.len(),
                ..CleanStats::default()
            },
            state: State::Prolog,
            registry: Registry::default(),
            prev_prefix: None,
            prefix: String::new(),
            has_line_cap: false,
            is_dash: false,
            nesting: 0,
            in_axg: false,
            content: ContentAcc::default(),
        }
    }

    pub fn run(mut self) -> (String, CleanStats) {
        let mut i = 0;
        while i < self.doc.len() {
            i = match self.state {
                State::Prolog => self.prolog_line(i),
                State::Idle => self.idle_line(i),
                State::Prefix => self.prefix_line(i),
                State::Content => self.content_line(i),
            };
        }
        // End of input without a trailer marker: commit whatever is open and
        // flush exactly as the trailer path does.
        if matches!(self.state, State::Prefix | State::Content) {
            self.finish_block();
        }
        self.flush_all();
        debug!(
            target: "engine.parse",
            lines = self.stats.lines,
            blocks = self.stats.blocks,
            prefixes = self.stats.prefixes,
            discarded = self.stats.blocks_discarded,
            "parse_complete"
        );
        (self.out, self.stats)
    }

    fn prolog_line(&mut self, i: usize) -> usize {
        let line = self.doc.line(i);
        line.write_verbatim(&mut self.out);
        if line.text == "%%EndPageSetup" {
            self.state = State::Idle;
        }
        i + 1
    }

    fn idle_line(&mut self, i: usize) -> usize {
        let line = self.doc.line(i);
        match classify(&line.text) {
            Token::Gsave => {
                self.begin_block();
                i + 1
            }
            Token::Trailer => {
                self.flush_all();
                for j in i..self.doc.len() {
                    self.doc.line(j).write_verbatim(&mut self.out);
                }
                self.doc.len()
            }
            // Stray grestore between blocks: dropped.
            Token::Grestore => i + 1,
            _ => {
                line.write_verbatim(&mut self.out);
                i + 1
            }
        }
    }

    fn begin_block(&mut self) {
        self.prefix.clear();
        self.has_line_cap = false;
        self.is_dash = false;
        self.nesting = 0;
        self.in_axg = false;
        self.content = ContentAcc::default();
        self.state = State::Prefix;
    }

    fn push_prefix(&mut self, text: &str) {
        self.prefix.push_str(text);
        self.prefix.push('\n');
    }

    fn prefix_line(&mut self, i: usize) -> usize {
        let doc = self.doc;
        let text = &doc.line(i).text;
        if self.in_axg {
            self.push_prefix(text);
            if matches!(classify(text), Token::AxgEnd) {
                self.in_axg = false;
            }
            return i + 1;
        }
        match classify(text) {
            Token::Gsave => {
                self.nesting += 1;
                self.push_prefix(text);
            }
            Token::Grestore => {
                if self.nesting == 0 {
                    // Block closed before any newpath: empty content.
                    self.finish_block();
                } else {
                    self.nesting -= 1;
                    self.push_prefix(text);
                }
            }
            Token::Newpath => {
                self.state = State::Content;
            }
            Token::AxgBegin => {
                self.in_axg = true;
                self.push_prefix(text);
            }
            Token::SetLineCap => {
                self.has_line_cap = true;
                self.push_prefix(text);
            }
            Token::SetDash => {
                self.is_dash = true;
                self.push_prefix(text);
            }
            Token::LineJoin => {
                // Normalize absent linecap state so otherwise-identical
                // prefixes group together. Dash mode suppresses the synthetic
                // line unless the compatibility option turns it back on.
                if !self.has_line_cap && (!self.is_dash || self.opts.dash_linecap) {
                    self.push_prefix("1 setlinecap");
                    self.has_line_cap = true;
                }
                self.push_prefix(text);
            }
            _ => self.push_prefix(text),
        }
        i + 1
    }

    /// Record a content line on both the full and the passthrough list.
    fn record_passthrough(&mut self, i: usize) {
        self.content.full.push(i);
        self.content.passthrough.push(i);
    }

    fn content_line(&mut self, i: usize) -> usize {
        let doc = self.doc;
        let text = &doc.line(i).text;
        if self.in_axg {
            self.record_passthrough(i);
            if matches!(classify(text), Token::AxgEnd) {
                self.in_axg = false;
            }
            self.content.prev_was_cp = false;
            return i + 1;
        }
        let tok = classify(text);
        let mut next = i + 1;
        match tok {
            Token::MoveTo(from) => {
                let follow = if i + 1 < doc.len() {
                    Some(classify(&doc.line(i + 1).text))
                } else {
                    None
                };
                if let Some(Token::LineTo(to)) = follow {
                    self.content.full.push(i);
                    self.content.full.push(i + 1);
                    self.content.segs.push(Seg {
                        from: from.to_string(),
                        to: to.to_string(),
                        starts_path: true,
                    });
                    self.content.last_move = Some(from.to_string());
                    self.content.last_point = Some(to.to_string());
                    next = i + 2;
                } else {
                    // Moveto without its lineto: keep the line verbatim
                    // rather than guessing.
                    self.record_passthrough(i);
                }
            }
            Token::LineTo(to) => {
                if let Some(prev) = self.content.last_point.take() {
                    self.content.full.push(i);
                    self.content.segs.push(Seg {
                        from: prev,
                        to: to.to_string(),
                        starts_path: false,
                    });
                    self.content.last_point = Some(to.to_string());
                } else {
                    self.record_passthrough(i);
                }
            }
            Token::ClosePath => {
                let last_move = self.content.last_move.clone();
                match (self.content.last_point.take(), last_move) {
                    (Some(p), Some(m)) => {
                        self.content.full.push(i);
                        self.content.segs.push(Seg {
                            from: p,
                            to: m.clone(),
                            starts_path: false,
                        });
                        self.content.last_point = Some(m);
                    }
                    (p, _) => {
                        self.content.last_point = p;
                        self.record_passthrough(i);
                    }
                }
            }
            Token::Fill => {
                self.content.is_fill = true;
                self.content.full.push(i);
                // An f straight after cp is regenerated by the merger; any
                // other f is preserved on the passthrough list.
                if self.opts.combine_areas && !self.content.prev_was_cp {
                    self.content.passthrough.push(i);
                }
            }
            // Stroke operators are elided; the tracer issues its own.
            Token::Stroke => {}
            Token::Rect => {
                if self.opts.remove_boxes {
                    self.content.bad = true;
                } else {
                    self.record_passthrough(i);
                }
            }
            Token::Clip => self.fold_clip(i),
            Token::Gsave => {
                self.nesting += 1;
                self.record_passthrough(i);
            }
            Token::Grestore => {
                if self.nesting == 0 {
                    self.finish_block();
                } else {
                    self.nesting -= 1;
                    self.record_passthrough(i);
                }
            }
            Token::AxgBegin => {
                self.in_axg = true;
                self.record_passthrough(i);
            }
            _ => self.record_passthrough(i),
        }
        self.content.prev_was_cp = matches!(tok, Token::ClosePath);
        next
    }

    /// Fold the accumulated path and the clip line into the prefix: the clip
    /// path becomes rendering state and the block is re-keyed accordingly.
    /// The rectangle-discard flag survives the reset: a rectangle used as a
    /// clip path still condemns the whole block under `remove_boxes`.
    fn fold_clip(&mut self, i: usize) {
        let doc = self.doc;
        let full = std::mem::take(&mut self.content.full);
        for ix in full {
            self.push_prefix(&doc.line(ix).text);
        }
        self.push_prefix(&doc.line(i).text);
        let bad = self.content.bad;
        self.content = ContentAcc::default();
        self.content.bad = bad;
        trace!(target: "engine.parse", line = i, "clip path folded into prefix");
    }

    /// Commit the accumulated block under its prefix (Analyzed).
    fn finish_block(&mut self) {
        self.state = State::Idle;
        self.in_axg = false;
        let acc = std::mem::take(&mut self.content);
        let prefix = std::mem::take(&mut self.prefix);
        if acc.bad {
            self.stats.blocks_discarded += 1;
            trace!(target: "engine.parse", "rectangle block discarded");
            return;
        }
        self.stats.blocks += 1;
        if !self.registry.contains(&prefix) {
            self.stats.prefixes += 1;
        }
        let rec = self.registry.entry(&prefix);
        if acc.is_fill && !self.opts.combine_areas {
            // Fills we are not asked to merge stay opaque: the full content
            // replaces the passthrough list and the edges are dropped.
            rec.passthrough.extend_from_slice(&acc.full);
        } else {
            rec.passthrough.extend_from_slice(&acc.passthrough);
            if acc.is_fill {
                for seg in &acc.segs {
                    if seg.starts_path {
                        rec.fill.begin_polygon(&seg.from);
                    }
                    rec.fill.add_edge(&seg.from, &seg.to);
                }
                rec.fill.end_path();
            } else {
                for seg in &acc.segs {
                    rec.stroke.add_segment(&seg.from, &seg.to);
                }
            }
        }
        if self.opts.group_soft && self.prev_prefix.as_deref().is_some_and(|p| p != prefix) {
            self.flush_except(&prefix);
            self.stats.soft_flushes += 1;
        }
        self.prev_prefix = Some(prefix);
    }

    fn flush_all(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        for (prefix, rec) in self.registry.drain() {
            write_block(&mut self.out, self.doc, &prefix, &rec, &mut self.stats);
        }
        trace!(target: "engine.flush", "registry flushed");
    }

    /// Soft-grouping flush: write out everything accumulated so far except
    /// the current block, which survives with its state intact.
    fn flush_except(&mut self, keep: &str) {
        for (prefix, rec) in self.registry.drain_except(keep) {
            write_block(&mut self.out, self.doc, &prefix, &rec, &mut self.stats);
        }
    }
}
