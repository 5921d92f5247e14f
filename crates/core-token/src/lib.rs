//! Line classification for the restricted EPS dialect.
//!
//! Converts one post-prolog line into a `Token`. This keeps suffix/exact
//! matching out of the block state machine so the parser branches on an enum
//! instead of scattering string probes.
//!
//! Constraints:
//! * Pure classification, no side effects, no allocation.
//! * Case-sensitive and whitespace-sensitive, exact matches before suffix
//!   rules, `%AXG` region markers by prefix.
//! * Anything unrecognized is `Token::Other`; the caller preserves such lines
//!   verbatim. Classification never fails.

/// Token kinds of the recognized dialect. `MoveTo`/`LineTo` carry the point
/// id: the coordinate text with the operator letter and the whitespace before
/// it stripped (`"123 456 M"` -> `"123 456"`). The id is a borrowed slice of
/// the input line, so equality stays byte-equality on the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `GS`: gsave, block start.
    Gsave,
    /// `GR`: grestore, block end.
    Grestore,
    /// `N`: newpath, prefix/content boundary.
    Newpath,
    /// `cp`: closepath.
    ClosePath,
    /// `f`: fill.
    Fill,
    /// `S`: stroke.
    Stroke,
    /// `clip`: set current path as clip.
    Clip,
    /// `%%EndPageSetup`: end of prolog.
    EndPageSetup,
    /// `%%Trailer`: start of trailer.
    Trailer,
    /// Suffix `M`: moveto; carries the point id.
    MoveTo(&'a str),
    /// Suffix `L`: lineto; carries the point id.
    LineTo(&'a str),
    /// Suffix `re`: rectangle.
    Rect,
    /// Suffix `setlinecap`.
    SetLineCap,
    /// Suffix `setdash`.
    SetDash,
    /// Suffix `LJ`: linejoin.
    LineJoin,
    /// Prefix `%AXGBegin`: opens a raw bitmap passthrough region.
    AxgBegin,
    /// Prefix `%AXGEnd`: closes a raw bitmap passthrough region.
    AxgEnd,
    /// Opaque passthrough.
    Other,
}

/// Classify one line. Exact operator matches first, then region markers, then
/// suffix rules ordered so that multi-character suffixes win over their own
/// tails (`LJ` before `L`).
pub fn classify(line: &str) -> Token<'_> {
    match line {
        "GS" => return Token::Gsave,
        "GR" => return Token::Grestore,
        "N" => return Token::Newpath,
        "cp" => return Token::ClosePath,
        "f" => return Token::Fill,
        "S" => return Token::Stroke,
        "clip" => return Token::Clip,
        "%%EndPageSetup" => return Token::EndPageSetup,
        "%%Trailer" => return Token::Trailer,
        _ => {}
    }
    if line.starts_with("%AXGBegin") {
        return Token::AxgBegin;
    }
    if line.starts_with("%AXGEnd") {
        return Token::AxgEnd;
    }
    if line.ends_with("setlinecap") {
        return Token::SetLineCap;
    }
    if line.ends_with("setdash") {
        return Token::SetDash;
    }
    if line.ends_with("LJ") {
        return Token::LineJoin;
    }
    if line.ends_with("re") {
        return Token::Rect;
    }
    if let Some(id) = operand(line, 'M') {
        return Token::MoveTo(id);
    }
    if let Some(id) = operand(line, 'L') {
        return Token::LineTo(id);
    }
    Token::Other
}

/// Strip a trailing single-letter operator and the whitespace before it.
/// Returns `None` when nothing precedes the operator; such a line is opaque.
fn operand(line: &str, op: char) -> Option<&str> {
    let head = line.strip_suffix(op)?;
    let id = head.trim_end();
    if id.is_empty() { None } else { Some(id) }
}
