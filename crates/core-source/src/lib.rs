//! Source document model for EPS post-processing.
//!
//! Contract:
//! - Input: the full EPS text (7-bit ASCII by producer contract, line-oriented).
//! - Output: an ordered sequence of lines addressable by index, where each line
//!   remembers its own terminator, plus the document's majority line ending.
//! - Guarantees: concatenating every line's text and terminator reproduces the
//!   input byte-for-byte; a final line without a terminator stays unterminated.
//! - The reader performs no tokenization; classifying lines is `core-token`'s
//!   job and attributing them to blocks is `core-engine`'s.

use std::fmt;

/// Majority line ending of a document, used for every synthesized line.
/// Ties resolve CRLF > LF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEnding::Lf => "LF",
            LineEnding::Crlf => "CRLF",
        })
    }
}

/// Terminator actually observed after one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Lf,
    Crlf,
    /// Final line of the document with no trailing newline.
    Eof,
}

impl Terminator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Terminator::Lf => "\n",
            Terminator::Crlf => "\r\n",
            Terminator::Eof => "",
        }
    }
}

/// One input line: text without its terminator, plus the terminator itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub term: Terminator,
}

impl SourceLine {
    /// Append the line exactly as it appeared in the input.
    pub fn write_verbatim(&self, out: &mut String) {
        out.push_str(&self.text);
        out.push_str(self.term.as_str());
    }

    /// Append the line with a guaranteed terminator. Lines re-emitted inside a
    /// reconstructed block must not glue onto the following operator, so an
    /// unterminated final line falls back to the document ending.
    pub fn write_terminated(&self, out: &mut String, newline: LineEnding) {
        out.push_str(&self.text);
        match self.term {
            Terminator::Eof => out.push_str(newline.as_str()),
            t => out.push_str(t.as_str()),
        }
    }
}

/// Parsed document: lines in input order plus the majority ending.
#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<SourceLine>,
    newline: LineEnding,
}

impl Document {
    /// Split `input` into lines, preserving each terminator.
    pub fn parse(input: &str) -> Self {
        let bytes = input.as_bytes();
        let mut lines = Vec::new();
        let mut lf = 0usize;
        let mut crlf = 0usize;
        let mut start = 0usize;
        let mut i = 0usize;
        while i < bytes.len() {
            if bytes[i] == b'\n' {
                let (end, term) = if i > start && bytes[i - 1] == b'\r' {
                    crlf += 1;
                    (i - 1, Terminator::Crlf)
                } else {
                    lf += 1;
                    (i, Terminator::Lf)
                };
                lines.push(SourceLine {
                    text: input[start..end].to_string(),
                    term,
                });
                start = i + 1;
            }
            i += 1;
        }
        if start < bytes.len() {
            lines.push(SourceLine {
                text: input[start..].to_string(),
                term: Terminator::Eof,
            });
        }
        // Majority with precedence CRLF > LF for ties, mirroring the
        // normalizer convention used elsewhere in this workspace.
        let newline = if crlf >= lf && crlf > 0 {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        };
        Self { lines, newline }
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> &SourceLine {
        &self.lines[index]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Majority line ending; synthesized operator lines use this.
    pub fn newline(&self) -> LineEnding {
        self.newline
    }
}
