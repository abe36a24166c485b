//! Line spans into a file and their re-addressing after edits.

use crate::block::{BlockId, BlockTree};
use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt;
use std::sync::LazyLock;

/// Line suffix of a span id, e.g. `_L10_L12`.
static LINE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_L(\d+)_L(\d+)$").expect("LINE_SUFFIX regex should compile"));

/// A region of a file: inclusive 0-indexed lines, optionally tied to the
/// block path it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_path: Option<Vec<String>>,
}

impl Span {
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            block_path: None,
        }
    }

    /// Span addressed only by path; its lines are filled in on resolution.
    pub fn from_path(path: Vec<String>) -> Self {
        Self {
            start_line: 0,
            end_line: 0,
            block_path: Some(path),
        }
    }

    /// Span of a block, carrying its path when every ancestor is labeled.
    pub fn of_block(tree: &BlockTree, id: BlockId) -> Self {
        let block = tree.block(id);
        Self {
            start_line: block.start_line,
            end_line: block.end_line,
            block_path: tree.path_of(id),
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.block_path = Some(path);
        self
    }

    pub fn overlaps(&self, start_line: usize, end_line: usize) -> bool {
        self.start_line <= end_line && start_line <= self.end_line
    }

    /// Identifier of the form `Foo.bar_L10_L12`.
    pub fn id(&self) -> SpanId {
        SpanId {
            path: self.block_path.clone().unwrap_or_default(),
            lines: Some((self.start_line, self.end_line)),
        }
    }

    /// Build a span from an identifier produced by [`Span::id`].
    pub fn parse_id(id: &str) -> Self {
        let id = SpanId::parse(id);
        let (start_line, end_line) = id.lines.unwrap_or((0, 0));
        Self {
            start_line,
            end_line,
            block_path: (!id.path.is_empty()).then_some(id.path),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Textual span identifier: a dotted block path with an optional
/// `_L<start>_L<end>` line suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanId {
    pub path: Vec<String>,
    pub lines: Option<(usize, usize)>,
}

impl SpanId {
    pub fn parse(id: &str) -> Self {
        let (path, lines) = match LINE_SUFFIX.captures(id) {
            Some(caps) => {
                let start = caps[1].parse().ok();
                let end = caps[2].parse().ok();
                let prefix = &id[..caps.get(0).map_or(id.len(), |m| m.start())];
                (prefix, start.zip(end))
            }
            None => (id, None),
        };
        let path = path
            .split('.')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        Self { path, lines }
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("."))?;
        if let Some((start, end)) = self.lines {
            write!(f, "_L{start}_L{end}")?;
        }
        Ok(())
    }
}

/// Result of re-addressing one span after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readdressed {
    /// The span lies before the edited region
    Unchanged,
    /// The span lies after the edited region and moved by the line delta
    Shifted(Span),
    /// The span overlaps the edited region; its lines can no longer be
    /// trusted and it must be re-resolved by path
    Stale,
}

/// An edit that replaced old lines `[start_line, end_line]` and changed the
/// file's line count by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEdit {
    pub start_line: usize,
    pub end_line: usize,
    pub delta: isize,
}

impl LineEdit {
    pub fn new(start_line: usize, end_line: usize, delta: isize) -> Self {
        Self {
            start_line,
            end_line,
            delta,
        }
    }

    /// Spans starting on or after the edit's last line move by `delta`;
    /// other spans overlapping the edit are stale.
    pub fn readdress(&self, span: &Span) -> Readdressed {
        if span.start_line >= self.end_line {
            let mut shifted = span.clone();
            shifted.start_line = shift(span.start_line, self.delta);
            shifted.end_line = shift(span.end_line, self.delta);
            Readdressed::Shifted(shifted)
        } else if span.overlaps(self.start_line, self.end_line) {
            Readdressed::Stale
        } else {
            Readdressed::Unchanged
        }
    }

    /// Re-address a batch of spans of the same file against this one edit.
    ///
    /// Every span is judged against pre-edit line numbers, so the batch
    /// never mixes old and new numbering.
    pub fn readdress_all(&self, spans: &[Span]) -> Vec<Readdressed> {
        spans.iter().map(|span| self.readdress(span)).collect()
    }
}

fn shift(line: usize, delta: isize) -> usize {
    line.saturating_add_signed(delta)
}

/// Lines added and removed between two versions of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDelta {
    pub added: usize,
    pub removed: usize,
}

impl LineDelta {
    pub fn between(old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        diff.iter_all_changes()
            .fold(Self::default(), |mut delta, change| {
                match change.tag() {
                    ChangeTag::Insert => delta.added += 1,
                    ChangeTag::Delete => delta.removed += 1,
                    ChangeTag::Equal => {}
                }
                delta
            })
    }

    /// Net change in line count.
    pub fn delta(&self) -> isize {
        self.added as isize - self.removed as isize
    }
}
