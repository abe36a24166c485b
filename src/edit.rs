//! Structural edits compiled to verified byte-span replacements.
//!
//! A [`BlockEdit`] names a block (by path or lines) and what to do with it.
//! Planning it against the current tree yields a [`TextEdit`]: a byte range,
//! the text expected there, and the replacement. Every edit is checked
//! against the expected before-text so a stale plan never lands.

use crate::block::{BlockError, BlockId, BlockTree, CodeBlock};
use crate::print::{body_indentation, closing_delimiter};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Byte-span replacement with before-text verification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "TextEdit does nothing until applied"]
pub struct TextEdit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    pub new_text: String,
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at bytes {byte_start}..{byte_end}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("byte offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("{path} changed on disk since it was loaded")]
    FileChanged { path: PathBuf },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl TextEdit {
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text, "")
    }

    /// Check the edit against `source`, returning the text it replaces.
    fn validate<'a>(&self, source: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > source.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: source.len(),
            });
        }
        for offset in [self.byte_start, self.byte_end] {
            if !source.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        let current = &source[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }
        Ok(current)
    }

    /// Return `source` with this edit applied.
    pub fn apply_to(&self, source: &str) -> Result<String, EditError> {
        let current = self.validate(source)?;
        let mut out =
            String::with_capacity(source.len() - current.len() + self.new_text.len());
        out.push_str(&source[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&source[self.byte_end..]);
        Ok(out)
    }

    /// Byte length change caused by the edit.
    pub fn shift(&self) -> isize {
        self.new_text.len() as isize - (self.byte_end - self.byte_start) as isize
    }
}

/// What an edit does to its target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditIntent {
    /// Insert new code inside the target, after its existing children
    Add,
    /// Replace the target block with new code
    Update,
}

/// An edit expressed against the block tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEdit {
    pub intent: EditIntent,
    pub target: Span,
    pub replacement: String,
}

/// A [`BlockEdit`] resolved against a specific tree.
#[derive(Debug, Clone)]
pub struct PlannedEdit {
    pub edit: TextEdit,
    /// Block the edit landed on
    pub target: BlockId,
    /// Old lines replaced or, for insertions, the line the text goes after
    pub start_line: usize,
    pub end_line: usize,
}

impl BlockEdit {
    pub fn update(target: Span, replacement: impl Into<String>) -> Self {
        Self {
            intent: EditIntent::Update,
            target,
            replacement: replacement.into(),
        }
    }

    pub fn add(target: Span, replacement: impl Into<String>) -> Self {
        Self {
            intent: EditIntent::Add,
            target,
            replacement: replacement.into(),
        }
    }

    /// Resolve the target in `tree` and compute the byte edit.
    ///
    /// An `Add` whose path does not exist yet targets the parent path.
    pub fn plan(&self, tree: &BlockTree) -> Result<PlannedEdit, BlockError> {
        let target = match (self.intent, tree.resolve_span(&self.target)) {
            (EditIntent::Add, Err(BlockError::PathNotFound { .. })) => {
                let parent = self
                    .target
                    .block_path
                    .as_deref()
                    .and_then(|path| path.split_last())
                    .map(|(_, parent)| parent)
                    .unwrap_or_default();
                tree.find_by_path(parent)?
            }
            (_, resolved) => resolved?,
        };

        let planned = match self.intent {
            EditIntent::Update => plan_update(tree, target, &self.replacement),
            EditIntent::Add => plan_add(tree, target, &self.replacement),
        };
        debug!(
            intent = ?self.intent,
            target = %target,
            bytes = ?(planned.edit.byte_start..planned.edit.byte_end),
            lines = ?(planned.start_line..=planned.end_line),
            "planned edit"
        );
        Ok(planned)
    }
}

fn plan_update(tree: &BlockTree, target: BlockId, replacement: &str) -> PlannedEdit {
    let block = tree.block(target);
    let old_text = tree.to_text(target);
    let old_text = &old_text[block.leading_text.len()..];
    let new_text = replacement
        .trim_start_matches(['\n', '\r'])
        .trim_start_matches([' ', '\t'])
        .trim_end();

    PlannedEdit {
        edit: TextEdit::new(block.start_byte, block.end_byte, new_text, old_text),
        target,
        start_line: block.start_line,
        end_line: block.end_line,
    }
}

fn plan_add(tree: &BlockTree, target: BlockId, replacement: &str) -> PlannedEdit {
    let block = tree.block(target);
    let closing = closing_delimiter(tree, target).map(|id| tree.block(id));

    let (offset, line) = match closing {
        Some(closing) => (
            closing.start_byte - closing.leading_text.len(),
            insertion_line(tree, target, closing),
        ),
        None => (block.end_byte, block.end_line),
    };

    let indent = body_indentation(tree, target);
    let mut new_text = format!("\n\n{}", reindent(replacement, &indent));
    if let Some(closing) = closing {
        if !closing.leading_text.contains('\n') {
            new_text.push('\n');
            new_text.push_str(block.indentation());
        }
    }

    PlannedEdit {
        edit: TextEdit::insert(offset, new_text),
        target,
        start_line: line,
        end_line: line,
    }
}

/// Line the inserted text follows: the end of whatever precedes the
/// closing delimiter.
fn insertion_line(tree: &BlockTree, id: BlockId, closing: &CodeBlock) -> usize {
    let before = closing.start_byte - closing.leading_text.len();
    tree.iter_subtree(id)
        .filter(|(_, b)| b.end_byte == before && b.start_byte < before)
        .map(|(_, b)| b.end_line)
        .last()
        .unwrap_or(tree.block(id).start_line)
}

/// Strip the common indentation of `text` and indent every non-blank line
/// with `indent`.
fn reindent(text: &str, indent: &str) -> String {
    let text = text.trim_matches(['\n', '\r']).trim_end();
    let common = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", &line[common..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String, EditError> {
    Ok(String::from_utf8(fs::read(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::parse_blocks;
    use crate::lang::Language;

    const SOURCE: &str = "class Foo {\n    void bar() {\n        run();\n    }\n}\n";

    #[test]
    fn verification_exact_and_hash() {
        let verify = EditVerification::ExactMatch("hello world".to_string());
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("hello"));

        let verify = EditVerification::Hash(xxh3_64(b"hello world"));
        assert!(verify.matches("hello world"));
        assert!(!verify.matches("goodbye world"));

        assert!(matches!(
            EditVerification::from_text(&"x".repeat(2000)),
            EditVerification::Hash(_)
        ));
    }

    #[test]
    fn apply_to_splices_text() {
        let edit = TextEdit::new(0, 5, "HELLO", "hello");
        assert_eq!(edit.apply_to("hello world").unwrap(), "HELLO world");
        assert_eq!(edit.shift(), 0);
    }

    #[test]
    fn apply_to_rejects_bad_ranges() {
        let edit = TextEdit::new(5, 20, "x", "");
        assert!(matches!(
            edit.apply_to("hello world"),
            Err(EditError::InvalidByteRange { .. })
        ));

        let edit = TextEdit::new(10, 5, "x", "");
        assert!(matches!(
            edit.apply_to("hello world"),
            Err(EditError::InvalidByteRange { .. })
        ));

        let edit = TextEdit::new(1, 2, "x", "");
        assert!(matches!(
            edit.apply_to("é"),
            Err(EditError::NotCharBoundary { offset: 1 })
        ));
    }

    #[test]
    fn apply_to_rejects_changed_before_text() {
        let edit = TextEdit::new(0, 5, "HELLO", "howdy");
        assert!(matches!(
            edit.apply_to("hello world"),
            Err(EditError::BeforeTextMismatch { .. })
        ));
    }

    #[test]
    fn update_replaces_block_bytes() {
        let tree = parse_blocks(SOURCE, Language::Java).unwrap();
        let target = Span::lines(0, 0).with_path(vec!["Foo".into(), "bar".into()]);
        let edit = BlockEdit::update(target, "    void bar() {\n        stop();\n    }\n");
        let planned = edit.plan(&tree).unwrap();

        assert_eq!((planned.start_line, planned.end_line), (1, 3));
        let updated = planned.edit.apply_to(SOURCE).unwrap();
        assert_eq!(
            updated,
            "class Foo {\n    void bar() {\n        stop();\n    }\n}\n"
        );
    }

    #[test]
    fn add_inserts_before_closing_brace() {
        let tree = parse_blocks(SOURCE, Language::Java).unwrap();
        let target = Span::lines(0, 0).with_path(vec!["Foo".into(), "baz".into()]);
        let edit = BlockEdit::add(target, "void baz() {\n    walk();\n}");
        let planned = edit.plan(&tree).unwrap();

        assert_eq!(tree.block(planned.target).label.as_deref(), Some("Foo"));
        assert_eq!(planned.start_line, 3);
        let updated = planned.edit.apply_to(SOURCE).unwrap();
        assert_eq!(
            updated,
            "class Foo {\n    void bar() {\n        run();\n    }\n\n    void baz() {\n        walk();\n    }\n}\n"
        );
    }

    #[test]
    fn add_into_empty_body_breaks_line() {
        let source = "class Foo {}\n";
        let tree = parse_blocks(source, Language::Java).unwrap();
        let edit = BlockEdit::add(Span::from_path(vec!["Foo".into()]), "int x;");
        let updated = edit.plan(&tree).unwrap().edit.apply_to(source).unwrap();
        assert_eq!(updated, "class Foo {\n\n    int x;\n}\n");
    }

    #[test]
    fn add_to_python_function_appends_at_end() {
        let source = "def f():\n    a = 1\n";
        let tree = parse_blocks(source, Language::Python).unwrap();
        let edit = BlockEdit::add(Span::from_path(vec!["f".into()]), "return a");
        let updated = edit.plan(&tree).unwrap().edit.apply_to(source).unwrap();
        assert_eq!(updated, "def f():\n    a = 1\n\n    return a\n");
    }

    #[test]
    fn reindent_strips_common_prefix() {
        let text = "\n        a();\n\n            b();\n";
        assert_eq!(reindent(text, "  "), "  a();\n\n      b();");
    }

    #[test]
    fn write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.java");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(read_source(&path).unwrap(), "new");
    }
}
