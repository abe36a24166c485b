//! Per-file editing state owned by the caller.
//!
//! A [`FileContext`] holds one file's current text and block tree together
//! with the spans a collaborator still refers to. Applying an edit re-parses
//! the file and re-addresses every outstanding span in one batch, so callers
//! never see a mix of old and new line numbers.

use crate::block::{BlockError, BlockId, BlockTree, Category};
use crate::edit::{read_source, write_atomic, BlockEdit, EditError};
use crate::lang::Language;
use crate::pool::with_parser;
use crate::print::{print_by_spans, print_for_add, SpanMarker};
use crate::span::{LineDelta, LineEdit, Readdressed, Span};
use crate::ts::{introduced_errors, ErrorNode, TreeSitterError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

/// A span the caller still intends to use, with its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingSpan {
    pub span: Span,
    /// Set when an edit overlapped the span and it has no path to recover by
    pub stale: bool,
}

/// Summary of one applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Path of the block the edit landed on, in the pre-edit tree
    pub target_path: Option<Vec<String>>,
    pub line_edit: LineEdit,
    pub delta: LineDelta,
    pub shifted: usize,
    /// Overlapping spans recovered through their block path
    pub reresolved: usize,
    /// Overlapping spans left stale
    pub stale: usize,
}

#[derive(Debug, Clone)]
pub struct FileContext {
    path: PathBuf,
    language: Language,
    source: String,
    tree: BlockTree,
    errors: Vec<ErrorNode>,
    spans: Vec<OutstandingSpan>,
    /// Hash of the file as last read from or written to disk
    disk_hash: Option<u64>,
}

impl FileContext {
    /// Build a context for in-memory `source`, to be saved at `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        language: Language,
        source: impl Into<String>,
    ) -> Result<Self, BlockError> {
        let source = source.into();
        let (tree, errors) = parse(&source, language)?;
        let path = path.into();
        if !errors.is_empty() {
            warn!(
                path = %path.display(),
                errors = errors.len(),
                "source has syntax errors"
            );
        }
        Ok(Self {
            path,
            language,
            source,
            tree,
            errors,
            spans: Vec::new(),
            disk_hash: None,
        })
    }

    /// Read and parse a file, picking the language from its extension.
    pub fn load(path: &Path) -> Result<Self, BlockError> {
        let language = Language::from_path(path).ok_or_else(|| {
            TreeSitterError::UnsupportedLanguage {
                name: path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            }
        })?;
        let source = read_source(path)?;
        let disk_hash = xxh3_64(source.as_bytes());
        let mut context = Self::new(path, language, source)?;
        context.disk_hash = Some(disk_hash);
        debug!(path = %path.display(), %language, blocks = context.tree.len(), "loaded file");
        Ok(context)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    /// Syntax errors in the current source.
    pub fn errors(&self) -> &[ErrorNode] {
        &self.errors
    }

    pub fn spans(&self) -> &[OutstandingSpan] {
        &self.spans
    }

    /// xxh3 hash of the current source.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(self.source.as_bytes())
    }

    /// Whether the file on disk is still the one this context last read or
    /// wrote. Contexts never read from disk always match.
    pub fn matches_disk(&self) -> Result<bool, BlockError> {
        let Some(expected) = self.disk_hash else {
            return Ok(true);
        };
        let on_disk = read_source(&self.path)?;
        Ok(xxh3_64(on_disk.as_bytes()) == expected)
    }

    /// Start tracking `span`; returns its index in [`spans`](Self::spans).
    pub fn track(&mut self, span: Span) -> usize {
        self.spans.push(OutstandingSpan { span, stale: false });
        self.spans.len() - 1
    }

    /// Track the span of the block at `path`.
    pub fn track_path<S: AsRef<str>>(&mut self, path: &[S]) -> Result<usize, BlockError> {
        let id = self.tree.find_by_path(path)?;
        Ok(self.track(Span::of_block(&self.tree, id)))
    }

    pub fn clear_spans(&mut self) {
        self.spans.clear();
    }

    /// Resolve a tracked span in the current tree.
    ///
    /// Stale spans only resolve through their block path.
    pub fn resolve(&self, tracked: &OutstandingSpan) -> Result<BlockId, BlockError> {
        let span = &tracked.span;
        match (&span.block_path, tracked.stale) {
            (Some(path), _) => self.tree.find_by_path(path),
            (None, true) => Err(BlockError::StaleSpan {
                start_line: span.start_line,
                end_line: span.end_line,
            }),
            (None, false) => self.tree.find_block_with_span(span),
        }
    }

    /// Excerpt of the file showing every fresh outstanding span.
    pub fn excerpt(&self, marker: SpanMarker) -> Result<String, BlockError> {
        let spans: Vec<Span> = self
            .spans
            .iter()
            .filter(|tracked| !tracked.stale)
            .map(|tracked| tracked.span.clone())
            .collect();
        print_by_spans(&self.tree, &spans, marker)
    }

    /// Excerpt showing where code would be added inside the block at
    /// `target`.
    pub fn excerpt_for_add(&self, target: &Span, placeholder: &str) -> Result<String, BlockError> {
        let id = self.tree.resolve_span(target)?;
        Ok(print_for_add(&self.tree, id, placeholder))
    }

    /// Apply `edit`, re-parse, and re-address every outstanding span.
    ///
    /// The edit is rejected, leaving the context untouched, when it does
    /// not match the current text or when it introduces syntax errors.
    pub fn apply(&mut self, edit: &BlockEdit) -> Result<EditOutcome, BlockError> {
        let planned = edit.plan(&self.tree)?;
        let new_source = planned.edit.apply_to(&self.source)?;
        let (new_tree, new_errors) = parse(&new_source, self.language)?;

        let introduced = introduced_errors(
            &self.errors,
            &new_errors,
            planned.edit.byte_end,
            planned.edit.shift(),
        );
        if !introduced.is_empty() {
            warn!(
                path = %self.path.display(),
                count = introduced.len(),
                line = introduced[0].start_point.row,
                "rejecting edit that introduces syntax errors"
            );
            return Err(BlockError::IntroducedSyntaxErrors {
                count: introduced.len(),
            });
        }

        let delta = LineDelta::between(&self.source, &new_source);
        let line_edit = LineEdit::new(planned.start_line, planned.end_line, delta.delta());
        let target_path = self.tree.path_of(planned.target);

        let batch: Vec<Span> = self.spans.iter().map(|t| t.span.clone()).collect();
        let results = line_edit.readdress_all(&batch);

        let (mut shifted, mut reresolved, mut stale) = (0, 0, 0);
        for (tracked, result) in self.spans.iter_mut().zip(results) {
            match result {
                Readdressed::Unchanged => {}
                Readdressed::Shifted(span) => {
                    tracked.span = span;
                    shifted += 1;
                }
                Readdressed::Stale => match reresolve(&new_tree, &tracked.span) {
                    Some(span) => {
                        tracked.span = span;
                        tracked.stale = false;
                        reresolved += 1;
                    }
                    None => {
                        tracked.stale = true;
                        stale += 1;
                    }
                },
            }
        }
        if stale > 0 {
            warn!(
                path = %self.path.display(),
                stale,
                "spans overlap the edit and must be re-resolved"
            );
        }

        self.source = new_source;
        self.tree = new_tree;
        self.errors = new_errors;
        debug!(
            path = %self.path.display(),
            added = delta.added,
            removed = delta.removed,
            shifted,
            reresolved,
            stale,
            "applied edit"
        );

        Ok(EditOutcome {
            target_path,
            line_edit,
            delta,
            shifted,
            reresolved,
            stale,
        })
    }

    /// Write the current source to disk atomically.
    ///
    /// Fails with [`EditError::FileChanged`] if the file was modified by
    /// someone else since it was loaded.
    pub fn save(&mut self) -> Result<(), BlockError> {
        if !self.matches_disk()? {
            return Err(EditError::FileChanged {
                path: self.path.clone(),
            }
            .into());
        }
        write_atomic(&self.path, &self.source)?;
        self.disk_hash = Some(self.fingerprint());
        debug!(path = %self.path.display(), bytes = self.source.len(), "saved file");
        Ok(())
    }

    /// Number of blocks the builder had to contain as syntax errors.
    pub fn error_block_count(&self) -> usize {
        self.tree
            .iter_preorder()
            .filter(|(_, block)| block.category == Category::Error)
            .count()
    }
}

/// Fresh span for a stale one, found through its block path.
fn reresolve(tree: &BlockTree, span: &Span) -> Option<Span> {
    let path = span.block_path.as_ref()?;
    let id = tree.find_by_path(path).ok()?;
    Some(Span::of_block(tree, id).with_path(path.clone()))
}

fn parse(source: &str, language: Language) -> Result<(BlockTree, Vec<ErrorNode>), BlockError> {
    with_parser(language, |parser| {
        let parsed = parser.parse_with_source(source)?;
        Ok::<_, BlockError>((parsed.to_blocks()?, parsed.error_nodes()))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"class Foo {
    void bar() {
        run();
    }

    void baz() {
        walk();
    }
}
"#;

    fn context() -> FileContext {
        FileContext::new("Foo.java", Language::Java, SOURCE).unwrap()
    }

    #[test]
    fn tracks_spans_by_path() {
        let mut ctx = context();
        let index = ctx.track_path(&["Foo", "baz"]).unwrap();
        let tracked = &ctx.spans()[index];
        assert_eq!((tracked.span.start_line, tracked.span.end_line), (5, 7));
        assert_eq!(ctx.resolve(tracked).unwrap(), ctx.tree().find_by_path(&["Foo", "baz"]).unwrap());
    }

    #[test]
    fn update_shifts_later_spans() {
        let mut ctx = context();
        ctx.track_path(&["Foo", "baz"]).unwrap();
        let line_only = ctx.track(Span::lines(6, 6));

        let edit = BlockEdit::update(
            Span::from_path(vec!["Foo".into(), "bar".into()]),
            "void bar() {\n        run();\n        run();\n    }",
        );
        let outcome = ctx.apply(&edit).unwrap();

        assert_eq!(outcome.delta.delta(), 1);
        assert_eq!(outcome.shifted, 2);
        assert_eq!(outcome.stale, 0);
        assert_eq!(outcome.target_path, Some(vec!["Foo".to_string(), "bar".to_string()]));

        let baz = &ctx.spans()[0];
        assert_eq!((baz.span.start_line, baz.span.end_line), (6, 8));
        let id = ctx.resolve(baz).unwrap();
        assert_eq!(ctx.tree().block(id).start_line, 6);

        let walk = &ctx.spans()[line_only];
        assert_eq!(walk.span.start_line, 7);
        assert!(ctx.source().contains("run();\n        run();"));
    }

    #[test]
    fn overlapping_span_without_path_goes_stale() {
        let mut ctx = context();
        let index = ctx.track(Span::lines(2, 2));
        let edit = BlockEdit::update(
            Span::from_path(vec!["Foo".into(), "bar".into()]),
            "void bar() {}",
        );
        let outcome = ctx.apply(&edit).unwrap();
        assert_eq!(outcome.stale, 1);

        let tracked = &ctx.spans()[index];
        assert!(tracked.stale);
        assert!(matches!(
            ctx.resolve(tracked),
            Err(BlockError::StaleSpan { .. })
        ));
        assert!(!ctx.excerpt(SpanMarker::Comment).unwrap().contains("run"));
    }

    #[test]
    fn overlapping_span_with_path_is_reresolved() {
        let mut ctx = context();
        ctx.track_path(&["Foo", "bar"]).unwrap();
        let edit = BlockEdit::update(
            Span::from_path(vec!["Foo".into(), "bar".into()]),
            "void bar() {\n        a();\n        b();\n        c();\n    }",
        );
        let outcome = ctx.apply(&edit).unwrap();
        assert_eq!(outcome.reresolved, 1);

        let tracked = &ctx.spans()[0];
        assert!(!tracked.stale);
        assert_eq!((tracked.span.start_line, tracked.span.end_line), (1, 5));
    }

    #[test]
    fn edit_introducing_errors_is_rejected() {
        let mut ctx = context();
        let before = ctx.source().to_string();
        let edit = BlockEdit::update(
            Span::from_path(vec!["Foo".into(), "bar".into()]),
            "void bar() { run(; }",
        );
        assert!(matches!(
            ctx.apply(&edit),
            Err(BlockError::IntroducedSyntaxErrors { .. })
        ));
        assert_eq!(ctx.source(), before);
    }

    #[test]
    fn add_then_excerpt_new_block() {
        let mut ctx = context();
        let edit = BlockEdit::add(
            Span::from_path(vec!["Foo".into(), "qux".into()]),
            "void qux() {\n    jump();\n}",
        );
        ctx.apply(&edit).unwrap();
        let index = ctx.track_path(&["Foo", "qux"]).unwrap();
        assert_eq!(ctx.spans()[index].span.start_line, 9);

        let excerpt = ctx.excerpt(SpanMarker::Comment).unwrap();
        assert!(excerpt.contains("void qux() {\n        jump();\n    }"));
        assert!(!excerpt.contains("walk"));
        assert!(excerpt.contains("// ..."));
    }

    #[test]
    fn save_refuses_when_disk_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.java");
        std::fs::write(&path, SOURCE).unwrap();

        let mut ctx = FileContext::load(&path).unwrap();
        assert!(ctx.matches_disk().unwrap());
        std::fs::write(&path, "class Other {}\n").unwrap();
        assert!(!ctx.matches_disk().unwrap());
        assert!(matches!(
            ctx.save(),
            Err(BlockError::Edit(EditError::FileChanged { .. }))
        ));
    }

    #[test]
    fn save_writes_edited_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.java");
        std::fs::write(&path, SOURCE).unwrap();

        let mut ctx = FileContext::load(&path).unwrap();
        let edit = BlockEdit::update(
            Span::from_path(vec!["Foo".into(), "baz".into()]),
            "void baz() {}",
        );
        ctx.apply(&edit).unwrap();
        ctx.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ctx.source());
        assert!(ctx.matches_disk().unwrap());
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(matches!(
            FileContext::load(&path),
            Err(BlockError::Parse(TreeSitterError::UnsupportedLanguage { .. }))
        ));
    }
}
