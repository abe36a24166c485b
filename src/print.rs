//! Serializing block trees back to text, whole or as masked excerpts.

use crate::block::{BlockError, BlockId, BlockTree, Category};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What replaces a run of blocks left out of an excerpt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanMarker {
    /// A line comment holding the elided marker, e.g. `// ...`
    #[default]
    Comment,
    /// Skipped blocks leave no trace
    None,
}

impl BlockTree {
    /// Reconstruct the text of the subtree rooted at `id`.
    ///
    /// For trees built from source this is exactly the source bytes the
    /// subtree covers.
    pub fn to_text(&self, id: BlockId) -> String {
        let mut out = String::new();
        self.write_text(id, &mut out);
        out
    }

    fn write_text(&self, id: BlockId, out: &mut String) {
        let block = self.block(id);
        out.push_str(&block.leading_text);
        out.push_str(&block.own_text);
        for &child in &block.children {
            self.write_text(child, out);
        }
    }
}

/// Text of the whole tree.
pub fn print_block(tree: &BlockTree) -> String {
    tree.to_text(tree.root())
}

/// Render the tree, keeping only the parts that intersect `spans`.
///
/// Every maximal run of sibling subtrees sharing no line with any span is
/// replaced by a single marker. Block delimiters and trailing whitespace
/// are always kept so the excerpt stays balanced. Spans carrying a block
/// path use the lines of the block the path resolves to.
pub fn print_by_spans(
    tree: &BlockTree,
    spans: &[Span],
    marker: SpanMarker,
) -> Result<String, BlockError> {
    let ranges = spans
        .iter()
        .map(|span| span_lines(tree, span))
        .collect::<Result<Vec<_>, _>>()?;

    let mut printer = MaskedPrinter {
        tree,
        ranges: &ranges,
        marker,
        out: String::new(),
        markers: 0,
    };
    printer.write(tree.root());
    debug!(
        spans = ranges.len(),
        markers = printer.markers,
        bytes = printer.out.len(),
        "printed excerpt"
    );
    Ok(printer.out)
}

/// Render the block at `path` inside a copy of its ancestors, with every
/// unrelated sibling removed.
pub fn print_by_block_path<S: AsRef<str>>(
    tree: &BlockTree,
    path: &[S],
) -> Result<String, BlockError> {
    let target = tree.find_by_path(path)?;
    let trimmed = tree.copy_with_trimmed_parents(target);
    Ok(print_block(&trimmed.tree))
}

/// Render the ancestors of `target` with its body replaced by a single
/// placeholder comment, marking where new code should be written.
///
/// The placeholder goes before the closing delimiter of the target, two
/// lines below the opening one and indented like the target's body.
pub fn print_for_add(tree: &BlockTree, target: BlockId, placeholder: &str) -> String {
    let mut trimmed = tree.copy_with_trimmed_parents(target);
    let copy = &mut trimmed.tree;
    let target = trimmed.target;

    let indent = body_indentation(copy, target);
    let mut comment = copy.create_comment_block(copy.language().line_comment(placeholder));
    comment.leading_text = format!("\n\n{indent}");

    let mut kept: Vec<BlockId> = copy
        .children(target)
        .iter()
        .copied()
        .filter(|&c| copy.block(c).category.is_structural())
        .collect();
    let position = closing_delimiter(copy, target)
        .and_then(|closing| kept.iter().position(|&c| c == closing))
        .unwrap_or(kept.len());

    let placeholder_id = copy.push_child(target, comment);
    kept.insert(position, placeholder_id);
    copy.set_children(target, kept);

    print_block(copy)
}

/// Last block delimiter of `id`, when it has an opening one before it.
pub(crate) fn closing_delimiter(tree: &BlockTree, id: BlockId) -> Option<BlockId> {
    let delimiters: Vec<BlockId> = tree
        .children(id)
        .iter()
        .copied()
        .filter(|&c| tree.block(c).category == Category::BlockDelimiter)
        .collect();
    match delimiters.as_slice() {
        [_, .., closing] => Some(*closing),
        _ => None,
    }
}

/// Indentation of the first real child of `id`, or one level deeper than
/// `id` itself when it has none.
pub(crate) fn body_indentation(tree: &BlockTree, id: BlockId) -> String {
    tree.children(id)
        .iter()
        .map(|&c| tree.block(c))
        .find(|b| !b.category.is_structural() && b.leading_text.contains('\n'))
        .map(|b| b.indentation().to_string())
        .unwrap_or_else(|| format!("{}    ", tree.block(id).indentation()))
}

/// Inclusive line range addressed by `span` in `tree`.
fn span_lines(tree: &BlockTree, span: &Span) -> Result<(usize, usize), BlockError> {
    match &span.block_path {
        Some(path) => {
            let block = tree.block(tree.find_by_path(path)?);
            Ok((block.start_line, block.end_line))
        }
        None => Ok((span.start_line, span.end_line)),
    }
}

struct MaskedPrinter<'a> {
    tree: &'a BlockTree,
    ranges: &'a [(usize, usize)],
    marker: SpanMarker,
    out: String,
    markers: usize,
}

impl MaskedPrinter<'_> {
    fn write(&mut self, id: BlockId) {
        let block = self.tree.block(id);
        self.out.push_str(&block.leading_text);
        self.out.push_str(&block.own_text);

        let mut skipped: Option<BlockId> = None;
        for &child in &block.children {
            if self.keeps(child) {
                if let Some(first) = skipped.take() {
                    self.write_marker(first);
                }
                self.write(child);
            } else if skipped.is_none() {
                skipped = Some(child);
            }
        }
        if let Some(first) = skipped {
            self.write_marker(first);
        }
    }

    fn keeps(&self, id: BlockId) -> bool {
        let block = self.tree.block(id);
        block.category.is_structural()
            || self
                .ranges
                .iter()
                .any(|&(start, end)| block.intersects_lines(start, end))
    }

    /// Marker for a run of skipped siblings starting at `first`.
    fn write_marker(&mut self, first: BlockId) {
        self.markers += 1;
        if self.marker == SpanMarker::None {
            return;
        }
        let block = self.tree.block(first);
        let language = self.tree.language();
        self.out.push('\n');
        self.out.push_str(block.indentation());
        self.out
            .push_str(&language.line_comment(language.rules().elided_marker));
    }
}
