//! Path and span lookup, and ancestor-trimmed copies.

use crate::block::{BlockError, BlockId, BlockTree, CodeBlock};
use crate::span::Span;
use tracing::debug;

/// Minimum Jaro-Winkler similarity for a label to be offered as suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A standalone copy of a tree keeping only one block and its ancestors.
#[derive(Debug, Clone)]
pub struct TrimmedTree {
    pub tree: BlockTree,
    /// The copied target block inside `tree`
    pub target: BlockId,
}

impl BlockTree {
    /// Find a block by its label path from the root.
    ///
    /// At each level the first child in document order whose label matches
    /// is selected. An empty path resolves to the root.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Result<BlockId, BlockError> {
        let mut current = self.root();
        for element in path {
            let element = element.as_ref();
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|&child| self.block(child).label.as_deref() == Some(element))
                .ok_or_else(|| self.path_not_found(current, path, element))?;
        }
        Ok(current)
    }

    /// Find the block that most tightly contains the span's lines.
    ///
    /// The narrowest containing block wins; among equally narrow blocks the
    /// first in document order (the outermost) is returned rather than the
    /// deepest. Deeper blocks of the same extent are unlabeled fragments
    /// (collapsed token runs, delimiters), while the outermost one is the
    /// statement or definition a caller can address again.
    pub fn find_block_with_span(&self, span: &Span) -> Result<BlockId, BlockError> {
        let not_found = || BlockError::SpanNotFound {
            start_line: span.start_line,
            end_line: span.end_line,
        };
        if span.end_line < span.start_line {
            return Err(not_found());
        }

        let mut best: Option<(BlockId, usize)> = None;
        for (id, block) in self.iter_preorder() {
            if !block.contains_lines(span.start_line, span.end_line) {
                continue;
            }
            let width = block.end_line - block.start_line;
            if best.is_none_or(|(_, w)| width < w) {
                best = Some((id, width));
            }
        }
        best.map(|(id, _)| id).ok_or_else(not_found)
    }

    /// Resolve a span to a block, by path when it has one and by lines
    /// otherwise.
    pub fn resolve_span(&self, span: &Span) -> Result<BlockId, BlockError> {
        match &span.block_path {
            Some(path) => self.find_by_path(path),
            None => self.find_block_with_span(span),
        }
    }

    /// Copy the chain of ancestors from the root to `target`, with `target`
    /// and its whole subtree intact.
    ///
    /// Each ancestor keeps only the child on the path plus its delimiter and
    /// space blocks, so the copy still reads as balanced code. The copy shares
    /// nothing with `self`.
    pub fn copy_with_trimmed_parents(&self, target: BlockId) -> TrimmedTree {
        let mut chain = self.ancestors(target);
        chain.push(target);

        let mut blocks = Vec::new();
        let mut copied_target = None;
        self.copy_trimmed(self.root(), None, &chain, &mut blocks, &mut copied_target);

        debug!(
            target = %target,
            ancestors = chain.len() - 1,
            blocks = blocks.len(),
            "trimmed copy"
        );
        let root = BlockId(0);
        TrimmedTree {
            tree: BlockTree::from_parts(blocks, root, self.language()),
            target: copied_target.unwrap_or(root),
        }
    }

    fn copy_trimmed(
        &self,
        id: BlockId,
        parent: Option<BlockId>,
        chain: &[BlockId],
        out: &mut Vec<CodeBlock>,
        copied_target: &mut Option<BlockId>,
    ) -> BlockId {
        let new_id = BlockId(out.len());
        let mut block = self.block(id).clone();
        block.parent = parent;
        block.children = Vec::new();
        out.push(block);

        let is_target = chain.last() == Some(&id);
        if is_target {
            *copied_target = Some(new_id);
        }

        let children: Vec<BlockId> = match chain.iter().position(|&c| c == id) {
            Some(depth) if !is_target => {
                let next = chain[depth + 1];
                self.children(id)
                    .iter()
                    .copied()
                    .filter(|&c| c == next || self.block(c).category.is_structural())
                    .collect()
            }
            _ => self.children(id).to_vec(),
        };

        let copied = children
            .into_iter()
            .map(|child| self.copy_trimmed(child, Some(new_id), chain, out, copied_target))
            .collect();
        out[new_id.0].children = copied;
        new_id
    }

    fn path_not_found<S: AsRef<str>>(
        &self,
        parent: BlockId,
        path: &[S],
        missing: &str,
    ) -> BlockError {
        let suggestion = self
            .children(parent)
            .iter()
            .filter_map(|&c| self.block(c).label.as_deref())
            .map(|label| (label, strsim::jaro_winkler(label, missing)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(label, _)| label.to_string());

        BlockError::PathNotFound {
            path: path
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join("."),
            missing: missing.to_string(),
            suggestion,
        }
    }
}
