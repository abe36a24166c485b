//! CST to block tree construction.
//!
//! The builder walks a tree-sitter CST top-down, asking the [`Classifier`]
//! what each node is and which nodes form its inside. Every byte of the
//! source ends up in exactly one block's `leading_text` or `own_text`, so
//! serializing the result reproduces the input.

use crate::block::{BlockError, BlockId, BlockTree, Category, CodeBlock};
use crate::lang::{Classifier, Language};
use crate::pool::with_parser;
use crate::ts::ParsedSource;
use tracing::debug;
use tree_sitter::{Node, Tree};

/// Parse `source` with the pooled parser and build its block tree.
pub fn parse_blocks(source: &str, language: Language) -> Result<BlockTree, BlockError> {
    let tree = with_parser(language, |parser| parser.parse(source))??;
    build_tree(source, &tree, language)
}

/// Build the block tree of an already parsed source.
pub fn build_tree(source: &str, tree: &Tree, language: Language) -> Result<BlockTree, BlockError> {
    TreeBuilder::new(source, language).build(tree.root_node())
}

impl ParsedSource<'_> {
    /// Build the block tree for this parse.
    pub fn to_blocks(&self) -> Result<BlockTree, BlockError> {
        build_tree(self.source, &self.tree, self.language)
    }
}

/// Recursive CST walker producing a [`BlockTree`].
///
/// Generic over the classifier so that alternative rule sets can be plugged
/// in without touching the traversal.
pub struct TreeBuilder<'s, C: Classifier = Language> {
    source: &'s str,
    classifier: C,
    line_starts: Vec<usize>,
    blocks: Vec<CodeBlock>,
}

impl<'s, C: Classifier> TreeBuilder<'s, C> {
    pub fn new(source: &'s str, classifier: C) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            classifier,
            line_starts,
            blocks: Vec::new(),
        }
    }

    /// Build the tree rooted at `root`, consuming the builder.
    ///
    /// `root` is treated as the top of the file: bytes before it and after
    /// it are attached to the root block so the whole source round-trips.
    pub fn build(mut self, root: Node<'_>) -> Result<BlockTree, BlockError> {
        let root_id = self.build_node(root, 0, None)?;
        let errors = self
            .blocks
            .iter()
            .filter(|b| b.category == Category::Error)
            .count();
        debug!(
            language = %self.classifier.language(),
            blocks = self.blocks.len(),
            errors,
            "built block tree"
        );
        Ok(BlockTree::from_parts(
            self.blocks,
            root_id,
            self.classifier.language(),
        ))
    }

    fn build_node(
        &mut self,
        node: Node<'_>,
        cursor: usize,
        parent: Option<BlockId>,
    ) -> Result<BlockId, BlockError> {
        let start = node.start_byte();
        let end = node.end_byte();
        if start < cursor {
            return Err(overlap(node, cursor));
        }

        let child_nodes = self.classifier.children_of(node);
        let category = self.classifier.classify(node, self.source);
        let hidden = match category {
            Category::Error => Vec::new(),
            _ => hidden_errors(node, &child_nodes),
        };

        let mut own_end = match child_nodes.first() {
            Some(first) => {
                let first_start = first.start_byte();
                if first_start < start {
                    return Err(overlap(*first, start));
                }
                first
                    .prev_sibling()
                    .map_or(first_start, |prev| prev.end_byte())
                    .clamp(start, first_start)
            }
            None => end,
        };
        if let Some(error) = hidden.first() {
            own_end = own_end.min(error.start_byte()).max(start);
        }

        if category == Category::Error {
            debug!(
                kind = node.kind(),
                missing = node.is_missing(),
                line = node.start_position().row,
                "containing syntax error in error block"
            );
        }

        let block = CodeBlock {
            category,
            grammar_kind: node.kind().to_string(),
            start_line: self.line_at(start),
            end_line: self.end_line(start, end),
            start_byte: start,
            end_byte: end,
            leading_text: self.slice(cursor, start)?.to_string(),
            own_text: self.slice(start, own_end)?.to_string(),
            children: Vec::new(),
            parent,
            language: self.classifier.language(),
            label: self.classifier.label_of(node, self.source),
        };
        let id = self.push(block);

        let mut cursor = own_end;
        let mut children = Vec::with_capacity(child_nodes.len());

        if hidden.is_empty() && self.collapses(&child_nodes) {
            // A run of bare tokens becomes one code block
            let first = child_nodes[0];
            let last = child_nodes[child_nodes.len() - 1];
            if first.start_byte() < cursor {
                return Err(overlap(first, cursor));
            }
            let code = self.synthetic(
                Category::Code,
                first.kind(),
                cursor,
                first.start_byte(),
                last.end_byte(),
                id,
            )?;
            children.push(self.push(code));
            cursor = last.end_byte();
        } else {
            for child in interleave(child_nodes, hidden) {
                children.push(self.build_node(child, cursor, Some(id))?);
                cursor = child.end_byte();
            }
        }

        let tail_end = match parent {
            Some(_) => end,
            None => end.max(self.source.len()),
        };
        if cursor > tail_end {
            return Err(BlockError::RangeInvariantViolation {
                message: format!(
                    "children of '{}' end at byte {cursor}, past its end {tail_end}",
                    node.kind()
                ),
            });
        }
        if cursor < tail_end {
            let space = self.synthetic(Category::Space, "space", cursor, tail_end, tail_end, id)?;
            children.push(self.push(space));
        }

        let is_root = parent.is_none();
        let end_line = self.end_line(0, tail_end);
        let block = &mut self.blocks[id.0];
        block.children = children;
        if is_root {
            block.end_byte = tail_end;
            block.start_line = 0;
            block.end_line = end_line;
        }

        Ok(id)
    }

    /// Whether `nodes` is a non-empty run of plain tokens.
    fn collapses(&self, nodes: &[Node<'_>]) -> bool {
        !nodes.is_empty()
            && nodes.iter().all(|n| {
                n.child_count() == 0
                    && !n.is_error()
                    && !n.is_missing()
                    && !self.classifier.is_block_delimiter(n.kind())
            })
    }

    /// Block not backed by a single CST node. `leading_text` runs from
    /// `cursor` to `start`, `own_text` from `start` to `end`.
    fn synthetic(
        &self,
        category: Category,
        kind: &str,
        cursor: usize,
        start: usize,
        end: usize,
        parent: BlockId,
    ) -> Result<CodeBlock, BlockError> {
        let (first_line, last_line) = if start == end {
            (self.line_at(cursor), self.end_line(cursor, end))
        } else {
            (self.line_at(start), self.end_line(start, end))
        };
        Ok(CodeBlock {
            category,
            grammar_kind: kind.to_string(),
            start_line: first_line,
            end_line: last_line,
            start_byte: start,
            end_byte: end,
            leading_text: self.slice(cursor, start)?.to_string(),
            own_text: self.slice(start, end)?.to_string(),
            children: Vec::new(),
            parent: Some(parent),
            language: self.classifier.language(),
            label: None,
        })
    }

    fn push(&mut self, block: CodeBlock) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(block);
        id
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'s str, BlockError> {
        self.source
            .get(start..end)
            .ok_or_else(|| BlockError::RangeInvariantViolation {
                message: format!(
                    "byte range {start}..{end} is not a valid slice of a {}-byte source",
                    self.source.len()
                ),
            })
    }

    fn line_at(&self, byte: usize) -> usize {
        self.line_starts.partition_point(|&s| s <= byte) - 1
    }

    /// Last line touched by `[start, end)`; a range ending right after a
    /// newline ends on the line of that newline.
    fn end_line(&self, start: usize, end: usize) -> usize {
        if end > start {
            self.line_at(end - 1)
        } else {
            self.line_at(start)
        }
    }
}

/// ERROR and MISSING nodes under `node` that none of `children` covers.
///
/// These sit in text the block keeps as its own (a parameter list, a
/// declarator) and would otherwise leave no `Error` block behind.
fn hidden_errors<'t>(node: Node<'t>, children: &[Node<'t>]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    if node.has_error() {
        collect_hidden(node, children, &mut found);
    }
    found
}

fn collect_hidden<'t>(node: Node<'t>, children: &[Node<'t>], found: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if children.iter().any(|c| c.id() == child.id())
            || !(child.has_error() || child.is_missing())
        {
            continue;
        }
        let encloses_child = child.end_byte() > child.start_byte()
            && children
                .iter()
                .any(|c| child.start_byte() <= c.start_byte() && c.end_byte() <= child.end_byte());
        if (child.is_error() || child.is_missing()) && !encloses_child {
            found.push(child);
        } else {
            collect_hidden(child, children, found);
        }
    }
}

/// Merge two document-ordered node lists; on equal starts `hidden` goes
/// first so zero-width nodes precede the token they were inserted before.
fn interleave<'t>(children: Vec<Node<'t>>, hidden: Vec<Node<'t>>) -> Vec<Node<'t>> {
    if hidden.is_empty() {
        return children;
    }
    let mut merged = Vec::with_capacity(children.len() + hidden.len());
    let mut hidden = hidden.into_iter().peekable();
    for child in children {
        while let Some(error) = hidden.next_if(|h| h.start_byte() <= child.start_byte()) {
            merged.push(error);
        }
        merged.push(child);
    }
    merged.extend(hidden);
    merged
}

fn overlap(node: Node<'_>, cursor: usize) -> BlockError {
    BlockError::RangeInvariantViolation {
        message: format!(
            "'{}' at byte {} overlaps previously consumed text ending at {cursor}",
            node.kind(),
            node.start_byte()
        ),
    }
}
