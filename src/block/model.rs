use crate::block::errors::BlockError;
use crate::lang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic category of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Module,
    Class,
    Function,
    Statement,
    Code,
    Import,
    Comment,
    CommentedOutCode,
    BlockDelimiter,
    Error,
    Space,
}

impl Category {
    /// Blocks that are always kept when excerpting, since dropping them
    /// would unbalance the surrounding structure.
    pub fn is_structural(&self) -> bool {
        matches!(self, Category::BlockDelimiter | Category::Space)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Module => "module",
            Category::Class => "class",
            Category::Function => "function",
            Category::Statement => "statement",
            Category::Code => "code",
            Category::Import => "import",
            Category::Comment => "comment",
            Category::CommentedOutCode => "commented_out_code",
            Category::BlockDelimiter => "block_delimiter",
            Category::Error => "error",
            Category::Space => "space",
        };
        f.write_str(name)
    }
}

/// Index of a block inside its [`BlockTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the semantic block tree.
///
/// `leading_text` followed by `own_text` and the text of every child, in
/// order, reproduces the source bytes covered by the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub category: Category,
    /// Tree-sitter node kind the block was built from
    pub grammar_kind: String,
    /// 0-indexed, inclusive
    pub start_line: usize,
    pub end_line: usize,
    /// Byte range of the block itself, excluding `leading_text`
    pub start_byte: usize,
    pub end_byte: usize,
    pub leading_text: String,
    pub own_text: String,
    pub children: Vec<BlockId>,
    pub parent: Option<BlockId>,
    pub language: Language,
    pub label: Option<String>,
}

impl CodeBlock {
    /// Synthetic comment block carrying `text` verbatim. It has no source
    /// position of its own.
    pub fn comment(language: Language, text: impl Into<String>) -> Self {
        Self {
            category: Category::Comment,
            grammar_kind: "comment".to_string(),
            start_line: 0,
            end_line: 0,
            start_byte: 0,
            end_byte: 0,
            leading_text: String::new(),
            own_text: text.into(),
            children: Vec::new(),
            parent: None,
            language,
            label: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether `[start, end]` lies within the block's lines.
    pub fn contains_lines(&self, start: usize, end: usize) -> bool {
        self.start_line <= start && end <= self.end_line
    }

    /// Whether the block shares at least one line with `[start, end]`.
    pub fn intersects_lines(&self, start: usize, end: usize) -> bool {
        self.start_line <= end && start <= self.end_line
    }

    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Indentation on the block's first line, taken from its leading text.
    pub fn indentation(&self) -> &str {
        let after_newline = match self.leading_text.rfind('\n') {
            Some(i) => &self.leading_text[i + 1..],
            None => self.leading_text.as_str(),
        };
        let end = after_newline
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(after_newline.len());
        &after_newline[..end]
    }
}

/// Arena-backed block tree for one source file.
///
/// The arena owns every block; parent links are plain indices. Trees built
/// from source are never mutated by the engine: edits produce a new tree
/// from re-parsed text. Copies such as
/// [`copy_with_trimmed_parents`](BlockTree::copy_with_trimmed_parents) are
/// standalone and may be mutated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTree {
    blocks: Vec<CodeBlock>,
    root: BlockId,
    language: Language,
}

impl BlockTree {
    pub(crate) fn from_parts(blocks: Vec<CodeBlock>, root: BlockId, language: Language) -> Self {
        Self {
            blocks,
            root,
            language,
        }
    }

    pub fn root(&self) -> BlockId {
        self.root
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Number of blocks in the arena, including detached ones.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get a block by id.
    ///
    /// Ids are only meaningful for the tree that produced them.
    pub fn block(&self, id: BlockId) -> &CodeBlock {
        &self.blocks[id.0]
    }

    pub fn get(&self, id: BlockId) -> Option<&CodeBlock> {
        self.blocks.get(id.0)
    }

    pub fn root_block(&self) -> &CodeBlock {
        self.block(self.root)
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.block(id).parent
    }

    pub fn children(&self, id: BlockId) -> &[BlockId] {
        &self.block(id).children
    }

    /// Walk parent links up to the top-most ancestor of `id`.
    pub fn root_of(&self, id: BlockId) -> BlockId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Ancestors of `id` from the root down, excluding `id` itself.
    pub fn ancestors(&self, id: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain.reverse();
        chain
    }

    /// Blocks reachable from the root, in document (pre-)order.
    pub fn iter_preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Blocks of the subtree rooted at `id`, in document order.
    pub fn iter_subtree(&self, id: BlockId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Labels from the root down to `id`.
    ///
    /// Returns `None` when a block on the way has no label, since such a
    /// block cannot be addressed by path.
    pub fn path_of(&self, id: BlockId) -> Option<Vec<String>> {
        let mut path = Vec::new();
        for ancestor in self.ancestors(id).into_iter().skip(1) {
            path.push(self.block(ancestor).label.clone()?);
        }
        if id != self.root {
            path.push(self.block(id).label.clone()?);
        }
        Some(path)
    }

    /// Build a detached comment block for this tree's language.
    pub fn create_comment_block(&self, text: impl Into<String>) -> CodeBlock {
        CodeBlock::comment(self.language, text)
    }

    /// Append a detached block to the arena under `parent`.
    pub fn push_child(&mut self, parent: BlockId, mut block: CodeBlock) -> BlockId {
        let id = BlockId(self.blocks.len());
        block.parent = Some(parent);
        block.children.clear();
        self.blocks.push(block);
        self.blocks[parent.0].children.push(id);
        id
    }

    /// Replace the children of `id` with the given detached blocks.
    ///
    /// Previous children stay in the arena but are no longer reachable.
    pub fn replace_children(&mut self, id: BlockId, blocks: Vec<CodeBlock>) -> Vec<BlockId> {
        self.blocks[id.0].children.clear();
        blocks
            .into_iter()
            .map(|block| self.push_child(id, block))
            .collect()
    }

    /// Insert an existing child list for `id`, e.g. to reorder after
    /// [`push_child`](BlockTree::push_child).
    pub fn set_children(&mut self, id: BlockId, children: Vec<BlockId>) {
        for child in &children {
            self.blocks[child.0].parent = Some(id);
        }
        self.blocks[id.0].children = children;
    }

    /// Check the round-trip and ordering invariants against `source`.
    ///
    /// Every block's text must equal the source bytes it covers, and
    /// children must be ordered and contiguous inside their parent.
    pub fn verify(&self, source: &str) -> Result<(), BlockError> {
        let whole = self.to_text(self.root);
        if whole != source {
            return Err(BlockError::RangeInvariantViolation {
                message: format!(
                    "tree text ({} bytes) differs from source ({} bytes)",
                    whole.len(),
                    source.len()
                ),
            });
        }

        for id in self.iter_preorder().map(|(id, _)| id) {
            let block = self.block(id);
            let begin = block
                .start_byte
                .checked_sub(block.leading_text.len())
                .ok_or_else(|| violation(id, block, "leading text precedes start of file"))?;
            let covered = source
                .get(begin..block.end_byte)
                .ok_or_else(|| violation(id, block, "byte range outside source"))?;
            if covered != self.to_text(id) {
                return Err(violation(id, block, "subtree text differs from source"));
            }

            let mut previous_end = block.start_byte + block.own_text.len();
            for &child_id in &block.children {
                let child = self.block(child_id);
                if child.start_byte.checked_sub(child.leading_text.len()) != Some(previous_end) {
                    return Err(violation(child_id, child, "child not contiguous with sibling"));
                }
                if child.end_byte > block.end_byte {
                    return Err(violation(child_id, child, "child exceeds parent range"));
                }
                if child.parent != Some(id) {
                    return Err(violation(child_id, child, "parent link mismatch"));
                }
                previous_end = child.end_byte;
            }
        }

        Ok(())
    }
}

fn violation(id: BlockId, block: &CodeBlock, message: &str) -> BlockError {
    BlockError::RangeInvariantViolation {
        message: format!(
            "{message} at block {id} ({} '{}', bytes {}..{})",
            block.category, block.grammar_kind, block.start_byte, block.end_byte
        ),
    }
}

/// Pre-order traversal yielding `(id, block)` pairs.
pub struct Preorder<'a> {
    tree: &'a BlockTree,
    stack: Vec<BlockId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (BlockId, &'a CodeBlock);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let block = self.tree.block(id);
        self.stack.extend(block.children.iter().rev().copied());
        Some((id, block))
    }
}
