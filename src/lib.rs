//! Codeblocks: semantic block trees over tree-sitter CSTs
//!
//! Source files are parsed with tree-sitter and rebuilt into a coarse,
//! language-agnostic tree of blocks (classes, functions, statements,
//! comments, code runs) that reproduces the source byte for byte.
//!
//! # Architecture
//!
//! A per-language [`Classifier`](lang::Classifier) decides what each CST
//! node is and which nodes form its inside; the [`builder`] walks the CST
//! with it and produces an arena [`BlockTree`]. On top of the tree:
//!
//! - [`resolve`]: lookup by label path or line span, ancestor-trimmed copies
//! - [`print`]: full reconstruction and masked excerpts
//! - [`edit`]: add/update edits compiled to verified byte-span replacements
//! - [`span`]: span ids and re-addressing after line counts shift
//! - [`context`]: caller-owned per-file state tying the above together
//!
//! # Example
//!
//! ```no_run
//! use codeblocks::{parse_blocks, print_by_spans, Language, Span, SpanMarker};
//!
//! # fn main() -> Result<(), codeblocks::BlockError> {
//! let source = "class Foo {\n    void bar() {}\n    void baz() {}\n}\n";
//! let tree = parse_blocks(source, Language::Java)?;
//!
//! let bar = tree.find_by_path(&["Foo", "bar"])?;
//! let excerpt = print_by_spans(&tree, &[Span::of_block(&tree, bar)], SpanMarker::Comment)?;
//! println!("{excerpt}");
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod builder;
pub mod config;
pub mod context;
pub mod edit;
pub mod lang;
pub mod pool;
pub mod print;
pub mod resolve;
pub mod span;
pub mod ts;

// Re-exports
pub use block::{BlockError, BlockId, BlockTree, Category, CodeBlock};
pub use builder::{build_tree, parse_blocks, TreeBuilder};
pub use config::{load_from_path, load_from_str, ConfigError, EngineConfig};
pub use context::{EditOutcome, FileContext, OutstandingSpan};
pub use edit::{BlockEdit, EditError, EditIntent, EditVerification, PlannedEdit, TextEdit};
pub use lang::{Classifier, Language};
pub use print::{print_block, print_by_block_path, print_by_spans, print_for_add, SpanMarker};
pub use resolve::TrimmedTree;
pub use span::{LineDelta, LineEdit, Readdressed, Span, SpanId};
pub use ts::{CodeParser, ParsedSource, TreeSitterError};
