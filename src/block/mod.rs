//! The semantic block tree.
//!
//! A [`BlockTree`] is a coarse, language-agnostic view of a CST: classes,
//! functions, statements, comments and code runs, each carrying the exact
//! source bytes it covers. Blocks live in an arena and refer to each other
//! by [`BlockId`].

pub mod errors;
pub mod model;

pub use errors::BlockError;
pub use model::{BlockId, BlockTree, Category, CodeBlock, Preorder};
