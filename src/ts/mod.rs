//! Tree-sitter front-end.
//!
//! Parsing raw text into a CST is delegated to the tree-sitter grammars
//! bundled with ast-grep-language; everything downstream only sees
//! [`tree_sitter::Tree`] values and the source they were parsed from.

pub mod errors;
pub mod parser;
pub mod validator;

pub use errors::TreeSitterError;
pub use parser::{CodeParser, ErrorNode, ParsedSource};
pub use validator::{introduced_errors, validate_syntax};
