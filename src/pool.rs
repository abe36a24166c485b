//! Thread-local parser pooling.
//!
//! Tree-sitter parsers are not shareable across threads, so each thread
//! lazily creates one [`CodeParser`] per language on first use and reuses it
//! for every later parse.

use crate::lang::Language;
use crate::ts::{CodeParser, TreeSitterError};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Language, CodeParser>> = RefCell::new(HashMap::new());
}

/// Execute function with the pooled parser for `language`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use codeblocks::lang::Language;
/// use codeblocks::pool::with_parser;
///
/// let tree = with_parser(Language::Java, |parser| parser.parse("class A {}"))??;
/// assert_eq!(tree.root_node().kind(), "program");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut CodeParser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(CodeParser::new(language)?)
            }
        };
        Ok(f(parser))
    })
}
