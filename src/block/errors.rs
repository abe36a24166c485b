use crate::edit::EditError;
use crate::ts::TreeSitterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("block path '{path}' not found: no block labeled '{missing}'{}", hint(.suggestion))]
    PathNotFound {
        path: String,
        missing: String,
        suggestion: Option<String>,
    },

    #[error("no block contains lines {start_line}..={end_line}")]
    SpanNotFound { start_line: usize, end_line: usize },

    #[error("span at lines {start_line}..={end_line} is stale and has no block path to re-resolve")]
    StaleSpan { start_line: usize, end_line: usize },

    #[error("block range invariant violated: {message}")]
    RangeInvariantViolation { message: String },

    #[error("edit introduced {count} syntax error(s)")]
    IntroducedSyntaxErrors { count: usize },

    #[error(transparent)]
    Parse(#[from] TreeSitterError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(label) => format!(" (did you mean '{label}'?)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_not_found_mentions_suggestion() {
        let err = BlockError::PathNotFound {
            path: "Foo.baz".to_string(),
            missing: "baz".to_string(),
            suggestion: Some("bar".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("Foo.baz"));
        assert!(message.contains("did you mean 'bar'?"));
    }
}
