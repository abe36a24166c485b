use crate::lang::Language;
use crate::pool::with_parser;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ErrorNode;

/// Validate that source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR or MISSING nodes.
pub fn validate_syntax(source: &str, language: Language) -> Result<(), TreeSitterError> {
    let errors = with_parser(language, |parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes())
    })??;

    match errors.len() {
        0 => Ok(()),
        1 => Err(TreeSitterError::SyntaxError {
            byte_start: errors[0].byte_start,
            byte_end: errors[0].byte_end,
        }),
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}

/// Errors in `after` that have no counterpart in `before`.
///
/// Errors located past the edited region are compared at their pre-edit
/// offsets: `edit_end` is the end of the replaced range in the original
/// source and `shift` the byte length difference of the replacement.
pub fn introduced_errors<'e>(
    before: &[ErrorNode],
    after: &'e [ErrorNode],
    edit_end: usize,
    shift: isize,
) -> Vec<&'e ErrorNode> {
    let new_edit_end = edit_end.saturating_add_signed(shift);
    after
        .iter()
        .filter(|e| {
            let (start, end) = if e.byte_start >= new_edit_end {
                (
                    e.byte_start.saturating_add_signed(-shift),
                    e.byte_end.saturating_add_signed(-shift),
                )
            } else {
                (e.byte_start, e.byte_end)
            };
            !before
                .iter()
                .any(|o| o.byte_start == start && o.byte_end == end && o.missing == e.missing)
        })
        .collect()
}
