use crate::lang::Language;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to set {language} grammar for parser")]
    LanguageSet { language: Language },

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("unsupported language: {name}")]
    UnsupportedLanguage { name: String },

    #[error("syntax error detected at byte {byte_start}..{byte_end}")]
    SyntaxError { byte_start: usize, byte_end: usize },

    #[error("multiple syntax errors detected: {count} ERROR nodes")]
    MultipleSyntaxErrors { count: usize },
}
