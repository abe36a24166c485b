use crate::print::SpanMarker;
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_PLACEHOLDER: &str = "Write the implementation here...";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub excerpt: ExcerptConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

/// How excerpts are rendered for collaborators.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExcerptConfig {
    #[serde(default)]
    pub marker: SpanMarker,
    /// Comment text marking where added code goes
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            marker: SpanMarker::default(),
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

/// Settings for walking a directory tree with `check`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Directory names skipped while walking
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            threads: default_threads(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    ["target", ".git", "node_modules"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.excerpt.placeholder.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                section: "excerpt",
                field: "placeholder",
            });
        }
        if self.excerpt.placeholder.contains('\n') {
            issues.push(ValidationIssue::InvalidValue {
                section: "excerpt",
                field: "placeholder",
                message: "must be a single line".to_string(),
            });
        }
        if self.check.threads == 0 {
            issues.push(ValidationIssue::InvalidValue {
                section: "check",
                field: "threads",
                message: "must be at least 1".to_string(),
            });
        }
        if self.check.exclude.iter().any(|name| name.trim().is_empty()) {
            issues.push(ValidationIssue::InvalidValue {
                section: "check",
                field: "exclude",
                message: "entries must not be empty".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        section: &'static str,
        field: &'static str,
    },
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { section, field } => {
                write!(f, "[{section}] missing required field '{field}'")
            }
            ValidationIssue::InvalidValue {
                section,
                field,
                message,
            } => write!(f, "[{section}] invalid '{field}': {message}"),
        }
    }
}
