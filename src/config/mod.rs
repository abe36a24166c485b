pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, DEFAULT_CONFIG_FILE};
pub use schema::{
    CheckConfig, EngineConfig, ExcerptConfig, ValidationError, ValidationIssue,
    DEFAULT_PLACEHOLDER,
};
