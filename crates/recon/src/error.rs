use thiserror::Error;

/// Failures that abort a whole pass or reject a configuration.
///
/// Dirty data never surfaces here: missing join targets, malformed amounts,
/// malformed dates and unknown payment conditions all degrade to defaults
/// inside the pass.
#[derive(Debug, Error)]
pub enum ReconError {
    /// None of the six logical sources was supplied.
    #[error("no recognized source files were supplied (expected any of: {expected})")]
    NoRecognizedSources { expected: String },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty candidate list, empty column set, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}
