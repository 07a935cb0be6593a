use thiserror::Error;

/// Configuration errors raised while reading overrides from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be an unsigned integer, got '{value}'")]
    NotAnInteger { name: &'static str, value: String },

    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("{name} must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: String,
        min: String,
        max: String,
    },
}
