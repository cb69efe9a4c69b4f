//! Central error handling for the style engine.
//!
//! Parse-time failures carry the full list of path-keyed expression errors;
//! runtime evaluation failures never surface here (they are absorbed by
//! [`crate::style::expression::StyleExpression::evaluate`]).

use crate::style::expression::ParsingError;

/// Centralized error type for style loading and compilation.
#[derive(thiserror::Error, Debug)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid style: {0}")]
    Invalid(String),

    #[error("{}", join_parsing_errors(.0))]
    Expression(Vec<ParsingError>),

    #[error("Style validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Unknown {group} property \"{key}\" for layer type \"{layer_type}\"")]
    UnknownProperty {
        group: String,
        layer_type: String,
        key: String,
    },

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),
}

impl StyleError {
    /// Convenience constructor for invalid style documents.
    pub fn invalid<T: ToString>(msg: T) -> Self {
        StyleError::Invalid(msg.to_string())
    }
}

impl From<Vec<ParsingError>> for StyleError {
    fn from(errors: Vec<ParsingError>) -> Self {
        StyleError::Expression(errors)
    }
}

fn join_parsing_errors(errors: &[ParsingError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for style operations
pub type StyleResult<T> = Result<T, StyleError>;
