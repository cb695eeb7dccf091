use thiserror::Error;

use crate::registry::ParameterDescriptor;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("no such parameter: {0}")]
    UnknownParameter(String),

    #[error("missing required parameter(s): {}", names(.missing))]
    MissingParameterValue { missing: Vec<ParameterDescriptor> },

    #[error("placeholder has no registered parameter: {0}")]
    UnregisteredPlaceholder(String),
}

impl PromptError {
    /// Names of the missing parameters, if this is a `MissingParameterValue` error.
    pub fn missing_names(&self) -> Vec<&str> {
        match self {
            Self::MissingParameterValue { missing } => {
                missing.iter().map(|p| p.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn names(missing: &[ParameterDescriptor]) -> String {
    missing
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for prompt model operations.
pub type Result<T> = std::result::Result<T, PromptError>;
