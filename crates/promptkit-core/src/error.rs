use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("prompt error: {0}")]
    Prompt(#[from] promptkit_pm::PromptError),

    #[error("invalid prompt {path}: {source}")]
    InvalidPrompt {
        path: PathBuf,
        #[source]
        source: promptkit_pm::PromptError,
    },

    #[error("invalid message entry in prompt {prompt}: expected exactly one role key, got {keys}")]
    InvalidMessageEntry { prompt: String, keys: usize },

    #[error("failed to parse {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("prompt not found: {0}")]
    PromptNotFound(String),

    #[error("duplicate prompt {name} in {path}")]
    DuplicatePrompt { name: String, path: PathBuf },

    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),

    #[error("function name already taken: {0}")]
    FunctionNameTaken(String),

    #[error("prompt {prompt} references unknown function {function}")]
    UnknownFunction { prompt: String, function: String },

    #[error("config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
