mod config;
mod document;
mod engine;
mod error;
mod function;

pub use config::{
    EngineConfig, FunctionsConfig, OutputConfig, OutputFormat, ProjectConfig, PromptsConfig,
    load_project_config,
};
pub use document::{FunctionsDocument, MessageEntry, PromptDocument};
pub use engine::Engine;
pub use error::CoreError;
pub use function::{
    FunctionParameter, FunctionRegistry, FunctionSchema, snake_case, validate_function_name,
};
