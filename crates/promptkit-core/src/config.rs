//! Configuration types for promptkit-core.
//!
//! This module defines [`EngineConfig`] (CLI-level overrides) and
//! [`ProjectConfig`] (from `.promptkit/config.yaml` under the library root).
//! CLI flags in `EngineConfig` take precedence over values read from
//! `ProjectConfig`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

// ── Engine Configuration (CLI-level) ─────────────────────────

/// Engine configuration provided by the CLI layer.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use promptkit_core::{EngineConfig, OutputFormat};
///
/// let config = EngineConfig::builder()
///     .root(PathBuf::from("/tmp/prompts"))
///     .format(OutputFormat::Text)
///     .build();
/// assert_eq!(config.format(), Some(OutputFormat::Text));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct EngineConfig {
    /// Root directory of the prompt library.
    root: PathBuf,

    /// Override the output format (takes precedence over config.yaml).
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<OutputFormat>,
}

impl EngineConfig {
    /// Returns the library root.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Returns the output format override, if set.
    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    /// Returns the `.promptkit` directory path under the root.
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(".promptkit")
    }

    /// Returns the path to `config.yaml` inside the `.promptkit` directory.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("config.yaml")
    }

    /// Resolve a configured path against the root; absolute paths are kept.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

// ── Project Configuration (.promptkit/config.yaml) ──────────

/// Project-level configuration, deserialized from `.promptkit/config.yaml`.
///
/// Every field has a serde default so a missing or partial file still yields
/// a usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Where prompt documents live.
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Where function schema files live.
    #[serde(default)]
    pub functions: FunctionsConfig,

    /// How rendered prompts are printed.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ProjectConfig {
    /// Output format after applying the engine override.
    pub fn effective_format(&self, config: &EngineConfig) -> OutputFormat {
        config.format().unwrap_or(self.output.format)
    }
}

/// Prompt document search paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsConfig {
    /// Directories searched (in order) for `*.yaml` / `*.yml` prompt documents.
    #[serde(default = "default_prompt_dirs")]
    pub include: Vec<PathBuf>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            include: default_prompt_dirs(),
        }
    }
}

/// Function schema files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionsConfig {
    /// YAML files, each holding a `functions:` list.
    #[serde(default)]
    pub include: Vec<PathBuf>,
}

/// Output settings for rendered prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Jinja template used for text output, overriding the built-in transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Output format for rendered prompts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// A JSON array of `{role, text}` objects (default).
    #[default]
    Json,
    /// A human-readable transcript.
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Text => f.write_str("text"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format: {other} (expected json or text)")),
        }
    }
}

// ── Default value functions for serde ────────────────────────

fn default_prompt_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("prompts")]
}

// ── Config loading ───────────────────────────────────────────

/// Load [`ProjectConfig`] from `.promptkit/config.yaml`.
///
/// If the file does not exist, returns the default configuration.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file exists but cannot be read.
/// Returns `CoreError::Yaml` if the file contains invalid YAML.
pub fn load_project_config(config_path: &Path) -> Result<ProjectConfig, crate::CoreError> {
    if !config_path.exists() {
        return Ok(ProjectConfig::default());
    }
    let content = std::fs::read_to_string(config_path)?;
    let config: ProjectConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}
