//! Prompt library engine.
//!
//! The [`Engine`] is the main entry point for promptkit-core. It loads the
//! project configuration, the function schemas and every prompt document of
//! a library root, then hands out shared [`PromptDefinition`]s and renders
//! them against caller-supplied parameters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use promptkit_pm::{ParameterDescriptor, PromptDefinition, PromptInstance, RenderedMessage};
use tracing::{debug, info, instrument, warn};

use crate::config::{EngineConfig, ProjectConfig, load_project_config};
use crate::document::{FunctionsDocument, PromptDocument};
use crate::error::CoreError;
use crate::function::{FunctionRegistry, FunctionSchema};

/// Loaded prompt library.
///
/// Created via [`Engine::new()`]; read-only afterwards, so definitions can
/// be shared freely while each caller binds its own [`PromptInstance`].
///
/// # Examples
///
/// ```no_run
/// use std::collections::BTreeMap;
/// use std::path::PathBuf;
/// use promptkit_core::{Engine, EngineConfig};
///
/// # async fn example() -> Result<(), promptkit_core::CoreError> {
/// let config = EngineConfig::builder()
///     .root(PathBuf::from("."))
///     .build();
///
/// let engine = Engine::new(config).await?;
/// let params = BTreeMap::from([("name".to_owned(), "Ava".to_owned())]);
/// let messages = engine.render("greet", &params)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Engine {
    /// CLI-level configuration.
    config: EngineConfig,
    /// Project-level configuration from `.promptkit/config.yaml`.
    project_config: ProjectConfig,
    /// Frozen definitions by prompt name.
    prompts: BTreeMap<String, Arc<PromptDefinition>>,
    /// Function schemas referenced by prompts.
    functions: FunctionRegistry,
}

impl Engine {
    /// Load the library under `config.root()`.
    ///
    /// Function files are loaded first so prompt documents can be checked
    /// against them. Include directories that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Yaml` / `CoreError::Document` for unparsable files,
    /// `CoreError::InvalidPrompt` for documents that do not build,
    /// `CoreError::DuplicatePrompt` / `CoreError::FunctionNameTaken` for name
    /// clashes and `CoreError::UnknownFunction` for dangling references.
    #[instrument(skip_all)]
    pub async fn new(config: EngineConfig) -> Result<Self, CoreError> {
        info!(root = %config.root().display(), "loading prompt library");

        let project_config = load_project_config(&config.config_path())?;

        let function_files: Vec<PathBuf> = project_config
            .functions
            .include
            .iter()
            .map(|p| config.resolve(p))
            .collect();
        let functions = load_functions(&function_files).await?;

        let mut prompt_files = Vec::new();
        for dir in &project_config.prompts.include {
            prompt_files.extend(list_documents(&config.resolve(dir)).await?);
        }
        let prompts = load_prompts(&prompt_files, &functions).await?;

        info!(
            prompts = prompts.len(),
            functions = functions.len(),
            "prompt library loaded"
        );

        Ok(Self {
            config,
            project_config,
            prompts,
            functions,
        })
    }

    /// Returns a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a reference to the project configuration.
    pub fn project_config(&self) -> &ProjectConfig {
        &self.project_config
    }

    /// Look up a prompt definition by name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PromptNotFound` if no document declared `name`.
    pub fn prompt(&self, name: &str) -> Result<Arc<PromptDefinition>, CoreError> {
        self.prompts
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::PromptNotFound(name.to_owned()))
    }

    /// Prompt names in sorted order.
    pub fn prompt_names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    /// A fresh, unbound instance of prompt `name`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PromptNotFound` if no document declared `name`.
    pub fn instance(&self, name: &str) -> Result<PromptInstance, CoreError> {
        Ok(self.prompt(name)?.instance())
    }

    /// Bind `params` to a new instance of `name` and resolve it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PromptNotFound`, or `CoreError::Prompt` wrapping
    /// `UnknownParameter` / `MissingParameterValue`.
    #[instrument(skip(self, params))]
    pub fn render(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<RenderedMessage>, CoreError> {
        self.invoke(name, params, "")
    }

    /// Like [`render`](Self::render), with `user_message` appended as a final user turn.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    #[instrument(skip(self, params, user_message))]
    pub fn invoke(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
        user_message: &str,
    ) -> Result<Vec<RenderedMessage>, CoreError> {
        let instance = self.instance(name)?.with_parameters(params)?;
        Ok(instance.invoke(user_message)?)
    }

    /// Required parameters of `name` that `params` does not supply.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PromptNotFound` if no document declared `name`, or
    /// `CoreError::Prompt` wrapping `UnknownParameter` if a key of `params`
    /// is not a parameter of the prompt.
    pub fn check(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<ParameterDescriptor>, CoreError> {
        let instance = self.instance(name)?;
        instance.validate_overrides(params)?;
        Ok(instance
            .missing_parameters_with(params)
            .into_iter()
            .cloned()
            .collect())
    }

    /// All loaded function schemas.
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Schemas referenced by prompt `name`, in reference order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PromptNotFound` if no document declared `name`.
    pub fn functions_for(&self, name: &str) -> Result<Vec<&FunctionSchema>, CoreError> {
        let definition = self
            .prompts
            .get(name)
            .ok_or_else(|| CoreError::PromptNotFound(name.to_owned()))?;
        // References were validated at load time.
        Ok(definition
            .functions()
            .iter()
            .filter_map(|f| self.functions.get(f))
            .collect())
    }
}

/// List `*.yaml` / `*.yml` files directly under `dir`, sorted by path.
async fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let is_dir = match tokio::fs::metadata(dir).await {
        Ok(meta) => meta.is_dir(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if !is_dir {
        warn!(dir = %dir.display(), "prompt directory not found, skipping");
        return Ok(Vec::new());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        // metadata follows symlinks, unlike DirEntry::file_type
        if is_yaml && tokio::fs::metadata(&path).await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "found prompt documents");
    Ok(files)
}

async fn read_yaml<T>(path: &Path) -> Result<T, CoreError>
where
    T: serde::de::DeserializeOwned,
{
    let content = tokio::fs::read_to_string(path).await?;
    serde_yaml::from_str(&content).map_err(|source| CoreError::Document {
        path: path.to_path_buf(),
        source,
    })
}

async fn load_functions(files: &[PathBuf]) -> Result<FunctionRegistry, CoreError> {
    let documents: Vec<FunctionsDocument> =
        try_join_all(files.iter().map(|path| read_yaml(path))).await?;

    let mut registry = FunctionRegistry::new();
    for schema in documents.into_iter().flat_map(|d| d.functions) {
        registry.register(schema)?;
    }
    Ok(registry)
}

async fn load_prompts(
    files: &[PathBuf],
    functions: &FunctionRegistry,
) -> Result<BTreeMap<String, Arc<PromptDefinition>>, CoreError> {
    let documents: Vec<PromptDocument> =
        try_join_all(files.iter().map(|path| read_yaml(path))).await?;

    let mut prompts = BTreeMap::new();
    for (path, document) in files.iter().zip(documents) {
        let definition = document.to_definition().map_err(|err| match err {
            CoreError::Prompt(source) => CoreError::InvalidPrompt {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        if let Some(function) = definition
            .functions()
            .iter()
            .find(|f| !functions.contains(f))
        {
            return Err(CoreError::UnknownFunction {
                prompt: definition.name().to_owned(),
                function: function.clone(),
            });
        }

        if prompts.contains_key(definition.name()) {
            return Err(CoreError::DuplicatePrompt {
                name: definition.name().to_owned(),
                path: path.clone(),
            });
        }

        debug!(prompt = %definition.name(), path = %path.display(), "loaded prompt");
        prompts.insert(definition.name().to_owned(), Arc::new(definition));
    }
    Ok(prompts)
}
