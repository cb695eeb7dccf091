//! Function (tool) schemas that can accompany a prompt.
//!
//! A [`FunctionSchema`] describes a callable the model may request: a unique
//! identifier plus an ordered list of typed, described parameters. Names are
//! unique within a [`FunctionRegistry`], which the [`Engine`](crate::Engine)
//! owns; there is no process-wide list.

use promptkit_pm::{ParamType, is_identifier};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::CoreError;

/// A single parameter of a function schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct FunctionParameter {
    #[builder(setter(into))]
    pub name: String,

    #[builder(default)]
    #[serde(default)]
    pub required: bool,

    #[builder(default)]
    #[serde(rename = "type", default)]
    pub param_type: ParamType,

    #[builder(default, setter(into))]
    #[serde(default)]
    pub description: String,
}

/// A named, described function with ordered parameters.
///
/// # Examples
///
/// ```
/// use promptkit_core::{FunctionParameter, FunctionSchema};
/// use promptkit_pm::ParamType;
///
/// let schema = FunctionSchema::builder()
///     .name("get_weather")
///     .description("Current weather for a city")
///     .parameters(vec![
///         FunctionParameter::builder()
///             .name("city")
///             .required(true)
///             .param_type(ParamType::String)
///             .build(),
///     ])
///     .build();
///
/// assert_eq!(schema.to_json()["parameters"][0]["type"], "string");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct FunctionSchema {
    #[builder(setter(into))]
    pub name: String,

    #[builder(default, setter(into))]
    #[serde(default)]
    pub description: String,

    #[builder(default)]
    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,
}

impl FunctionSchema {
    /// Parameters that must be supplied when the function is called.
    pub fn required_parameters(&self) -> impl Iterator<Item = &FunctionParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// JSON view handed to collaborators that declare tools to a model backend.
    pub fn to_json(&self) -> Value {
        let parameters: Vec<Value> = self
            .parameters
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "required": p.required,
                    "type": p.param_type.as_str(),
                    "description": p.description,
                })
            })
            .collect();
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": parameters,
        })
    }
}

/// Name-unique collection of function schemas, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Vec<FunctionSchema>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidFunctionName` if the name is not an
    /// identifier, or `CoreError::FunctionNameTaken` if it is already registered.
    pub fn register(&mut self, schema: FunctionSchema) -> Result<(), CoreError> {
        validate_function_name(&schema.name)?;
        if self.contains(&schema.name) {
            return Err(CoreError::FunctionNameTaken(schema.name));
        }
        debug!(function = %schema.name, "registered function");
        self.functions.push(schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSchema> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FunctionSchema> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Check that `name` is a valid function identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// # Errors
///
/// Returns `CoreError::InvalidFunctionName` otherwise.
pub fn validate_function_name(name: &str) -> Result<(), CoreError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(CoreError::InvalidFunctionName(name.to_owned()))
    }
}

/// Derive a default function name from a type name.
///
/// Only the last `::` path segment is used; word boundaries in camel case
/// become underscores, dashes become underscores and the result is lowercase.
///
/// # Examples
///
/// ```
/// use promptkit_core::snake_case;
///
/// assert_eq!(snake_case("GetWeather"), "get_weather");
/// assert_eq!(snake_case("tools::HTTPServer"), "http_server");
/// ```
pub fn snake_case(type_name: &str) -> String {
    let last = type_name.rsplit("::").next().unwrap_or(type_name);
    let chars: Vec<char> = last.chars().collect();
    let mut out = String::with_capacity(last.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            // `aB` / `1B`, and the last capital of an acronym before a word: `HTTPServer`.
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        match c {
            '-' => out.push('_'),
            _ => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}
