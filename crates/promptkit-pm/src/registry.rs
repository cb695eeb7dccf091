//! Parameter descriptors and the per-definition parameter registry.
//!
//! The registry is keyed by parameter name and keeps first-registration
//! order. Auto-discovered parameters (from message placeholders) never
//! overwrite an existing entry; explicit declarations enrich one in place.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Advisory type tag of a parameter. Values are bound as strings regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    Untyped,
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untyped => "untyped",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one prompt parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Identifier, also the registry key.
    pub name: String,

    /// Advisory type tag.
    #[serde(rename = "type", default)]
    pub param_type: ParamType,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Whether a value must be bound before the prompt can be resolved.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ParameterDescriptor {
    /// A required, untyped parameter with no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParamType::Untyped,
            description: String::new(),
            required: true,
        }
    }

    #[must_use]
    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Ordered, name-unique collection of [`ParameterDescriptor`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterRegistry {
    entries: Vec<ParameterDescriptor>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `descriptor` unless its name is already known.
    ///
    /// Returns `true` when a new entry was added. An existing entry is never
    /// touched, so discovery cannot override what the author declared.
    pub fn register(&mut self, descriptor: ParameterDescriptor) -> bool {
        if self.has(&descriptor.name) {
            return false;
        }
        debug!(parameter = %descriptor.name, "registered parameter");
        self.entries.push(descriptor);
        true
    }

    /// Explicitly declare a parameter, enriching an existing entry by name.
    ///
    /// A non-`untyped` type and a non-empty description replace the stored
    /// ones; the `required` flag is always taken from the declaration. The
    /// entry keeps its original position.
    pub fn declare(&mut self, descriptor: ParameterDescriptor) {
        let Some(existing) = self.entries.iter_mut().find(|p| p.name == descriptor.name) else {
            debug!(parameter = %descriptor.name, "declared parameter");
            self.entries.push(descriptor);
            return;
        };

        if descriptor.param_type != ParamType::Untyped {
            existing.param_type = descriptor.param_type;
        }
        if !descriptor.description.is_empty() {
            existing.description = descriptor.description;
        }
        existing.required = descriptor.required;
        debug!(parameter = %existing.name, "enriched parameter");
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Descriptors in first-registration order.
    pub fn list(&self) -> &[ParameterDescriptor] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterDescriptor> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterRegistry {
    type Item = &'a ParameterDescriptor;
    type IntoIter = std::slice::Iter<'a, ParameterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
