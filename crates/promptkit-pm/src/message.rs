//! Role-tagged message templates.
//!
//! A [`Message`] is immutable once built: it records its role, the raw
//! template, the placeholder names found in that template and the scope
//! requirements it inherited from enclosing `with_scope` groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PromptError;
use crate::parser::extract_placeholders;

/// Speaker of a message in a multi-turn prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// A turn written by the user.
    User,
    /// A turn written by the assistant.
    Agent,
}

impl Role {
    /// All roles, in canonical order.
    pub const ALL: [Role; 3] = [Role::System, Role::User, Role::Agent];

    /// Lowercase role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            other => Err(PromptError::InvalidRole(other.to_owned())),
        }
    }
}

/// Condition gating a scoped message: `parameter` must be bound to `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequirement {
    /// Name of the parameter the condition reads.
    pub parameter: String,
    /// Value the parameter must be bound to.
    ///
    /// Deserializes from any scalar, so `value: 2` and `value: true` match
    /// the bound strings `"2"` and `"true"`.
    #[serde(deserialize_with = "scalar_to_string")]
    pub value: String,
}

fn scalar_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Bool(bool),
        Int(i64),
        UInt(u64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::UInt(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
    })
}

impl ScopeRequirement {
    pub fn new(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// A declared message: a role plus an unrendered template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    template: String,
    placeholders: Vec<String>,
    requirements: Vec<ScopeRequirement>,
}

impl Message {
    /// Parse `template` and build an unscoped message.
    pub fn new(role: Role, template: impl Into<String>) -> Self {
        let template = template.into();
        let placeholders = extract_placeholders(&template);
        Self {
            role,
            template,
            placeholders,
            requirements: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Distinct placeholder names, in first-occurrence order.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Scope requirements, outermost scope first.
    pub fn requirements(&self) -> &[ScopeRequirement] {
        &self.requirements
    }

    pub fn is_scoped(&self) -> bool {
        !self.requirements.is_empty()
    }

    /// Wrap the message in one more (outer) scope.
    pub(crate) fn within(mut self, requirement: ScopeRequirement) -> Self {
        self.requirements.insert(0, requirement);
        self
    }
}

/// A message after scope filtering and placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub text: String,
}

impl RenderedMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}
