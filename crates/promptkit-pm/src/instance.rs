//! Per-invocation parameter binding and message resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::definition::PromptDefinition;
use crate::error::{PromptError, Result};
use crate::message::{Message, RenderedMessage, Role};
use crate::parser::{Segment, segments};
use crate::registry::ParameterDescriptor;

/// Readiness of a [`PromptInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// At least one required parameter has no value.
    Unbound,
    /// Every required parameter has a value.
    Ready,
}

/// Parameter values bound against a shared [`PromptDefinition`].
///
/// Only parameters known to the definition can be bound. The instance can be
/// rebound any number of times; readiness is derived from the current values.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use promptkit_pm::{PromptDefinition, RenderedMessage, Role};
///
/// let definition = Arc::new(
///     PromptDefinition::define("greet", |p| {
///         p.system("Hi {{name}}").user("Bye {{name}}");
///     })
///     .expect("definition should build"),
/// );
///
/// let mut prompt = definition.instance();
/// assert!(prompt.resolve().is_err());
///
/// prompt.set_parameter("name", "Ava").expect("name is a parameter");
/// assert_eq!(
///     prompt.resolve().expect("all parameters bound"),
///     vec![
///         RenderedMessage::new(Role::System, "Hi Ava"),
///         RenderedMessage::new(Role::User, "Bye Ava"),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PromptInstance {
    definition: Arc<PromptDefinition>,
    values: BTreeMap<String, String>,
}

impl PromptInstance {
    pub fn new(definition: Arc<PromptDefinition>) -> Self {
        Self {
            definition,
            values: BTreeMap::new(),
        }
    }

    pub fn definition(&self) -> &Arc<PromptDefinition> {
        &self.definition
    }

    /// Bind `value` to the parameter `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` if the definition has no such parameter.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.ensure_known(name)?;
        let value = value.into();
        debug!(prompt = %self.definition.name(), parameter = name, "bound parameter");
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// Bind several parameters at once, stopping at the first unknown name.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` for the first unknown name.
    /// Values bound before it stay bound.
    pub fn with_parameters<I, K, V>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in values {
            self.set_parameter(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Current value of `name`; `None` means not yet bound.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` if the definition has no such parameter.
    pub fn get_parameter(&self, name: &str) -> Result<Option<&str>> {
        self.ensure_known(name)?;
        Ok(self.values.get(name).map(String::as_str))
    }

    /// Unbind `name`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` if the definition has no such parameter.
    pub fn clear_parameter(&mut self, name: &str) -> Result<Option<String>> {
        self.ensure_known(name)?;
        Ok(self.values.remove(name))
    }

    pub fn bound_values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Required parameters that have no bound value, in registry order.
    pub fn missing_parameters(&self) -> Vec<&ParameterDescriptor> {
        self.missing_parameters_with(&BTreeMap::new())
    }

    /// Like [`missing_parameters`](Self::missing_parameters), but a parameter
    /// present in `overrides` also counts as supplied.
    ///
    /// The overrides are only consulted; they are never stored or rendered.
    pub fn missing_parameters_with(
        &self,
        overrides: &BTreeMap<String, String>,
    ) -> Vec<&ParameterDescriptor> {
        self.definition
            .parameters()
            .iter()
            .filter(|p| p.required)
            .filter(|p| !overrides.contains_key(&p.name) && !self.values.contains_key(&p.name))
            .collect()
    }

    pub fn state(&self) -> InstanceState {
        if self.missing_parameters().is_empty() {
            InstanceState::Ready
        } else {
            InstanceState::Unbound
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == InstanceState::Ready
    }

    /// Filter scoped messages and substitute bound values.
    ///
    /// A scoped message is kept only when every one of its requirements
    /// matches the bound value of its parameter.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingParameterValue` listing every unbound
    /// required parameter, or `PromptError::UnregisteredPlaceholder` if a
    /// template references a name the registry does not know.
    pub fn resolve(&self) -> Result<Vec<RenderedMessage>> {
        self.ensure_ready(&BTreeMap::new())?;
        self.render_in_scope()
    }

    /// Resolve, then append `user_message` as a final user turn when it is non-empty.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn invoke(&self, user_message: &str) -> Result<Vec<RenderedMessage>> {
        self.invoke_with(user_message, &BTreeMap::new())
    }

    /// Like [`invoke`](Self::invoke), but parameters present in `overrides`
    /// count as supplied for the readiness check.
    ///
    /// Overrides are never stored or substituted: a placeholder supplied only
    /// through `overrides` keeps its marker text.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` for the first override the
    /// definition does not declare, then the errors of [`resolve`](Self::resolve).
    pub fn invoke_with(
        &self,
        user_message: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Vec<RenderedMessage>> {
        self.validate_overrides(overrides)?;
        self.ensure_ready(overrides)?;

        let mut messages = self.render_in_scope()?;
        if !user_message.is_empty() {
            messages.push(RenderedMessage::new(Role::User, user_message));
        }
        Ok(messages)
    }

    /// Check that every key of `overrides` names a declared parameter.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownParameter` for the first unknown key.
    pub fn validate_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<()> {
        overrides.keys().try_for_each(|name| self.ensure_known(name))
    }

    /// All declared messages of `role`, scoped or not, with bound values substituted.
    ///
    /// Unbound placeholders are left as written.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnregisteredPlaceholder` if a template references
    /// a name the registry does not know.
    pub fn messages_by_role(&self, role: Role) -> Result<Vec<RenderedMessage>> {
        self.definition
            .messages_with_role(role)
            .map(|m| self.render(m))
            .collect()
    }

    pub fn system_messages(&self) -> Result<Vec<RenderedMessage>> {
        self.messages_by_role(Role::System)
    }

    pub fn user_messages(&self) -> Result<Vec<RenderedMessage>> {
        self.messages_by_role(Role::User)
    }

    pub fn agent_messages(&self) -> Result<Vec<RenderedMessage>> {
        self.messages_by_role(Role::Agent)
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        if self.definition.parameters().has(name) {
            Ok(())
        } else {
            Err(PromptError::UnknownParameter(name.to_owned()))
        }
    }

    fn ensure_ready(&self, overrides: &BTreeMap<String, String>) -> Result<()> {
        let missing = self.missing_parameters_with(overrides);
        if missing.is_empty() {
            return Ok(());
        }
        Err(PromptError::MissingParameterValue {
            missing: missing.into_iter().cloned().collect(),
        })
    }

    #[instrument(skip(self), fields(prompt = %self.definition.name()))]
    fn render_in_scope(&self) -> Result<Vec<RenderedMessage>> {
        let mut rendered = Vec::with_capacity(self.definition.messages().len());
        for message in self.definition.messages() {
            if !self.in_scope(message) {
                debug!(role = %message.role(), "skipped out-of-scope message");
                continue;
            }
            rendered.push(self.render(message)?);
        }
        debug!(messages = rendered.len(), "resolved prompt");
        Ok(rendered)
    }

    fn in_scope(&self, message: &Message) -> bool {
        message
            .requirements()
            .iter()
            .all(|r| self.values.get(&r.parameter) == Some(&r.value))
    }

    fn render(&self, message: &Message) -> Result<RenderedMessage> {
        let mut text = String::with_capacity(message.template().len());
        for segment in segments(message.template()) {
            match segment {
                Segment::Text(literal) => text.push_str(literal),
                Segment::Placeholder { name, raw } => {
                    if !self.definition.parameters().has(name) {
                        return Err(PromptError::UnregisteredPlaceholder(name.to_owned()));
                    }
                    text.push_str(self.values.get(name).map_or(raw, String::as_str));
                }
            }
        }
        Ok(RenderedMessage::new(message.role(), text))
    }
}
