//! Prompt definitions and the builder that assembles them.
//!
//! A [`PromptDefinition`] is the shared, read-only schema of a prompt: its
//! ordered messages, the parameters they need and the names of any function
//! schemas that accompany it. Definitions are assembled with a
//! [`PromptBuilder`] and frozen by [`PromptBuilder::build`]; nothing can be
//! registered on a definition afterwards, so every [`PromptInstance`] sees
//! the same schema.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{PromptError, Result};
use crate::instance::PromptInstance;
use crate::message::{Message, Role, ScopeRequirement};
use crate::registry::{ParamType, ParameterDescriptor, ParameterRegistry};

/// Frozen prompt schema, shared across instances.
///
/// # Examples
///
/// ```
/// use promptkit_pm::{PromptDefinition, Role};
///
/// let definition = PromptDefinition::define("greet", |p| {
///     p.system("Hi {{name}}").user("Bye {{name}}");
/// })
/// .expect("definition should build");
///
/// assert_eq!(definition.messages().len(), 2);
/// assert!(definition.parameters().has("name"));
/// assert_eq!(definition.messages_with_role(Role::User).count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDefinition {
    name: String,
    description: String,
    messages: Vec<Message>,
    parameters: ParameterRegistry,
    functions: Vec<String>,
}

impl PromptDefinition {
    /// Run `declare` against a fresh builder and build the result.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::InvalidRole` if a message was added with an
    /// unrecognized role name.
    pub fn define<F>(name: impl Into<String>, declare: F) -> Result<Self>
    where
        F: FnOnce(&mut PromptBuilder),
    {
        let mut builder = PromptBuilder::new(name);
        declare(&mut builder);
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Messages in declaration order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Names of the function schemas referenced by this prompt.
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Declared messages of one role, in declaration order.
    pub fn messages_with_role(&self, role: Role) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role() == role)
    }

    /// Create a new, unbound instance of a shared definition.
    pub fn instance(self: &Arc<Self>) -> PromptInstance {
        PromptInstance::new(Arc::clone(self))
    }
}

/// Accumulates messages and parameters for a [`PromptDefinition`].
///
/// Every method returns `&mut Self` so declarations can be chained. Errors
/// (an unknown role name) are recorded and surfaced by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct PromptBuilder {
    name: String,
    description: String,
    messages: Vec<Message>,
    parameters: ParameterRegistry,
    functions: Vec<String>,
    error: Option<PromptError>,
}

impl PromptBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Append a message and register any placeholder not yet known.
    ///
    /// Discovered parameters are required, untyped and undescribed until an
    /// explicit declaration enriches them.
    pub fn add_message(&mut self, role: Role, template: impl Into<String>) -> &mut Self {
        let message = Message::new(role, template);
        for name in message.placeholders() {
            self.parameters.register(ParameterDescriptor::new(name.as_str()));
        }
        debug!(
            prompt = %self.name,
            %role,
            placeholders = message.placeholders().len(),
            "added message"
        );
        self.messages.push(message);
        self
    }

    /// Append a message whose role is given by name.
    ///
    /// An unknown role does not add anything and makes [`build`](Self::build) fail.
    pub fn message(&mut self, role: &str, template: impl Into<String>) -> &mut Self {
        match role.parse::<Role>() {
            Ok(role) => self.add_message(role, template),
            Err(err) => {
                self.error.get_or_insert(err);
                self
            }
        }
    }

    pub fn system(&mut self, template: impl Into<String>) -> &mut Self {
        self.add_message(Role::System, template)
    }

    pub fn user(&mut self, template: impl Into<String>) -> &mut Self {
        self.add_message(Role::User, template)
    }

    pub fn agent(&mut self, template: impl Into<String>) -> &mut Self {
        self.add_message(Role::Agent, template)
    }

    /// Declare a required parameter.
    pub fn parameter(
        &mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> &mut Self {
        self.declare(
            ParameterDescriptor::new(name)
                .with_type(param_type)
                .with_description(description),
        )
    }

    /// Declare a parameter that does not need a value for resolution.
    pub fn optional_parameter(
        &mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> &mut Self {
        self.declare(
            ParameterDescriptor::new(name)
                .with_type(param_type)
                .with_description(description)
                .optional(),
        )
    }

    /// Declare a parameter, enriching any entry of the same name.
    pub fn declare(&mut self, descriptor: ParameterDescriptor) -> &mut Self {
        self.parameters.declare(descriptor);
        self
    }

    /// Reference a function schema by name.
    pub fn function(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.functions.contains(&name) {
            self.functions.push(name);
        }
        self
    }

    /// Declare a group of messages that only apply when `parameter == value`.
    ///
    /// Messages added by `declare` are captured separately, tagged with the
    /// requirement and appended where the group sits. Groups nest; inner
    /// messages carry one requirement per enclosing group, outermost first.
    /// The scope parameter is registered as optional if nothing else
    /// registered it.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptkit_pm::PromptDefinition;
    ///
    /// let definition = PromptDefinition::define("hello", |p| {
    ///     p.with_scope("lang", "fr", |p| {
    ///         p.user("Bonjour");
    ///     })
    ///     .user("Hello");
    /// })
    /// .expect("definition should build");
    ///
    /// assert!(definition.messages()[0].is_scoped());
    /// assert!(!definition.parameters().get("lang").expect("registered").required);
    /// ```
    pub fn with_scope<F>(
        &mut self,
        parameter: impl Into<String>,
        value: impl Into<String>,
        declare: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let requirement = ScopeRequirement::new(parameter, value);

        let outer = std::mem::take(&mut self.messages);
        declare(self);
        let captured = std::mem::replace(&mut self.messages, outer);

        debug!(
            prompt = %self.name,
            parameter = %requirement.parameter,
            value = %requirement.value,
            messages = captured.len(),
            "closed scope"
        );

        self.parameters
            .register(ParameterDescriptor::new(requirement.parameter.as_str()).optional());
        self.messages
            .extend(captured.into_iter().map(|m| m.within(requirement.clone())));
        self
    }

    /// Freeze the declarations into a [`PromptDefinition`].
    ///
    /// # Errors
    ///
    /// Returns the first `PromptError::InvalidRole` recorded by [`message`](Self::message).
    #[instrument(skip(self), fields(prompt = %self.name))]
    pub fn build(self) -> Result<PromptDefinition> {
        if let Some(err) = self.error {
            return Err(err);
        }
        debug!(
            messages = self.messages.len(),
            parameters = self.parameters.len(),
            "built prompt definition"
        );
        Ok(PromptDefinition {
            name: self.name,
            description: self.description,
            messages: self.messages,
            parameters: self.parameters,
            functions: self.functions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate_to() -> PromptDefinition {
        PromptDefinition::define("translate_to", |p| {
            p.system("You are a helpful assistant that translates any text to {{target_language}}.")
                .with_scope("target_language", "Spanish", |p| {
                    p.user("Translate \"hello\"").agent("Hola");
                })
                .user("Translate \"Hola\"")
                .agent("Hello")
                .parameter("language", ParamType::String, "The language to translate to.");
        })
        .expect("definition should build")
    }

    #[test]
    fn test_should_store_messages_in_declaration_order() {
        let definition = translate_to();
        let templates: Vec<_> = definition.messages().iter().map(|m| m.template()).collect();
        assert_eq!(
            templates,
            vec![
                "You are a helpful assistant that translates any text to {{target_language}}.",
                "Translate \"hello\"",
                "Hola",
                "Translate \"Hola\"",
                "Hello",
            ]
        );
        assert_eq!(definition.messages_with_role(Role::System).count(), 1);
        assert_eq!(definition.messages_with_role(Role::User).count(), 2);
        assert_eq!(definition.messages_with_role(Role::Agent).count(), 2);
    }

    #[test]
    fn test_should_tag_scoped_messages_only() {
        let definition = translate_to();
        let scoped: Vec<_> = definition.messages().iter().map(|m| m.is_scoped()).collect();
        assert_eq!(scoped, vec![false, true, true, false, false]);
        assert_eq!(
            definition.messages()[1].requirements(),
            [ScopeRequirement::new("target_language", "Spanish")]
        );
    }

    #[test]
    fn test_should_auto_discover_and_declare_parameters() {
        let definition = translate_to();
        let names: Vec<_> = definition.parameters().names().collect();
        assert_eq!(names, vec!["target_language", "language"]);

        let target = definition
            .parameters()
            .get("target_language")
            .expect("target_language should be registered");
        // Discovered from the system message before the scope opened.
        assert!(target.required);
        assert_eq!(target.param_type, ParamType::Untyped);

        let language = definition
            .parameters()
            .get("language")
            .expect("language should be registered");
        assert_eq!(language.param_type, ParamType::String);
        assert_eq!(language.description, "The language to translate to.");
    }

    #[test]
    fn test_should_not_duplicate_declared_parameter() {
        let definition = PromptDefinition::define("p", |p| {
            p.parameter("topic", ParamType::String, "What to talk about")
                .user("Tell me about {{topic}}")
                .user("More on {{topic}}, please");
        })
        .expect("definition should build");

        assert_eq!(definition.parameters().len(), 1);
        let topic = definition.parameters().get("topic").expect("registered");
        assert_eq!(topic.param_type, ParamType::String);
        assert_eq!(topic.description, "What to talk about");
    }

    #[test]
    fn test_should_accumulate_nested_scopes_outermost_first() {
        let definition = PromptDefinition::define("nested", |p| {
            p.user("before").with_scope("lang", "es", |p| {
                p.user("hola").with_scope("formal", "yes", |p| {
                    p.user("buenos días, señor");
                });
                p.user("adiós");
            });
            p.user("after");
        })
        .expect("definition should build");

        let templates: Vec<_> = definition.messages().iter().map(|m| m.template()).collect();
        assert_eq!(
            templates,
            vec!["before", "hola", "buenos días, señor", "adiós", "after"]
        );
        assert_eq!(
            definition.messages()[2].requirements(),
            [
                ScopeRequirement::new("lang", "es"),
                ScopeRequirement::new("formal", "yes"),
            ]
        );
        assert_eq!(definition.messages()[3].requirements().len(), 1);
        assert!(!definition.messages()[4].is_scoped());
    }

    #[test]
    fn test_should_register_scope_parameter_as_optional() {
        let definition = PromptDefinition::define("p", |p| {
            p.with_scope("lang", "fr", |p| {
                p.user("Bonjour");
            });
        })
        .expect("definition should build");

        let lang = definition.parameters().get("lang").expect("registered");
        assert!(!lang.required);
    }

    #[test]
    fn test_should_fail_build_on_invalid_role() {
        let result = PromptDefinition::define("p", |p| {
            p.system("ok").message("narrator", "Once upon a time").message("bot", "x");
        });
        assert!(matches!(result, Err(PromptError::InvalidRole(ref r)) if r == "narrator"));
    }

    #[test]
    fn test_should_accept_role_names() {
        let definition = PromptDefinition::define("p", |p| {
            p.message("system", "s").message("user", "u").message("agent", "a");
        })
        .expect("definition should build");
        let roles: Vec<_> = definition.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Agent]);
    }

    #[test]
    fn test_should_record_function_references_once() {
        let definition = PromptDefinition::define("p", |p| {
            p.function("get_weather").function("lookup").function("get_weather");
        })
        .expect("definition should build");
        assert_eq!(definition.functions(), ["get_weather", "lookup"]);
    }

    #[test]
    fn test_should_share_definition_across_instances() {
        let definition = Arc::new(translate_to());
        let mut first = definition.instance();
        let second = definition.instance();

        first
            .set_parameter("language", "French")
            .expect("language should be settable");
        assert_eq!(second.get_parameter("language").expect("known"), None);
        assert_eq!(Arc::strong_count(&definition), 3);
    }
}
