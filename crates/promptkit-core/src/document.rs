//! YAML prompt and function documents.
//!
//! A prompt document mirrors what a [`PromptBuilder`] call sequence would
//! declare. Each message entry is a single-key map whose key is the role,
//! or a `scope` block grouping messages under a parameter condition:
//!
//! ```yaml
//! name: translate_to
//! messages:
//!   - system: "You translate any text to {{target_language}}."
//!   - scope: { parameter: target_language, value: Spanish }
//!     messages:
//!       - user: 'Translate "hello"'
//!       - agent: Hola
//!   - user: 'Translate "Hola"'
//! parameters:
//!   - name: language
//!     type: string
//!     description: The language to translate to.
//! ```

use std::collections::BTreeMap;

use promptkit_pm::{ParameterDescriptor, PromptBuilder, PromptDefinition, ScopeRequirement};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::function::FunctionSchema;

/// A prompt definition as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDocument {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub messages: Vec<MessageEntry>,

    /// Explicit declarations, applied after the messages so they enrich
    /// discovered parameters by name.
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,

    /// Names of function schemas that accompany the prompt.
    #[serde(default)]
    pub functions: Vec<String>,
}

/// One entry of a document's `messages` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageEntry {
    /// Messages that only apply when `scope.parameter == scope.value`.
    Scope {
        scope: ScopeRequirement,
        messages: Vec<MessageEntry>,
    },
    /// `{ <role>: <template> }`.
    Message(BTreeMap<String, String>),
}

impl PromptDocument {
    /// Build the frozen definition this document describes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidMessageEntry` for a message map without
    /// exactly one key, and `CoreError::Prompt` (`InvalidRole`) for an
    /// unknown role.
    pub fn to_definition(&self) -> Result<PromptDefinition, CoreError> {
        let mut builder = PromptBuilder::new(self.name.as_str());
        builder.description(self.description.as_str());

        for entry in &self.messages {
            entry.apply(&self.name, &mut builder)?;
        }
        for descriptor in &self.parameters {
            builder.declare(descriptor.clone());
        }
        for function in &self.functions {
            builder.function(function.as_str());
        }
        Ok(builder.build()?)
    }
}

impl MessageEntry {
    fn apply(&self, prompt: &str, builder: &mut PromptBuilder) -> Result<(), CoreError> {
        match self {
            Self::Scope { scope, messages } => {
                let mut result = Ok(());
                builder.with_scope(scope.parameter.as_str(), scope.value.as_str(), |b| {
                    result = messages.iter().try_for_each(|m| m.apply(prompt, b));
                });
                result
            }
            Self::Message(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((role, template)), None) => {
                        builder.message(role, template.as_str());
                        Ok(())
                    }
                    _ => Err(CoreError::InvalidMessageEntry {
                        prompt: prompt.to_owned(),
                        keys: map.len(),
                    }),
                }
            }
        }
    }
}

/// A YAML file declaring function schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionsDocument {
    #[serde(default)]
    pub functions: Vec<FunctionSchema>,
}

#[cfg(test)]
mod tests {
    use promptkit_pm::{ParamType, PromptError, Role};

    use super::*;

    const TRANSLATE_TO: &str = r#"
name: translate_to
description: Translate between languages
messages:
  - system: "You are a helpful assistant that translates any text to {{target_language}}."
  - scope: { parameter: target_language, value: Spanish }
    messages:
      - user: 'Translate "hello"'
      - agent: Hola
  - user: 'Translate "Hola"'
  - agent: Hello
parameters:
  - name: language
    type: string
    description: The language to translate to.
functions: [lookup_word]
"#;

    #[test]
    fn test_should_build_definition_from_yaml() {
        let doc: PromptDocument = serde_yaml::from_str(TRANSLATE_TO).expect("should parse YAML");
        let definition = doc.to_definition().expect("should build definition");

        assert_eq!(definition.name(), "translate_to");
        assert_eq!(definition.description(), "Translate between languages");
        assert_eq!(definition.messages().len(), 5);
        assert_eq!(definition.messages_with_role(Role::Agent).count(), 2);
        assert_eq!(
            definition.messages()[2].requirements(),
            [ScopeRequirement::new("target_language", "Spanish")]
        );
        assert_eq!(definition.functions(), ["lookup_word"]);

        let names: Vec<_> = definition.parameters().names().collect();
        assert_eq!(names, vec!["target_language", "language"]);
        let language = definition.parameters().get("language").expect("declared");
        assert_eq!(language.param_type, ParamType::String);
    }

    #[test]
    fn test_should_enrich_discovered_parameter() {
        let yaml = r#"
name: summarize
messages:
  - user: "Summarize {{text}} in a {{tone}} tone"
parameters:
  - name: tone
    type: string
    description: Tone of voice
    required: false
"#;
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        let definition = doc.to_definition().expect("should build definition");

        assert_eq!(definition.parameters().len(), 2);
        let tone = definition.parameters().get("tone").expect("registered");
        assert_eq!(tone.description, "Tone of voice");
        assert!(!tone.required);
    }

    #[test]
    fn test_should_nest_scopes() {
        let yaml = r#"
name: nested
messages:
  - scope: { parameter: lang, value: es }
    messages:
      - scope: { parameter: formal, value: "yes" }
        messages:
          - user: Buenos días
"#;
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        let definition = doc.to_definition().expect("should build definition");
        assert_eq!(
            definition.messages()[0].requirements(),
            [
                ScopeRequirement::new("lang", "es"),
                ScopeRequirement::new("formal", "yes"),
            ]
        );
    }

    #[test]
    fn test_should_accept_unquoted_scope_values() {
        let yaml = r#"
name: counted
messages:
  - scope: { parameter: count, value: 2 }
    messages:
      - user: "Pick {{count}} items"
"#;
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        let definition = std::sync::Arc::new(doc.to_definition().expect("should build definition"));
        assert_eq!(
            definition.messages()[0].requirements(),
            [ScopeRequirement::new("count", "2")]
        );

        let mut prompt = definition.instance();
        prompt.set_parameter("count", "2").expect("count is a parameter");
        let resolved = prompt.resolve().expect("should resolve");
        assert_eq!(resolved[0].text, "Pick 2 items");
    }

    #[test]
    fn test_should_fail_on_invalid_role() {
        let yaml = "name: bad\nmessages:\n  - narrator: Once upon a time\n";
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        let result = doc.to_definition();
        assert!(matches!(
            result,
            Err(CoreError::Prompt(PromptError::InvalidRole(ref r))) if r == "narrator"
        ));
    }

    #[test]
    fn test_should_fail_on_invalid_role_inside_scope() {
        let yaml = r#"
name: bad
messages:
  - scope: { parameter: lang, value: fr }
    messages:
      - bot: Bonjour
"#;
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        assert!(matches!(
            doc.to_definition(),
            Err(CoreError::Prompt(PromptError::InvalidRole(_)))
        ));
    }

    #[test]
    fn test_should_reject_message_with_several_roles() {
        let yaml = "name: bad\nmessages:\n  - user: a\n    agent: b\n";
        let doc: PromptDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        assert!(matches!(
            doc.to_definition(),
            Err(CoreError::InvalidMessageEntry { keys: 2, .. })
        ));
    }

    #[test]
    fn test_should_parse_functions_document() {
        let yaml = r#"
functions:
  - name: lookup_word
    description: Dictionary lookup
    parameters:
      - name: word
        required: true
        type: string
"#;
        let doc: FunctionsDocument = serde_yaml::from_str(yaml).expect("should parse YAML");
        assert_eq!(doc.functions.len(), 1);
        assert_eq!(doc.functions[0].name, "lookup_word");
    }
}
