//! Prompt model for promptkit.
//!
//! Declares multi-turn, role-tagged prompts whose messages contain `{{name}}`
//! placeholders, collects those names into a parameter registry, and resolves
//! the messages once every required parameter is bound.
//!
//! ```
//! use std::sync::Arc;
//! use promptkit_pm::{ParamType, PromptDefinition};
//!
//! let definition = Arc::new(PromptDefinition::define("translate_to", |p| {
//!     p.system("You translate any text to {{language}}.")
//!         .with_scope("language", "Spanish", |p| {
//!             p.user("Translate \"hello\"").agent("Hola");
//!         })
//!         .user("Translate {{text}}")
//!         .parameter("language", ParamType::String, "The language to translate to.");
//! })?);
//!
//! let mut prompt = definition.instance();
//! prompt.set_parameter("language", "French")?;
//! prompt.set_parameter("text", "\"Hola\"")?;
//! let messages = prompt.resolve()?;
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[1].text, "Translate \"Hola\"");
//! # Ok::<(), promptkit_pm::PromptError>(())
//! ```

mod definition;
mod error;
mod instance;
mod message;
mod parser;
mod registry;

pub use definition::{PromptBuilder, PromptDefinition};
pub use error::{PromptError, Result};
pub use instance::{InstanceState, PromptInstance};
pub use message::{Message, RenderedMessage, Role, ScopeRequirement};
pub use parser::{Segment, extract_placeholders, is_identifier, segments};
pub use registry::{ParamType, ParameterDescriptor, ParameterRegistry};
