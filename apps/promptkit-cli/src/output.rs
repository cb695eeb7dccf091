//! Formatting of resolved messages for stdout.
//!
//! JSON output is the `{role, text}` array as-is. Text output runs the
//! messages through a minijinja transcript template, which the project
//! config can replace via `output.template`.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use promptkit_core::OutputFormat;
use promptkit_pm::RenderedMessage;

/// Built-in transcript: `role: text` blocks separated by a blank line.
const TRANSCRIPT: &str =
    "{% for m in messages %}{% if not loop.first %}\n\n{% endif %}{{ m.role }}: {{ m.text }}{% endfor %}";

pub fn format_messages(
    messages: &[RenderedMessage],
    format: OutputFormat,
    template: Option<&str>,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(messages)?),
        OutputFormat::Text => render_transcript(messages, template.unwrap_or(TRANSCRIPT)),
    }
}

fn render_transcript(messages: &[RenderedMessage], source: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("transcript", source)
        .context("invalid output template")?;
    let template = env.get_template("transcript")?;
    template
        .render(context! { messages => messages })
        .context("failed to render transcript")
}
