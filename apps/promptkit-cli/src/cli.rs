use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptkit_core::{Engine, EngineConfig, OutputFormat};
use serde_json::json;
use tracing::debug;

use crate::output::format_messages;

#[derive(Debug, Parser)]
#[command(name = "promptkit", about = "Declarative multi-turn prompt templates")]
pub struct Cli {
    /// Root directory of the prompt library
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the prompts of the library
    List,

    /// Show a prompt's parameters, messages and functions as JSON
    Show {
        /// Prompt name
        name: String,
    },

    /// Report required parameters that are not supplied
    Check {
        /// Prompt name
        name: String,

        /// Parameter value as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Resolve a prompt into its final messages
    Render {
        /// Prompt name
        name: String,

        /// Parameter value as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output format (json or text), overriding the project config
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Append a final user message
        #[arg(short, long)]
        message: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let format = match &self.command {
            Commands::Render { format, .. } => *format,
            _ => None,
        };
        let config = match format {
            Some(format) => EngineConfig::builder()
                .root(self.root.clone())
                .format(format)
                .build(),
            None => EngineConfig::builder().root(self.root.clone()).build(),
        };

        let engine = Engine::new(config)
            .await
            .with_context(|| format!("failed to load prompt library at {}", self.root.display()))?;

        let ok = match self.command {
            Commands::List => list(&engine)?,
            Commands::Show { name } => show(&engine, &name)?,
            Commands::Check { name, params } => check(&engine, &name, &into_map(params))?,
            Commands::Render {
                name,
                params,
                message,
                ..
            } => render(&engine, &name, &into_map(params), message.as_deref())?,
        };
        Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

fn list(engine: &Engine) -> Result<bool> {
    for name in engine.prompt_names() {
        let definition = engine.prompt(name)?;
        println!(
            "{name}\t{} messages\t{} parameters",
            definition.messages().len(),
            definition.parameters().len()
        );
    }
    Ok(true)
}

fn show(engine: &Engine, name: &str) -> Result<bool> {
    let definition = engine.prompt(name)?;
    let functions: Vec<_> = engine
        .functions_for(name)?
        .into_iter()
        .map(|f| f.to_json())
        .collect();

    let mut value = serde_json::to_value(&*definition)?;
    value["functions"] = json!(functions);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(true)
}

fn check(engine: &Engine, name: &str, params: &BTreeMap<String, String>) -> Result<bool> {
    let missing = engine.check(name, params)?;
    if missing.is_empty() {
        println!("{name}: ready");
        return Ok(true);
    }

    println!("{name}: missing {} parameter(s)", missing.len());
    for p in &missing {
        if p.description.is_empty() {
            println!("  {} ({})", p.name, p.param_type);
        } else {
            println!("  {} ({}): {}", p.name, p.param_type, p.description);
        }
    }
    Ok(false)
}

fn render(
    engine: &Engine,
    name: &str,
    params: &BTreeMap<String, String>,
    message: Option<&str>,
) -> Result<bool> {
    let messages = engine.invoke(name, params, message.unwrap_or_default())?;
    let format = engine.project_config().effective_format(engine.config());
    debug!(prompt = name, messages = messages.len(), %format, "rendering");

    let template = engine.project_config().output.template.as_deref();
    println!("{}", format_messages(&messages, format, template)?);
    Ok(true)
}

fn into_map(params: Vec<(String, String)>) -> BTreeMap<String, String> {
    params.into_iter().collect()
}

/// Parse a `key=value` pair; the value may itself contain `=`.
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("missing parameter name in `{s}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_param_pairs() {
        assert_eq!(
            parse_param("name=Ava").expect("should parse"),
            ("name".to_owned(), "Ava".to_owned())
        );
        assert_eq!(
            parse_param("expr=a=b").expect("should parse"),
            ("expr".to_owned(), "a=b".to_owned())
        );
        assert_eq!(
            parse_param("empty=").expect("should parse"),
            ("empty".to_owned(), String::new())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_should_parse_render_command() {
        let cli = Cli::try_parse_from([
            "promptkit", "--root", "/lib", "render", "greet", "-p", "name=Ava", "--param",
            "lang=fr", "--format", "text", "-m", "hello",
        ])
        .expect("should parse args");

        assert_eq!(cli.root, PathBuf::from("/lib"));
        match cli.command {
            Commands::Render {
                name,
                params,
                format,
                message,
            } => {
                assert_eq!(name, "greet");
                assert_eq!(params.len(), 2);
                assert_eq!(format, Some(OutputFormat::Text));
                assert_eq!(message.as_deref(), Some("hello"));
            }
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn test_should_reject_bad_format_and_param() {
        assert!(Cli::try_parse_from(["promptkit", "render", "greet", "--format", "xml"]).is_err());
        assert!(Cli::try_parse_from(["promptkit", "check", "greet", "-p", "oops"]).is_err());
    }

    #[test]
    fn test_should_accept_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["promptkit", "list", "--verbose", "--root", "lib"])
            .expect("should parse args");
        assert!(cli.verbose);
        assert_eq!(cli.root, PathBuf::from("lib"));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_should_collect_params_last_wins() {
        let map = into_map(vec![
            ("a".to_owned(), "1".to_owned()),
            ("a".to_owned(), "2".to_owned()),
        ]);
        assert_eq!(map.get("a").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_should_fail_check_with_missing_parameters() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let prompts = dir.path().join("prompts");
        std::fs::create_dir_all(&prompts).expect("should create prompts dir");
        std::fs::write(
            prompts.join("greet.yaml"),
            "name: greet\nmessages:\n  - system: \"Hi {{name}}\"\n",
        )
        .expect("should write prompt");

        let config = EngineConfig::builder().root(dir.path().to_path_buf()).build();
        let engine = Engine::new(config).await.expect("should load library");

        assert!(!check(&engine, "greet", &BTreeMap::new()).expect("prompt exists"));
        let params = into_map(vec![("name".to_owned(), "Ava".to_owned())]);
        assert!(check(&engine, "greet", &params).expect("prompt exists"));
        assert!(render(&engine, "greet", &params, None).expect("should render"));
        assert!(check(&engine, "missing", &params).is_err());
    }
}
