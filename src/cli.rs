use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::compose::{self, SourceFile};
use crate::config::Config;
use crate::engine::Engine;
use crate::parser;

#[derive(Parser)]
#[command(name = "gqlplus")]
#[command(about = "GraphQL+ - orchestration scripts over a GraphQL endpoint", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GraphQL endpoint URL (overrides config file and env vars)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a script file and print its result as JSON
    Run {
        /// Script file (.gqlp)
        script: PathBuf,

        /// Run parameter, repeatable
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Query template pack (.gqlpk), repeatable
        #[arg(short = 't', long = "templates")]
        templates: Vec<PathBuf>,
    },

    /// Parse a script file and print its syntax tree as JSON
    Check {
        /// Script file (.gqlp)
        script: PathBuf,
    },

    /// Flatten service documents into one document
    Compose {
        /// Service documents
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Entry service (detected when omitted)
        #[arg(short = 'e', long = "entry")]
        entry: Option<String>,

        /// Print the lowered interpreter script instead of the document
        #[arg(long)]
        script: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, content))
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Config errors surface before any command output
    let config = Config::builder()
        .config_path(cli.config)
        .endpoint(cli.endpoint)
        .build()
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            script,
            params,
            templates,
        } => {
            let script = read_source(&script)?;
            let packs = templates
                .iter()
                .map(|path| read_source(path))
                .collect::<Result<Vec<_>>>()?;

            let engine = Engine::new(config)?;
            engine.update(std::slice::from_ref(&script), &packs);

            let name = crate::registry::script_name_from_file(&script.name);
            let params: HashMap<String, String> = params.into_iter().collect();
            let outcome = engine
                .execute(&name, params)
                .await
                .with_context(|| format!("Script '{}' failed", name))?;

            println!("{}", serde_json::to_string_pretty(&outcome.value.to_json())?);
            eprintln!(
                "✓ {} ({} queries, {} extension calls, {}ms querying)",
                outcome.output_key,
                outcome.stats.queries,
                outcome.stats.extension_calls,
                outcome.stats.query_time_ms
            );
        }

        Commands::Check { script } => {
            let source = read_source(&script)?;
            let stmts = match parser::parse(&source.content) {
                Ok(stmts) => stmts,
                Err(e) => {
                    let (line, col) = e
                        .span()
                        .map(|span| (span.start_line + 1, span.start_col + 1))
                        .unwrap_or((0, 0));
                    bail!("{}:{}:{}: {}", source.name, line, col, e.message());
                }
            };
            println!("{}", serde_json::to_string_pretty(&stmts)?);
        }

        Commands::Compose {
            files,
            entry,
            script,
        } => {
            let sources = files
                .iter()
                .map(|path| read_source(path))
                .collect::<Result<Vec<_>>>()?;

            let report = compose::compose_files(&sources, entry.as_deref())
                .context("Composition failed")?;

            if script {
                print!("{}", compose::to_script(&report.statements)?);
            } else {
                print!("{}", report.text);
            }
            eprintln!(
                "✓ Composed {} services from entry '{}'",
                report.service_count, report.entry
            );
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("city=Oslo").unwrap(),
            ("city".to_string(), "Oslo".to_string())
        );
        assert_eq!(
            parse_param("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "gqlplus",
            "--endpoint",
            "http://localhost:9000/graphql",
            "run",
            "weather.gqlp",
            "-p",
            "city=Oslo",
            "-t",
            "weather.gqlpk",
        ]);

        assert_eq!(cli.endpoint.as_deref(), Some("http://localhost:9000/graphql"));
        match cli.command {
            Commands::Run {
                script,
                params,
                templates,
            } => {
                assert_eq!(script, PathBuf::from("weather.gqlp"));
                assert_eq!(params, vec![("city".to_string(), "Oslo".to_string())]);
                assert_eq!(templates, vec![PathBuf::from("weather.gqlpk")]);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_compose_requires_files() {
        assert!(Cli::try_parse_from(["gqlplus", "compose"]).is_err());

        let cli = Cli::try_parse_from(["gqlplus", "compose", "a.gqlp", "b.gqlp", "--entry", "a", "--script"])
            .unwrap();
        match cli.command {
            Commands::Compose { files, entry, script } => {
                assert_eq!(files.len(), 2);
                assert_eq!(entry.as_deref(), Some("a"));
                assert!(script);
            }
            _ => panic!("Expected compose command"),
        }
    }
}
