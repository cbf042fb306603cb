//! rdq: run SQL through a Redash server from the command line.
//!
//! # Commands
//!
//! - `query`: Execute a statement and print the complete result.
//! - `paginate`: Stream a large result page by page, optionally keyed on a cursor column.
//! - `data-sources`: List the data sources visible to the API key.
//! - `queries`: List saved queries on the data source (`--mine`, `--all`).
//! - `users`: List user accounts.
//! - `show-query`: Print the stored result of a saved query or result id.
//!
//! Connection settings come from the `--config` file, `REDASH_*` environment
//! variables (a `.env` file is honoured) and the flags below, in increasing priority.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;
use redash_common::config::AppConfig;
use redash_common::logging::init_logging;
use redash_common::models::Dialect;
use redash_core::{QueryScope, QuerySession};
use secrecy::SecretString;

mod commands;
mod exit_codes;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "rdq")]
#[command(about = "Run SQL through the Redash API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "REDASH_CONFIG", default_value = "redash.toml")]
    config: String,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Redash host, overrides the configuration
    #[arg(long, global = true)]
    host: Option<String>,

    /// API key, overrides the configuration
    #[arg(long, global = true, env = "REDASH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Data source name, overrides the configuration
    #[arg(long, global = true)]
    data_source: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a statement and print its result
    Query {
        /// SQL text
        sql: String,
    },
    /// Stream a result in bounded pages
    Paginate {
        /// SQL text
        sql: String,
        /// Monotonic, non-null column used to chain pages
        #[arg(long)]
        cursor: Option<String>,
        /// Pagination clause flavor; derived from the data source when omitted
        #[arg(long)]
        dialect: Option<Dialect>,
        /// Rows per page
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// List data sources
    DataSources,
    /// List saved queries on the configured data source
    Queries {
        /// Only queries owned by the API key's user
        #[arg(long, conflicts_with = "all")]
        mine: bool,
        /// Queries on every data source
        #[arg(long)]
        all: bool,
    },
    /// List users
    Users,
    /// Print the stored result of a saved query, or of a result id
    ShowQuery {
        /// Saved query id (falls back to a query result id)
        id: i64,
    },
}

impl Commands {
    fn query_scope(mine: bool, all: bool) -> QueryScope {
        match (mine, all) {
            (true, _) => QueryScope::Mine,
            (_, true) => QueryScope::All,
            _ => QueryScope::DataSource,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    let exit_code = match run_cli(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let exit_code = exit_codes::map_error(&e);
            if cli.output.is_machine_readable() {
                output::print_error(cli.output, &e.to_string(), exit_code).ok();
            } else {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
            exit_code
        }
    };
    std::process::exit(exit_code);
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(host) = &cli.host {
        config.connection.host = host.clone();
    }
    if let Some(token) = &cli.token {
        config.connection.token = Some(SecretString::from(token.clone()));
    }
    if let Some(data_source) = &cli.data_source {
        config.connection.data_source = Some(data_source.clone());
    }
    if let Commands::Paginate {
        page_size: Some(size),
        ..
    } = &cli.command
    {
        config.execution.page_size = *size;
    }
    config.validated()
}

async fn run_cli(cli: &Cli) -> anyhow::Result<i32> {
    let config = load_config(cli)?;
    init_logging(&config.logging)?;

    match &cli.command {
        Commands::Query { sql } => {
            let session = QuerySession::connect(&config).await?;
            commands::query(&session, sql, cli.output).await
        }
        Commands::Paginate {
            sql,
            cursor,
            dialect,
            ..
        } => {
            let session = QuerySession::connect(&config).await?;
            commands::paginate(&session, sql, cursor.as_deref(), *dialect, cli.output).await
        }
        Commands::DataSources => commands::data_sources(&config.connection, cli.output).await,
        Commands::Queries { mine, all } => {
            let session = QuerySession::connect(&config).await?;
            let scope = Commands::query_scope(*mine, *all);
            commands::queries(&session, scope, cli.output).await
        }
        Commands::Users => {
            let session = QuerySession::connect(&config).await?;
            commands::users(&session, cli.output).await
        }
        Commands::ShowQuery { id } => {
            let session = QuerySession::connect(&config).await?;
            commands::show_query(&session, *id, cli.output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_paginate_arguments() {
        let cli = Cli::try_parse_from([
            "rdq",
            "--output",
            "json",
            "paginate",
            "SELECT * FROM events",
            "--cursor",
            "id",
            "--dialect",
            "offset-fetch",
            "--page-size",
            "500",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Paginate {
                cursor,
                dialect,
                page_size,
                ..
            } => {
                assert_eq!(cursor.as_deref(), Some("id"));
                assert_eq!(dialect, Some(Dialect::OffsetFetch));
                assert_eq!(page_size, Some(500));
            }
            _ => panic!("expected paginate"),
        }
    }

    #[test]
    fn test_query_listing_scope_flags() {
        let scope_of = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Commands::Queries { mine, all } => Commands::query_scope(mine, all),
                _ => panic!("expected queries"),
            }
        };
        assert_eq!(scope_of(&["rdq", "queries"]), QueryScope::DataSource);
        assert_eq!(scope_of(&["rdq", "queries", "--mine"]), QueryScope::Mine);
        assert_eq!(scope_of(&["rdq", "queries", "--all"]), QueryScope::All);
        assert!(Cli::try_parse_from(["rdq", "queries", "--mine", "--all"]).is_err());
    }

    #[test]
    fn test_show_query_takes_an_id() {
        let cli = Cli::try_parse_from(["rdq", "show-query", "55"]).unwrap();
        assert!(matches!(cli.command, Commands::ShowQuery { id: 55 }));
        assert!(Cli::try_parse_from(["rdq", "show-query", "latest"]).is_err());
    }

    #[test]
    fn test_flags_override_configuration() {
        let cli = Cli::try_parse_from([
            "rdq",
            "--config",
            "/nonexistent/redash.toml",
            "--host",
            "redash.example.com",
            "--data-source",
            "ledger",
            "paginate",
            "SELECT 1",
            "--page-size",
            "25",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.connection.host, "redash.example.com");
        assert_eq!(config.connection.data_source.as_deref(), Some("ledger"));
        assert_eq!(config.execution.page_size, 25);
    }
}
