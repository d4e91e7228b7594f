// ABOUTME: CLI entry point for pgtab
// ABOUTME: Resolves connection parameters and routes to the execute or query command

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pgtab::{commands, ConnectionParameters, LogSink, SslMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgtab")]
#[command(about = "Run PostgreSQL statements and print results as comma-delimited tables", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// TOML file with a [database] table; takes precedence over the connection
    /// flags, though a missing password still falls back to PGPASSWORD
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database server host (port is always 5432) [default: localhost]
    #[arg(long, env = "PGHOST", global = true)]
    host: Option<String>,
    #[arg(long, env = "PGUSER", global = true)]
    user: Option<String>,
    #[arg(long, env = "PGPASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
    /// Database name (defaults to the user name)
    #[arg(long, env = "PGDATABASE", global = true)]
    dbname: Option<String>,
    /// disable, prefer, require, or verify-full [default: prefer]
    #[arg(long, env = "PGSSLMODE", global = true)]
    sslmode: Option<SslMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statement that returns no rows (DDL, INSERT, UPDATE, ...)
    Execute {
        /// SQL statement
        statement: String,
    },
    /// Run a statement and print its result as a comma-delimited table
    Query {
        /// SQL statement
        statement: String,
    },
}

impl ConnectionArgs {
    fn resolve(self) -> anyhow::Result<ConnectionParameters> {
        if let Some(path) = self.config {
            return ConnectionParameters::load_from_file(path);
        }

        let params =
            ConnectionParameters::from_parts(self.host, self.user, self.password, self.dbname)
                .context("Invalid connection parameters. Pass --user, set PGUSER, or use --config")?
                .with_ssl_mode(self.sslmode.unwrap_or_default())
                .with_application_name("pgtab");
        Ok(params)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set.
    // Logs go to stderr so query output on stdout stays a clean table.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let params = cli.connection.resolve()?;
    let log_sink = LogSink::tracing();

    match cli.command {
        Commands::Execute { statement } => commands::execute(params, &statement, log_sink),
        Commands::Query { statement } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            commands::query(params, &statement, log_sink, &mut out)
        }
    }
}
