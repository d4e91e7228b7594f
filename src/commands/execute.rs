// ABOUTME: Execute command - run one statement that returns no rows
// ABOUTME: Fails with a non-zero exit when the statement or the connection fails

use crate::{ConnectionParameters, DatabaseClient, LogSink};
use anyhow::{bail, Context, Result};

/// Connect and run a single command-style statement (DDL, INSERT, UPDATE, ...)
///
/// Statement failures are reported through `log_sink` by the client; this
/// function only turns them into an error for the process exit status.
pub fn execute(params: ConnectionParameters, statement: &str, log_sink: LogSink) -> Result<()> {
    tracing::info!("Connecting to {}...", params);
    let mut client =
        DatabaseClient::new(params, Some(log_sink)).context("Failed to connect to database")?;

    if !client.execute(statement) {
        bail!("Statement failed");
    }

    tracing::info!("✓ Statement executed");
    Ok(())
}
