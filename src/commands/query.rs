// ABOUTME: Query command - run one statement and print its result table
// ABOUTME: Writes the comma-delimited table to the given output

use crate::{ConnectionParameters, DatabaseClient, LogSink};
use anyhow::{Context, Result};
use std::io::Write;

/// Connect, run `statement`, and write the result table to `out`
///
/// Statements that return no rows print nothing.
pub fn query<W: Write>(
    params: ConnectionParameters,
    statement: &str,
    log_sink: LogSink,
    out: &mut W,
) -> Result<()> {
    tracing::info!("Connecting to {}...", params);
    let mut client =
        DatabaseClient::new(params, Some(log_sink)).context("Failed to connect to database")?;

    let table = client.query(statement).context("Query failed")?;
    tracing::info!(
        "✓ {} row(s), {} column(s)",
        table.row_count(),
        table.column_count()
    );

    out.write_all(table.to_text().as_bytes())
        .context("Failed to write result table")?;
    out.flush().context("Failed to flush output")?;
    Ok(())
}
