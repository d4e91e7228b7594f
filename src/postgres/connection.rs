// ABOUTME: Blocking PostgreSQL session built on tokio-postgres with TLS support
// ABOUTME: Drives each connection on its own current-thread runtime and decodes text-mode results

use crate::config::{ConnectionParameters, SslMode};
use crate::error::StatementError;
use crate::session::{Connector, ResultStatus, Session, StatementOutcome};
use crate::table::Table;
use anyhow::{anyhow, Context, Result};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, SimpleQueryMessage};

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Opens [`PgSession`]s; the connector used by [`DatabaseClient::new`](crate::DatabaseClient::new).
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl Connector for PgConnector {
    fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn Session>> {
        Ok(Box::new(connect(params)?))
    }
}

/// One live connection plus the runtime that drives it.
///
/// Every call blocks the current thread. Calling into a session from inside
/// another tokio runtime panics, as with any nested `block_on`.
pub struct PgSession {
    client: Option<Client>,
    connection_task: Option<JoinHandle<()>>,
    runtime: Runtime,
}

/// Connect to PostgreSQL with the SSL mode from `params`
pub fn connect(params: &ConnectionParameters) -> Result<PgSession> {
    let session = open(&build_config(params), params.ssl_mode())?;
    tracing::debug!("Connected to {}", params);
    Ok(session)
}

fn open(config: &tokio_postgres::Config, ssl_mode: SslMode) -> Result<PgSession> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start connection runtime")?;

    let tls = make_tls(ssl_mode)?;

    let (client, connection) = runtime
        .block_on(config.connect(tls))
        .map_err(|e| anyhow!(describe_connect_error(&error_chain(&e))))?;

    // The connection only makes progress while a call is blocking on the runtime
    let connection_task = runtime.spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", error_chain(&e));
        }
    });

    Ok(PgSession {
        client: Some(client),
        connection_task: Some(connection_task),
        runtime,
    })
}

/// Whether the TLS handshake checks the server certificate and host name.
///
/// `prefer` and `require` only ask for encryption, as libpq does.
fn verifies_server(ssl_mode: SslMode) -> bool {
    matches!(ssl_mode, SslMode::VerifyFull)
}

fn make_tls(ssl_mode: SslMode) -> Result<MakeTlsConnector> {
    let verify = verifies_server(ssl_mode);
    let tls_connector = TlsConnector::builder()
        .danger_accept_invalid_certs(!verify)
        .danger_accept_invalid_hostnames(!verify)
        .build()
        .context("Failed to build TLS connector")?;
    Ok(MakeTlsConnector::new(tls_connector))
}

fn driver_ssl_mode(ssl_mode: SslMode) -> tokio_postgres::config::SslMode {
    match ssl_mode {
        SslMode::Disable => tokio_postgres::config::SslMode::Disable,
        SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
        SslMode::Require | SslMode::VerifyFull => tokio_postgres::config::SslMode::Require,
    }
}

fn build_config(params: &ConnectionParameters) -> tokio_postgres::Config {
    config_for_port(params, params.port())
}

fn config_for_port(params: &ConnectionParameters, port: u16) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .host(params.host())
        .port(port)
        .user(params.user())
        .dbname(params.dbname())
        .ssl_mode(driver_ssl_mode(params.ssl_mode()));

    if !params.password().is_empty() {
        config.password(params.password());
    }
    if let Some(name) = params.application_name() {
        config.application_name(name);
    }
    config
}

/// Driver error text followed by every underlying cause.
///
/// The driver's own message stops at "error connecting to server"; the OS or
/// TLS reason lives in the source chain.
fn error_chain(e: &tokio_postgres::Error) -> String {
    let mut text = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = std::error::Error::source(cause);
    }
    text
}

/// Turn a raw driver error into a one-line reason a person can act on
fn describe_connect_error(error_msg: &str) -> String {
    if error_msg.contains("password authentication failed") {
        format!(
            "Authentication failed: invalid username or password ({})",
            error_msg
        )
    } else if error_msg.contains("database") && error_msg.contains("does not exist") {
        format!("Database does not exist: {}", error_msg)
    } else if error_msg.contains("Connection refused") || error_msg.contains("could not connect")
    {
        format!(
            "Connection refused: check that the host is correct and the server is running ({})",
            error_msg
        )
    } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
        format!(
            "Connection timeout: database server did not respond in time ({})",
            error_msg
        )
    } else if error_msg.contains("SSL") || error_msg.contains("TLS") {
        format!(
            "TLS/SSL error: failed to establish secure connection ({})",
            error_msg
        )
    } else if error_msg.contains("no pg_hba.conf entry") {
        format!(
            "Access denied: no pg_hba.conf entry for this host ({})",
            error_msg
        )
    } else {
        format!("Failed to connect to database: {}", error_msg)
    }
}

fn statement_error(e: tokio_postgres::Error) -> StatementError {
    if let Some(db) = e.as_db_error() {
        let mut message = format!("{}: {}", db.severity(), db.message());
        if let Some(detail) = db.detail() {
            message.push_str(&format!(" (DETAIL: {})", detail));
        }
        StatementError::new(ResultStatus::FatalError, message).with_sqlstate(db.code().code())
    } else if e.is_closed() {
        StatementError::new(
            ResultStatus::FatalError,
            format!("server closed the connection unexpectedly: {}", e),
        )
    } else {
        StatementError::new(ResultStatus::BadResponse, e.to_string())
    }
}

/// Folds simple-query messages into the outcome of the last statement
#[derive(Debug, Default)]
struct OutcomeBuilder {
    current: Option<Table>,
    last: Option<StatementOutcome>,
}

impl OutcomeBuilder {
    fn describe(&mut self, columns: Vec<String>) {
        self.current = Some(Table::new(columns));
    }

    fn row<F>(&mut self, columns: F, cells: Vec<String>)
    where
        F: FnOnce() -> Vec<String>,
    {
        self.current
            .get_or_insert_with(|| Table::new(columns()))
            .push_row(cells);
    }

    fn complete(&mut self, rows_affected: u64) {
        self.last = Some(match self.current.take() {
            Some(table) => StatementOutcome::Rows(table),
            None => StatementOutcome::Command { rows_affected },
        });
    }

    fn finish(self) -> std::result::Result<StatementOutcome, StatementError> {
        self.last
            .ok_or_else(|| StatementError::new(ResultStatus::EmptyQuery, "empty query"))
    }
}

fn collect_outcome(
    messages: Vec<SimpleQueryMessage>,
) -> std::result::Result<StatementOutcome, StatementError> {
    let mut builder = OutcomeBuilder::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                builder.describe(columns.iter().map(|c| c.name().to_string()).collect());
            }
            SimpleQueryMessage::Row(row) => {
                // NULL comes back as None and is rendered as an empty cell
                let cells = (0..row.len())
                    .map(|i| row.get(i).unwrap_or_default().to_string())
                    .collect();
                builder.row(
                    || row.columns().iter().map(|c| c.name().to_string()).collect(),
                    cells,
                );
            }
            SimpleQueryMessage::CommandComplete(rows_affected) => builder.complete(rows_affected),
            _ => {}
        }
    }
    builder.finish()
}

impl Session for PgSession {
    fn is_healthy(&mut self) -> bool {
        let Some(client) = self.client.as_ref() else {
            return false;
        };
        if client.is_closed() {
            return false;
        }

        let ping = self
            .runtime
            .block_on(async { tokio::time::timeout(PING_TIMEOUT, client.simple_query("")).await });
        match ping {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::warn!("Connection ping failed: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!("Connection ping timed out after {:?}", PING_TIMEOUT);
                false
            }
        }
    }

    fn run(&mut self, statement: &str) -> std::result::Result<StatementOutcome, StatementError> {
        let client = self.client.as_ref().ok_or_else(|| {
            StatementError::new(ResultStatus::FatalError, "connection is closed")
        })?;

        // The driver reports an empty query as a zero-row command completion
        if statement.trim().is_empty() {
            return Err(StatementError::new(ResultStatus::EmptyQuery, "empty query"));
        }

        let messages = self
            .runtime
            .block_on(client.simple_query(statement))
            .map_err(statement_error)?;
        collect_outcome(messages)
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        // Releasing the client lets the connection task send Terminate and exit
        drop(self.client.take());
        if let Some(task) = self.connection_task.take() {
            let _ = self
                .runtime
                .block_on(async { tokio::time::timeout(CLOSE_TIMEOUT, task).await });
        }
    }
}
