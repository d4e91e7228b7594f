// ABOUTME: Blocking database client with a single reconnect attempt per call
// ABOUTME: Reports failures through the log sink and returns false or an error value instead of panicking

use crate::config::ConnectionParameters;
use crate::error::{ConnectionError, QueryError, StatementError};
use crate::log_sink::LogSink;
use crate::postgres::PgConnector;
use crate::session::{Connector, ResultStatus, Session, StatementOutcome};
use crate::table::Table;

/// Where the client stands after its most recent health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// The ping failed and a single reopen is in progress
    Reconnecting,
    /// The reopen failed; the next call tries once more
    Failed,
}

/// Owns one connection and runs statements on it.
///
/// Only construction can fail with an error. After that, every failure is
/// written to the [`LogSink`] and turned into `false` (for
/// [`execute`](Self::execute)) or a [`QueryError`] (for [`query`](Self::query)).
///
/// # Examples
///
/// ```no_run
/// # use pgtab::{ConnectionParameters, DatabaseClient};
/// # fn example() -> anyhow::Result<()> {
/// let params = ConnectionParameters::new("localhost", "postgres", "secret", "postgres");
/// let mut client = DatabaseClient::new(params, None)?;
///
/// client.execute("CREATE TABLE IF NOT EXISTS t (id int)");
/// if let Ok(table) = client.query("SELECT id FROM t") {
///     print!("{}", table);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DatabaseClient {
    params: ConnectionParameters,
    connector: Box<dyn Connector>,
    session: Option<Box<dyn Session>>,
    log_sink: LogSink,
    state: ConnectionState,
}

impl DatabaseClient {
    /// Connect to PostgreSQL on port 5432.
    ///
    /// # Arguments
    ///
    /// * `params` - Host, user, password and database name
    /// * `log_sink` - Failure callback; `None` prints to standard output
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the first connection cannot be
    /// established. The same text is sent to the log sink first.
    pub fn new(
        params: ConnectionParameters,
        log_sink: Option<LogSink>,
    ) -> Result<Self, ConnectionError> {
        Self::with_connector(params, Box::new(PgConnector), log_sink.unwrap_or_default())
    }

    /// Connect through a custom [`Connector`]
    pub fn with_connector(
        params: ConnectionParameters,
        connector: Box<dyn Connector>,
        log_sink: LogSink,
    ) -> Result<Self, ConnectionError> {
        let session = match connector.connect(&params) {
            Ok(session) => session,
            Err(e) => {
                let err = connection_error(&params, &e);
                log_sink.emit(&err.to_string());
                return Err(err);
            }
        };

        Ok(Self {
            params,
            connector,
            session: Some(session),
            log_sink,
            state: ConnectionState::Connected,
        })
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run a statement that is expected to complete without returning rows.
    ///
    /// Returns `false` when the connection cannot be restored, when the
    /// server rejects the statement, or when it produced rows instead of a
    /// command completion.
    pub fn execute(&mut self, statement: &str) -> bool {
        if !self.check_connection() {
            return false;
        }

        tracing::debug!("Executing: {}", statement);
        let failure = match self.run(statement) {
            Ok(StatementOutcome::Command { .. }) => return true,
            Ok(outcome) => format!("unexpected result status {}", outcome.status()),
            Err(e) => e.message,
        };

        self.log_sink
            .emit(&format!("failed to execute sql {} error {}", statement, failure));
        false
    }

    /// Run a statement and collect its result as a [`Table`].
    ///
    /// Commands that return no rows yield a table with no columns.
    pub fn query(&mut self, statement: &str) -> Result<Table, QueryError> {
        if !self.check_connection() {
            return Err(QueryError::ConnectionUnavailable);
        }

        tracing::debug!("Querying: {}", statement);
        match self.run(statement) {
            Ok(outcome) => Ok(outcome.into_table()),
            Err(e) => {
                self.log_sink.emit(&format!(
                    "failed to execute sql {} error {}; result status {}",
                    statement, e.message, e.status
                ));
                Err(QueryError::Statement(e))
            }
        }
    }

    fn run(&mut self, statement: &str) -> Result<StatementOutcome, StatementError> {
        match self.session.as_mut() {
            Some(session) => session.run(statement),
            None => Err(StatementError::new(
                ResultStatus::FatalError,
                "no connection to the server",
            )),
        }
    }

    /// Ping the connection and reopen it once if the ping fails
    fn check_connection(&mut self) -> bool {
        let healthy = self
            .session
            .as_mut()
            .is_some_and(|session| session.is_healthy());
        if healthy {
            self.state = ConnectionState::Connected;
            return true;
        }

        self.state = ConnectionState::Reconnecting;
        tracing::warn!("Connection to {} is unhealthy, reconnecting", self.params);

        // Close the old handle before opening a new one
        self.session = None;
        match self.connector.connect(&self.params) {
            Ok(session) => {
                self.session = Some(session);
                self.state = ConnectionState::Connected;
                tracing::info!("Reconnected to {}", self.params);
                true
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                self.log_sink
                    .emit(&connection_error(&self.params, &e).to_string());
                false
            }
        }
    }
}

fn connection_error(params: &ConnectionParameters, e: &anyhow::Error) -> ConnectionError {
    ConnectionError {
        host: params.host().to_string(),
        port: params.port(),
        user: params.user().to_string(),
        dbname: params.dbname().to_string(),
        reason: format!("{:#}", e),
    }
}
