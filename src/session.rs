// ABOUTME: Backend abstraction between the client state machine and a live connection
// ABOUTME: Defines statement outcomes, result status names, and the connector traits

use crate::config::ConnectionParameters;
use crate::error::StatementError;
use crate::table::Table;
use anyhow::Result;
use std::fmt;

/// Outcome class of one statement, named after the server result classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    EmptyQuery,
    CommandOk,
    TuplesOk,
    BadResponse,
    FatalError,
}

impl ResultStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ResultStatus::EmptyQuery => "EMPTY_QUERY",
            ResultStatus::CommandOk => "COMMAND_OK",
            ResultStatus::TuplesOk => "TUPLES_OK",
            ResultStatus::BadResponse => "BAD_RESPONSE",
            ResultStatus::FatalError => "FATAL_ERROR",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Successful result of the last statement in a submitted string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    Command { rows_affected: u64 },
    Rows(Table),
}

impl StatementOutcome {
    pub fn status(&self) -> ResultStatus {
        match self {
            StatementOutcome::Command { .. } => ResultStatus::CommandOk,
            StatementOutcome::Rows(_) => ResultStatus::TuplesOk,
        }
    }

    /// Table view of the outcome; commands yield a table with no columns
    pub fn into_table(self) -> Table {
        match self {
            StatementOutcome::Command { .. } => Table::default(),
            StatementOutcome::Rows(table) => table,
        }
    }
}

/// One open connection.
pub trait Session {
    /// Cheap liveness probe. Must not panic when the peer has gone away.
    fn is_healthy(&mut self) -> bool;

    /// Submit a statement string and wait for its result.
    fn run(&mut self, statement: &str) -> std::result::Result<StatementOutcome, StatementError>;
}

/// Opens sessions from connection parameters.
pub trait Connector {
    fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn Session>>;
}
