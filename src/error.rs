// ABOUTME: Error types returned by the database client
// ABOUTME: Separates fatal connection errors from recoverable statement failures

use crate::session::ResultStatus;
use thiserror::Error;

/// The initial connection could not be established.
///
/// This is the only failure [`DatabaseClient`](crate::DatabaseClient) reports
/// as an error from construction. The password is never part of it.
#[derive(Debug, Error)]
#[error("failed to connect to postgresql host={host} port={port} user={user} dbname={dbname}; error {reason}")]
pub struct ConnectionError {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    pub reason: String,
}

/// A statement was rejected by the server or produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}; result status {status}")]
pub struct StatementError {
    pub status: ResultStatus,
    pub message: String,
    /// Five-character SQLSTATE code when the server sent one
    pub sqlstate: Option<String>,
}

impl StatementError {
    pub fn new(status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            sqlstate: None,
        }
    }

    pub fn with_sqlstate(mut self, code: impl Into<String>) -> Self {
        self.sqlstate = Some(code.into());
        self
    }
}

/// Why [`DatabaseClient::query`](crate::DatabaseClient::query) produced no table.
///
/// Both variants have already been written to the log sink by the time the
/// caller sees them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("connection to the database is unavailable")]
    ConnectionUnavailable,

    #[error(transparent)]
    Statement(#[from] StatementError),
}

impl QueryError {
    /// Result status of the failed statement, if it reached the server
    pub fn status(&self) -> Option<ResultStatus> {
        match self {
            QueryError::ConnectionUnavailable => None,
            QueryError::Statement(e) => Some(e.status),
        }
    }
}
