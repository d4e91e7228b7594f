// ABOUTME: Library module for pgtab
// ABOUTME: Exports the blocking client, its configuration, and the result table for use in binary and tests

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod log_sink;
pub mod postgres;
pub mod session;
pub mod table;

pub use client::{ConnectionState, DatabaseClient};
pub use config::{ConnectionParameters, SslMode, POSTGRES_PORT};
pub use error::{ConnectionError, QueryError, StatementError};
pub use log_sink::LogSink;
pub use session::{Connector, ResultStatus, Session, StatementOutcome};
pub use table::Table;
