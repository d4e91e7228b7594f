// ABOUTME: PostgreSQL backend module
// ABOUTME: Exports the connector and session used by the blocking client

pub mod connection;

pub use connection::{connect, PgConnector, PgSession};
