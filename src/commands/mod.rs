// ABOUTME: Command implementations behind the pgtab CLI
// ABOUTME: Exports the execute and query commands

pub mod execute;
pub mod query;

pub use execute::execute;
pub use query::query;
