// ABOUTME: Integration tests for the blocking client against a live PostgreSQL server
// ABOUTME: Covers construction, execute, query, and reconnect after the backend is terminated

use pgtab::{ConnectionParameters, DatabaseClient, LogSink, QueryError, ResultStatus};
use std::env;
use std::sync::{Arc, Mutex};

/// Helper to get test connection parameters from environment
fn get_test_params() -> Option<ConnectionParameters> {
    let host = env::var("TEST_PG_HOST").ok()?;
    let user = env::var("TEST_PG_USER").ok()?;
    let password = env::var("TEST_PG_PASSWORD").unwrap_or_default();
    let dbname = env::var("TEST_PG_DBNAME").ok()?;
    Some(ConnectionParameters::new(host, user, password, dbname))
}

fn capture() -> (LogSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&lines);
    let sink = LogSink::new(move |line| captured.lock().unwrap().push(line.to_string()));
    (sink, lines)
}

fn connect() -> (DatabaseClient, Arc<Mutex<Vec<String>>>) {
    let params = get_test_params().expect("TEST_PG_HOST, TEST_PG_USER and TEST_PG_DBNAME must be set");
    let (sink, lines) = capture();
    let client = DatabaseClient::new(params, Some(sink)).expect("Failed to connect");
    (client, lines)
}

#[test]
#[ignore]
fn test_construction_logs_nothing() {
    let (_client, lines) = connect();
    assert!(lines.lock().unwrap().is_empty());
}

#[test]
#[ignore]
fn test_construction_against_wrong_database_fails() {
    let params = get_test_params().expect("TEST_PG_* must be set");
    let params = ConnectionParameters::new(
        params.host(),
        params.user(),
        params.password(),
        "pgtab_database_that_does_not_exist",
    );
    let (sink, lines) = capture();

    let result = DatabaseClient::new(params.clone(), Some(sink));
    assert!(result.is_err());

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(params.host()));
    assert!(lines[0].contains(params.user()));
    assert!(lines[0].contains("pgtab_database_that_does_not_exist"));
    if !params.password().is_empty() {
        assert!(!lines[0].contains(params.password()));
    }
}

#[test]
#[ignore]
fn test_execute_then_query_sees_effect() {
    let (mut client, lines) = connect();

    assert!(client.execute("DROP TABLE IF EXISTS pgtab_it_items"));
    assert!(client.execute("CREATE TABLE pgtab_it_items (id int, name text)"));
    assert!(client.execute("INSERT INTO pgtab_it_items VALUES (1, 'alpha'), (2, NULL)"));

    let table = client
        .query("SELECT id, name FROM pgtab_it_items ORDER BY id")
        .unwrap();
    assert_eq!(table.to_text(), "id,name\n1,alpha\n2,\n");

    assert!(client.execute("DROP TABLE pgtab_it_items"));
    assert!(lines.lock().unwrap().is_empty());
}

#[test]
#[ignore]
fn test_execute_malformed_sql_returns_false() {
    let (mut client, lines) = connect();

    assert!(!client.execute("CREAT TABLE nope (id int)"));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("CREAT TABLE nope (id int)"));
}

#[test]
#[ignore]
fn test_query_select_one() {
    let (mut client, _lines) = connect();

    let table = client.query("SELECT 1 AS x").unwrap();
    assert_eq!(table.columns(), &["x".to_string()]);
    assert_eq!(table.rows(), &[vec!["1".to_string()]]);
}

#[test]
#[ignore]
fn test_query_empty_result_keeps_header() {
    let (mut client, _lines) = connect();

    let table = client.query("SELECT 1 AS x WHERE false").unwrap();
    assert_eq!(table.columns(), &["x".to_string()]);
    assert!(table.is_empty());
}

#[test]
#[ignore]
fn test_query_malformed_sql_logs_status() {
    let (mut client, lines) = connect();

    let err = client.query("SELEC 1").unwrap_err();
    assert_eq!(err.status(), Some(ResultStatus::FatalError));
    match err {
        QueryError::Statement(e) => assert_eq!(e.sqlstate.as_deref(), Some("42601")),
        other => panic!("unexpected error: {:?}", other),
    }

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("FATAL_ERROR"));
}

#[test]
#[ignore]
fn test_reconnects_after_backend_terminated() {
    let (mut client, _lines) = connect();
    let (mut admin, _admin_lines) = connect();

    let pid = client.query("SELECT pg_backend_pid() AS pid").unwrap();
    let pid = pid.cell(0, "pid").unwrap().to_string();

    let terminated = admin
        .query(&format!("SELECT pg_terminate_backend({})", pid))
        .unwrap();
    assert_eq!(terminated.rows(), &[vec!["t".to_string()]]);

    // The next call notices the dead connection and reopens it
    let table = client.query("SELECT pg_backend_pid() AS pid").unwrap();
    assert_ne!(table.cell(0, "pid"), Some(pid.as_str()));
}
