//! Two independent handles on one database file.
//!
//! The in-process serializer only orders writers sharing a handle; across
//! handles the store's own lock decides, and busy failures surface as
//! contention after the retry policy gives up.

use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use crate::test_utils::*;
use trellis::{props, Graph, GraphConfig, RetryPolicy, TrellisError};

fn impatient(path: &std::path::Path, attempts: u32) -> GraphConfig {
    GraphConfig::file(path).busy_timeout_ms(20).retry(RetryPolicy {
        max_attempts: attempts,
        initial_backoff_ms: 5,
        max_backoff_ms: 20,
    })
}

#[test]
fn busy_store_reports_contention_after_retries() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let holder = Graph::open(GraphConfig::file(&path)).unwrap();
    let other = Graph::open(impatient(&path, 3)).unwrap();

    let mut txn = holder.database().begin().unwrap();
    txn.create_node("T", props! {}).unwrap();

    let err = other.create_node("T", props! {}).unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, TrellisError::Contention { attempts: 3, .. }));

    // Readers are not blocked by the open write transaction.
    assert_eq!(other.query("T").count().unwrap(), 0);

    txn.commit().unwrap();
    drop(txn);
    other.create_node("T", props! {}).unwrap();
    assert_eq!(holder.query("T").count().unwrap(), 2);
}

#[test]
fn retry_succeeds_once_the_lock_clears() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let holder = Graph::open(GraphConfig::file(&path)).unwrap();
    let other = Graph::open(impatient(&path, 50)).unwrap();

    let blocker = {
        let holder = holder.clone();
        thread::spawn(move || {
            let mut txn = holder.database().begin().unwrap();
            txn.create_node("T", props! { "by" => "holder" }).unwrap();
            thread::sleep(Duration::from_millis(60));
            txn.commit().unwrap();
        })
    };
    thread::sleep(Duration::from_millis(10));

    let n = other.create_node("T", props! { "by" => "other" }).unwrap();
    blocker.join().unwrap();

    assert!(holder.get_node(n.id).unwrap().is_some());
    assert_eq!(holder.query("T").count().unwrap(), 2);
}
