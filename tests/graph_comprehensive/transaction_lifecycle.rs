//! Transaction lifecycle, savepoints and write serialization.

use std::sync::{Arc, Barrier};
use std::thread;

use crate::test_utils::*;
use trellis::{props, EntityRef, FinalState, TrellisError, TxnState};

fn finalized(err: &TrellisError) -> Option<FinalState> {
    match err {
        TrellisError::TransactionFinalized { state } => Some(*state),
        _ => None,
    }
}

#[test]
fn closure_commits_on_ok_and_rolls_back_on_err() {
    let graph = setup();
    graph
        .transaction(|t| t.create_node("T", props! { "k" => 1 }))
        .unwrap();
    let err = graph
        .transaction(|t| {
            t.create_node("T", props! { "k" => 2 })?;
            Err::<(), _>(TrellisError::invalid_input("abort"))
        })
        .unwrap_err();
    assert!(err.is_invalid_input());
    assert_eq!(graph.query("T").count().unwrap(), 1);
}

#[test]
fn double_commit_and_late_rollback_are_rejected() {
    let graph = setup();
    let mut txn = graph.database().begin().unwrap();
    txn.create_node("T", props! {}).unwrap();
    txn.commit().unwrap();
    assert_eq!(txn.state(), TxnState::Committed);

    assert_eq!(finalized(&txn.commit().unwrap_err()), Some(FinalState::Committed));
    assert_eq!(finalized(&txn.rollback().unwrap_err()), Some(FinalState::Committed));
    assert_eq!(
        finalized(&txn.create_node("T", props! {}).unwrap_err()),
        Some(FinalState::Committed)
    );
    drop(txn);
    assert_eq!(graph.query("T").count().unwrap(), 1);
}

#[test]
fn rolled_back_transaction_rejects_further_use() {
    let graph = setup();
    let mut txn = graph.database().begin().unwrap();
    txn.create_node("T", props! {}).unwrap();
    txn.rollback().unwrap();
    assert_eq!(
        finalized(&txn.savepoint("sp").unwrap_err()),
        Some(FinalState::RolledBack)
    );
    assert!(txn.query("T").count().is_err());
    drop(txn);
    assert_eq!(graph.query("T").count().unwrap(), 0);
}

#[test]
fn dropping_an_active_transaction_rolls_back() {
    let graph = setup();
    {
        let txn = graph.database().begin().unwrap();
        txn.create_node("T", props! {}).unwrap();
    }
    assert_eq!(graph.query("T").count().unwrap(), 0);
    // The permit was released.
    graph.create_node("T", props! {}).unwrap();
}

#[test]
fn savepoint_stack_semantics() {
    let graph = setup();
    let mut txn = graph.database().begin().unwrap();
    txn.create_node("T", props! { "n" => 0 }).unwrap();
    txn.savepoint("one").unwrap();
    txn.create_node("T", props! { "n" => 1 }).unwrap();
    txn.savepoint("two").unwrap();
    txn.create_node("T", props! { "n" => 2 }).unwrap();
    assert_eq!(txn.savepoints(), &["one".to_string(), "two".to_string()]);

    // Rolling back to "one" keeps it and discards "two".
    txn.rollback_to("one").unwrap();
    assert_eq!(txn.savepoints(), &["one".to_string()]);
    assert_eq!(txn.query("T").count().unwrap(), 1);

    let missing = txn.release_savepoint("two").unwrap_err();
    assert!(matches!(
        missing,
        TrellisError::NotFound { entity_ref: EntityRef::Savepoint(ref name) } if name == "two"
    ));
    assert!(txn.savepoint("one").unwrap_err().is_invalid_input());

    txn.create_node("T", props! { "n" => 3 }).unwrap();
    txn.release_savepoint("one").unwrap();
    assert!(txn.savepoints().is_empty());
    txn.commit().unwrap();
    drop(txn);
    assert_eq!(graph.query("T").count().unwrap(), 2);
}

#[test]
fn nested_transactions_are_rejected() {
    let graph = setup();
    let inner = graph.transaction(|_| graph.transaction(|t| t.create_node("T", props! {})));
    assert!(inner.unwrap_err().is_invalid_input());
    assert_eq!(graph.query("T").count().unwrap(), 0);
}

#[test]
fn concurrent_writers_are_serialized() {
    let graph = setup();
    let threads = 4;
    let per_thread = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let graph = graph.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for j in 0..per_thread {
                    graph
                        .transaction(|t| {
                            let n = t.create_node("W", props! { "thread" => i as i64, "j" => j as i64 })?;
                            // Read-your-writes inside the unit.
                            assert!(t.get_node(n.id)?.is_some());
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(graph.query("W").count().unwrap(), (threads * per_thread) as u64);
    assert_eq!(graph.database().pending_writers(), 0);
}
