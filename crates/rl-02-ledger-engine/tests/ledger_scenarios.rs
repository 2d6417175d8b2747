//! # Ledger Scenarios
//!
//! End-to-end behaviour of accounts, transfers, locks and the transaction
//! log through `LedgerEngine` over the in-memory world state.

mod common;

use common::Harness;
use rl_02_ledger_engine::{
    AccountKind, AccountStore, EntryFlag, ErrorKind, IssuanceEngine, LockEngine, LockEntry,
    LogScope, RangeQuery, Sequencer, TransactionLog, TransferEngine, TransferOrder,
};

// =============================================================================
// SCENARIO
// =============================================================================

#[test]
fn test_issue_then_two_transfers() {
    let mut h = Harness::new();
    h.run(|s| {
        s.init_issuance_pool(1_000_000)?;
        s.create_account("bank", AccountKind::Bank, "central")?;
        s.create_account("alice", AccountKind::Person, "alice")?;
        s.create_account("bob", AccountKind::Person, "bob")
    })
    .unwrap();
    h.run(|s| s.issue("bank", 1000, "genesis")).unwrap();
    h.run(|s| s.transfer(&TransferOrder::new("bank", "alice", 300)))
        .unwrap();
    h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", 100)))
        .unwrap();

    assert_eq!(h.rest("bank"), 700);
    assert_eq!(h.rest("alice"), 200);
    assert_eq!(h.rest("bob"), 100);

    let log = h
        .run(|s| s.tx_history(&LogScope::Global, &RangeQuery::ascending()))
        .unwrap();
    assert_eq!(log.max_seq, 4);
    let serials: Vec<u64> = log.items.iter().map(|i| i.source_seq).collect();
    assert_eq!(serials, vec![1, 2, 3, 4]);

    let entries: Vec<_> = log.records().collect();
    assert_eq!(
        entries.iter().map(|e| e.flag).collect::<Vec<_>>(),
        vec![EntryFlag::Debit, EntryFlag::Credit, EntryFlag::Debit, EntryFlag::Credit]
    );
    assert_eq!(entries[0].global_serial, 1);
    assert_eq!(entries[1].global_serial, 1);
    assert_eq!(entries[2].global_serial, 3);
    assert_eq!(entries[3].global_serial, 3);
}

#[test]
fn test_account_history_sees_both_sides() {
    let mut h = Harness::funded(&["alice", "bob"], 500);
    h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", 100)))
        .unwrap();
    h.run(|s| s.transfer(&TransferOrder::new("bob", "alice", 40)))
        .unwrap();

    let history = h
        .run(|s| s.tx_history(&LogScope::Account("alice".into()), &RangeQuery::ascending()))
        .unwrap();
    let rows: Vec<_> = history
        .records()
        .map(|e| (e.trans_type.as_str(), e.flag, e.amount))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("issue", EntryFlag::Credit, 500),
            ("transfer", EntryFlag::Debit, 100),
            ("transfer", EntryFlag::Credit, 40),
        ]
    );
    assert!(history.records().all(|e| e.from_id == "alice"));
}

// =============================================================================
// CONSERVATION
// =============================================================================

#[test]
fn test_transfers_conserve_total_balance() {
    let accounts = ["a", "b", "c", "d"];
    let mut h = Harness::funded(&accounts, 1000);
    let total = |h: &mut Harness| accounts.iter().map(|id| h.rest(id)).sum::<i64>();
    let before = total(&mut h);

    let moves = [("a", "b", 250), ("b", "c", 1300), ("c", "d", 7), ("d", "a", 0), ("a", "a", 9)];
    for (from, to, amount) in moves {
        let _ = h.run(|s| s.transfer(&TransferOrder::new(from, to, amount)));
    }

    assert_eq!(total(&mut h), before);
    // the 1300 transfer exceeds b's balance and must not have applied
    assert_eq!(h.rest("b"), 1250);
}

// =============================================================================
// LOCKS
// =============================================================================

#[test]
fn test_lock_blocks_spending_until_expiry() {
    let mut h = Harness::funded(&["alice", "bob"], 100);
    let t = h.time;
    h.run(|s| s.add_locks("alice", &[LockEntry::new(t + 10, 40)], false))
        .unwrap();

    h.time = t + 5;
    let err = h
        .run(|s| s.transfer(&TransferOrder::new("alice", "bob", 61)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", 60)))
        .unwrap();

    // expired: the remaining 40 becomes spendable
    h.time = t + 10;
    h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", 40)))
        .unwrap();
    assert_eq!(h.rest("alice"), 0);
}

#[test]
fn test_locked_balance_query() {
    let mut h = Harness::funded(&["alice"], 100);
    let t = h.time;
    h.run(|s| {
        s.add_locks(
            "alice",
            &[LockEntry::new(t + 10, 40), LockEntry::new(t - 1, 30)],
            false,
        )
    })
    .unwrap();
    let locked = h.run(|s| s.locked_amount("alice", t)).unwrap();
    assert_eq!(locked.locked, 40);
    assert_eq!(locked.entries.len(), 2);

    let view = h.run(|s| s.balance("alice")).unwrap();
    assert_eq!(view.available, 60);
}

// =============================================================================
// PAGINATION
// =============================================================================

#[test]
fn test_pinned_descending_pages_are_stable() {
    let mut h = Harness::funded(&["alice", "bob"], 1000);
    for amount in 1..=5 {
        h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", amount)))
            .unwrap();
    }

    let first = h
        .run(|s| s.tx_history(&LogScope::Global, &RangeQuery::descending().take(4)))
        .unwrap();
    assert_eq!(first.max_seq, 10);
    assert_eq!(
        first.records().map(|e| e.amount).collect::<Vec<_>>(),
        vec![5, 5, 4, 4]
    );

    // new entries arrive while the client is browsing
    h.run(|s| s.transfer(&TransferOrder::new("alice", "bob", 99)))
        .unwrap();

    let next = RangeQuery::descending()
        .starting_at(first.next_seq as i64)
        .take(4)
        .pinned(first.max_seq);
    let second = h.run(|s| s.tx_history(&LogScope::Global, &next)).unwrap();
    assert_eq!(second.max_seq, 10);
    assert_eq!(
        second.records().map(|e| e.amount).collect::<Vec<_>>(),
        vec![3, 3, 2, 2]
    );
    assert_eq!(second.items[0].serial, 5);

    let unpinned = RangeQuery::descending().starting_at(first.next_seq as i64).take(4);
    let shifted = h.run(|s| s.tx_history(&LogScope::Global, &unpinned)).unwrap();
    assert_eq!(shifted.max_seq, 12);
    assert_eq!(shifted.records().next().map(|e| e.amount), Some(4));
}

#[test]
fn test_account_listing() {
    let mut h = Harness::funded(&["alice", "bob", "carol"], 0);
    let (count, page) = h
        .run(|s| {
            Ok((
                s.account_count()?,
                s.list_accounts(&RangeQuery::descending().take(2))?,
            ))
        })
        .unwrap();
    assert_eq!(count, 3);
    let ids: Vec<_> = page.records().map(|e| e.account_id.clone()).collect();
    assert_eq!(ids, vec!["carol", "bob"]);
    assert_eq!(page.next_seq, 3);
}

#[test]
fn test_failed_invocation_leaves_no_trace() {
    let mut h = Harness::funded(&["alice", "bob"], 100);
    let before = h.snapshot();
    let err = h
        .run(|s| {
            s.transfer(&TransferOrder::new("alice", "bob", 50))?;
            s.transfer(&TransferOrder::new("alice", "bob", 51))
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(h.snapshot(), before);

    let appended = h.run(|s| s.current_seq("TX")).unwrap();
    assert_eq!(appended, 0);
}
