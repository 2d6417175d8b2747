//! # Command Flow
//!
//! Drives the engine end to end through the dispatcher, the way `rl-node`
//! does.

use ledger_runtime::{CommandRequest, CommandResponse, Dispatcher};
use rl_01_world_state::{InMemoryWorldState, WorldState};
use rl_02_ledger_engine::{ErrorKind, LedgerEngine};
use serde_json::Value;

struct Node<S: WorldState> {
    dispatcher: Dispatcher<S>,
    tx: u64,
}

impl<S: WorldState> Node<S> {
    fn new(store: S) -> Self {
        Self {
            dispatcher: Dispatcher::new(LedgerEngine::new(store)),
            tx: 0,
        }
    }

    fn call(&mut self, command: &str, args: &[&str]) -> CommandResponse {
        self.tx += 1;
        let request = CommandRequest::new(
            format!("tx-{}", self.tx),
            1_000 + self.tx as i64,
            command,
            args.iter().copied(),
        );
        self.dispatcher.handle(&request)
    }

    fn ok(&mut self, command: &str, args: &[&str]) -> Value {
        match self.call(command, args) {
            CommandResponse::Ok { payload, .. } => payload,
            CommandResponse::Error { error, .. } => {
                panic!("{} failed: {:?} {}", command, error.kind, error.message)
            }
        }
    }

    fn err(&mut self, command: &str, args: &[&str]) -> ErrorKind {
        match self.call(command, args) {
            CommandResponse::Error { error, .. } => error.kind,
            CommandResponse::Ok { payload, .. } => panic!("{} succeeded: {}", command, payload),
        }
    }
}

fn bootstrap<S: WorldState>(node: &mut Node<S>) {
    node.ok("initIssuancePool", &["1000000"]);
    for id in ["alice", "bob", "owner", "treasury"] {
        node.ok("createAccount", &[id, "person", id]);
        node.ok("issue", &[id, "5000", "seed"]);
    }
}

#[test]
fn test_transfer_and_history_commands() {
    let mut node = Node::new(InMemoryWorldState::new());
    bootstrap(&mut node);

    node.ok("transfer", &["alice", "bob", "300", "", "rent"]);
    assert_eq!(node.ok("balance", &["alice"])["rest_balance"], 4_700);
    assert_eq!(node.ok("balance", &["bob"])["rest_balance"], 5_300);
    assert_eq!(node.ok("balance", &["nobody"])["rest_balance"], 0);

    let history = node.ok("accountTxHistory", &["alice", "1", "-1", "desc"]);
    let items = history["items"].as_array().unwrap();
    assert_eq!(items[0]["record"]["flag"], "debit");
    assert_eq!(items[0]["record"]["description"], "rent");

    assert_eq!(node.ok("accountCount", &[]), 4);
    assert_eq!(node.err("transfer", &["alice", "bob", "999999"]), ErrorKind::InsufficientFunds);
}

#[test]
fn test_locks_through_commands() {
    let mut node = Node::new(InMemoryWorldState::new());
    bootstrap(&mut node);

    node.ok("addLocks", &["alice", "999999:4000"]);
    assert_eq!(node.ok("lockedBalance", &["alice"])["locked"], 4_000);
    assert_eq!(node.err("transfer", &["alice", "bob", "1001"]), ErrorKind::InsufficientFunds);
    node.ok("transfer", &["alice", "bob", "1000"]);
    assert_eq!(node.err("addLocks", &["alice", "10:-5"]), ErrorKind::InvalidArgument);
}

#[test]
fn test_allocation_commands() {
    let mut node = Node::new(InMemoryWorldState::new());
    bootstrap(&mut node);

    let record = node.ok(
        "allocate",
        &[
            "r1",
            "sale-1",
            "100",
            r#"{"seller":"alice","platform":"bob"}"#,
            "seller:92,platform:8",
            "treasury",
        ],
    );
    assert_eq!(record["amount_by_role_by_account"]["seller"]["alice"], 92);
    assert_eq!(node.ok("balance", &["treasury"])["rest_balance"], 4_900);

    let found = node.ok("findAllocation", &["r1", "sale-1", "desc"]);
    assert_eq!(found["total_amount"], 100);
    assert_eq!(node.ok("findAllocation", &["r1", "missing"]), Value::Null);

    let history = node.ok("accountAllocationHistory", &["bob"]);
    assert_eq!(history["max_seq"], 1);
}

#[test]
fn test_financing_round_trip() {
    let mut node = Node::new(InMemoryWorldState::new());
    bootstrap(&mut node);

    node.ok("setFinanceConfig", &["r1", "1000", "20", "50", "owner"]);
    node.ok("setRoleRates", &["r1", "seller:40,operator:60"]);
    node.ok("setCurrentRound", &["f1"]);
    node.ok("invest", &["alice", "r1", "600"]);
    assert_eq!(node.ok("remainingCapacity", &["r1"]), 400);
    assert_eq!(node.err("invest", &["bob", "r1", "401"]), ErrorKind::InvalidArgument);

    node.ok("closeRound", &[]);
    let round = node.ok("payBonus", &["r1", "f1", "100000"]);
    assert_eq!(round["user_profit"]["alice"], 24);
    assert_eq!(round["stage"], "BonusPaid");

    assert_eq!(node.ok("redeemable", &["alice", "r1"])["profit"], 24);
    let paid = node.ok("redeem", &["alice", "r1", "treasury"]);
    assert_eq!(paid["principal"], 600);
    assert_eq!(node.ok("balance", &["alice"])["rest_balance"], 5_000 - 600 + 624);

    let again = node.ok("redeem", &["alice", "r1", "treasury"]);
    assert_eq!(again["principal"], 0);
    assert_eq!(again["transfer"], Value::Null);
    assert_eq!(node.ok("profitToDate", &["alice"]), 24);
}

#[test]
fn test_failed_command_leaves_store_untouched() {
    let mut node = Node::new(InMemoryWorldState::new());
    bootstrap(&mut node);
    let before = node.dispatcher.engine().store().dump();

    assert_eq!(node.err("closeRound", &[]), ErrorKind::StateConflict);
    assert_eq!(node.err("issue", &["ghost", "10"]), ErrorKind::NotFound);
    assert_eq!(node.err("unknownCommand", &[]), ErrorKind::InvalidArgument);
    assert_eq!(node.err("createAccount", &["bad~id"]), ErrorKind::InvalidArgument);
    assert_eq!(node.dispatcher.engine().store().dump(), before);
}

#[cfg(feature = "rocksdb")]
#[test]
fn test_state_survives_reopen() {
    use rl_01_world_state::{RocksDbConfig, RocksDbWorldState};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().into_owned();
    {
        let store = RocksDbWorldState::open(RocksDbConfig::for_testing(path.clone())).unwrap();
        let mut node = Node::new(store);
        bootstrap(&mut node);
        node.ok("transfer", &["alice", "bob", "250"]);
    }
    let store = RocksDbWorldState::open(RocksDbConfig::for_testing(path)).unwrap();
    let mut node = Node::new(store);
    assert_eq!(node.ok("balance", &["bob"])["rest_balance"], 5_250);
    assert_eq!(node.ok("accountCount", &[]), 4);
}
