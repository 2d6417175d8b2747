//! # Command Dispatcher
//!
//! Maps a command name plus ordered string arguments onto one engine
//! invocation and encodes the result as JSON.
//!
//! Optional trailing arguments may be omitted or passed as `""`.
//! Range queries take `[begin, count, order, beginTime, endTime, maxSeq]`
//! after any leading ids, all optional.

use std::collections::BTreeMap;
use std::str::FromStr;

use rl_01_world_state::WorldState;
use rl_02_ledger_engine::{
    AccountKind, AccountStore, AllocationEngine, AllocationOrder, AllocationScope, FinanceConfig,
    FinancingEngine, InvestOrder, IssuanceEngine, LedgerEngine, LedgerError, LedgerErrorPayload,
    LockEngine, LogScope, RangeQuery, RoleRates, ScanOrder, Session, TransactionLog,
    TransferEngine, TransferOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Amount, InvocationContext, Timestamp};
use tracing::{debug, warn};

/// Every command name the dispatcher accepts.
pub const COMMANDS: &[&str] = &[
    "initIssuancePool",
    "issue",
    "issuedSupply",
    "issuanceHistory",
    "createAccount",
    "authorizeUser",
    "isAuthorized",
    "balance",
    "accountCount",
    "listAccounts",
    "transfer",
    "addLocks",
    "lockedBalance",
    "txHistory",
    "accountTxHistory",
    "allocate",
    "allocationHistory",
    "accountAllocationHistory",
    "findAllocation",
    "setFinanceConfig",
    "setRoleRates",
    "setCurrentRound",
    "financingHistory",
    "invest",
    "closeRound",
    "payBonus",
    "redeem",
    "remainingCapacity",
    "redeemable",
    "profitToDate",
    "getRound",
    "investmentIndex",
];

/// One line of input to `rl-node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub tx_id: String,
    pub time: Timestamp,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new<I, A>(tx_id: impl Into<String>, time: Timestamp, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            tx_id: tx_id.into(),
            time,
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// One line of output from `rl-node`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResponse {
    Ok { tx_id: String, payload: Value },
    Error { tx_id: String, error: LedgerErrorPayload },
}

/// Positional arguments of one command.
struct Args<'a> {
    command: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    fn new(command: &'a str, values: &'a [String]) -> Self {
        Self { command, values }
    }

    /// Present and non-empty.
    fn optional(&self, index: usize) -> Option<&'a str> {
        self.values
            .get(index)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, index: usize, name: &str) -> Result<&'a str, LedgerError> {
        self.optional(index).ok_or_else(|| {
            LedgerError::invalid(format!(
                "{}: missing argument {} ({})",
                self.command, index, name
            ))
        })
    }

    fn parse<T: FromStr>(&self, index: usize, name: &str) -> Result<T, LedgerError> {
        let raw = self.required(index, name)?;
        self.convert(raw, name)
    }

    fn parse_or<T: FromStr>(&self, index: usize, name: &str, default: T) -> Result<T, LedgerError> {
        match self.optional(index) {
            Some(raw) => self.convert(raw, name),
            None => Ok(default),
        }
    }

    fn convert<T: FromStr>(&self, raw: &str, name: &str) -> Result<T, LedgerError> {
        raw.parse().map_err(|_| {
            LedgerError::invalid(format!(
                "{}: argument {} is not valid: '{}'",
                self.command, name, raw
            ))
        })
    }

    fn order(&self, index: usize) -> Result<ScanOrder, LedgerError> {
        match self.optional(index) {
            None => Ok(ScanOrder::Ascending),
            Some(raw) => parse_order(raw).ok_or_else(|| {
                LedgerError::invalid(format!(
                    "{}: scan order must be asc or desc, got '{}'",
                    self.command, raw
                ))
            }),
        }
    }

    /// Range query starting at argument `from`.
    fn range(&self, from: usize) -> Result<RangeQuery, LedgerError> {
        let query = RangeQuery {
            begin_seq: self.parse_or(from, "begin", 1)?,
            count: self.parse_or(from + 1, "count", -1)?,
            order: self.order(from + 2)?,
            ..RangeQuery::default()
        }
        .between(
            self.parse_or(from + 3, "beginTime", 0)?,
            self.parse_or(from + 4, "endTime", -1)?,
        );
        // A negative maxSeq reads the live counter.
        let max_seq: i64 = self.parse_or(from + 5, "maxSeq", -1)?;
        match u64::try_from(max_seq) {
            Ok(pinned) => Ok(query.pinned(pinned)),
            Err(_) => Ok(query),
        }
    }
}

fn parse_order(raw: &str) -> Option<ScanOrder> {
    match raw.to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Some(ScanOrder::Ascending),
        "desc" | "descending" => Some(ScanOrder::Descending),
        _ => None,
    }
}

/// Beneficiaries by role, given as a JSON object of role to accounts.
fn parse_accounts_by_role(raw: &str) -> Result<Vec<(String, String)>, LedgerError> {
    let map: BTreeMap<String, String> = serde_json::from_str(raw).map_err(|e| {
        LedgerError::invalid(format!(
            "accountsByRole must be a JSON object of role to accounts: {}",
            e
        ))
    })?;
    Ok(map.into_iter().collect())
}

/// Runs commands against one engine.
pub struct Dispatcher<S: WorldState> {
    engine: LedgerEngine<S>,
}

impl<S: WorldState> Dispatcher<S> {
    pub fn new(engine: LedgerEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LedgerEngine<S> {
        &self.engine
    }

    /// Dispatch and wrap the outcome for the response stream.
    pub fn handle(&mut self, request: &CommandRequest) -> CommandResponse {
        match self.dispatch_value(request) {
            Ok(payload) => CommandResponse::Ok {
                tx_id: request.tx_id.clone(),
                payload,
            },
            Err(error) => CommandResponse::Error {
                tx_id: request.tx_id.clone(),
                error,
            },
        }
    }

    /// Dispatch and return the JSON-encoded result.
    pub fn dispatch(&mut self, request: &CommandRequest) -> Result<Vec<u8>, LedgerErrorPayload> {
        let value = self.dispatch_value(request)?;
        serde_json::to_vec(&value).map_err(|e| LedgerErrorPayload::from(LedgerError::from(e)))
    }

    fn dispatch_value(&mut self, request: &CommandRequest) -> Result<Value, LedgerErrorPayload> {
        debug!(
            tx_id = %request.tx_id,
            command = %request.command,
            args = request.args.len(),
            "Dispatching command"
        );
        self.route(request).map_err(|err| {
            warn!(
                tx_id = %request.tx_id,
                command = %request.command,
                kind = ?err.kind(),
                error = %err,
                "Command failed"
            );
            LedgerErrorPayload::from(err)
        })
    }

    fn run<T, F>(&mut self, ctx: &InvocationContext, operation: F) -> Result<Value, LedgerError>
    where
        T: Serialize,
        F: FnOnce(&mut Session<'_, S>) -> Result<T, LedgerError>,
    {
        let value = self.engine.execute(ctx, operation)?;
        Ok(serde_json::to_value(value)?)
    }

    fn route(&mut self, request: &CommandRequest) -> Result<Value, LedgerError> {
        let ctx = InvocationContext::new(request.tx_id.clone(), request.time);
        let args = Args::new(&request.command, &request.args);

        match request.command.as_str() {
            // Issuance
            "initIssuancePool" => {
                let supply: Amount = args.parse(0, "totalSupply")?;
                self.run(&ctx, |s| s.init_issuance_pool(supply))
            }
            "issue" => {
                let to = args.required(0, "to")?;
                let amount: Amount = args.parse(1, "amount")?;
                let description = args.optional(2).unwrap_or_default();
                self.run(&ctx, |s| s.issue(to, amount, description))
            }
            "issuedSupply" => self.run(&ctx, |s| s.issued_supply()),
            "issuanceHistory" => {
                let query = args.range(0)?;
                self.run(&ctx, |s| s.tx_history(&LogScope::Issuance, &query))
            }

            // Accounts
            "createAccount" => {
                let id = args.required(0, "accountId")?;
                let kind: AccountKind = args.parse_or(1, "kind", AccountKind::Person)?;
                let owner = args.optional(2).unwrap_or(id);
                self.run(&ctx, |s| s.create_account(id, kind, owner))
            }
            "authorizeUser" => {
                let account = args.required(0, "accountId")?;
                let user = args.required(1, "user")?;
                self.run(&ctx, |s| s.authorize_user(account, user))
            }
            "isAuthorized" => {
                let account = args.required(0, "accountId")?;
                let user = args.required(1, "user")?;
                self.run(&ctx, |s| s.is_authorized(account, user))
            }
            "balance" => {
                let account = args.required(0, "accountId")?;
                self.run(&ctx, |s| s.balance(account))
            }
            "accountCount" => self.run(&ctx, |s| s.account_count()),
            "listAccounts" => {
                let query = args.range(0)?;
                self.run(&ctx, |s| s.list_accounts(&query))
            }

            // Transfers and locks
            "transfer" => {
                let mut order = TransferOrder::new(
                    args.required(0, "from")?,
                    args.required(1, "to")?,
                    args.parse(2, "amount")?,
                );
                if let Some(trans_type) = args.optional(3) {
                    order = order.with_type(trans_type);
                }
                if let Some(description) = args.optional(4) {
                    order = order.with_description(description);
                }
                if args.parse_or(5, "recordSelfTransfer", false)? {
                    order = order.recording_self_transfer();
                }
                self.run(&ctx, |s| s.transfer(&order))
            }
            "addLocks" => {
                let account = args.required(0, "accountId")?;
                let entries = rl_02_ledger_engine::parse_lock_entries(args.required(1, "locks")?)?;
                let overwrite: bool = args.parse_or(2, "overwrite", false)?;
                self.run(&ctx, |s| s.add_locks(account, &entries, overwrite))
            }
            "lockedBalance" => {
                let account = args.required(0, "accountId")?;
                let at: Timestamp = args.parse_or(1, "at", request.time)?;
                self.run(&ctx, |s| s.locked_amount(account, at))
            }
            "txHistory" => {
                let query = args.range(0)?;
                self.run(&ctx, |s| s.tx_history(&LogScope::Global, &query))
            }
            "accountTxHistory" => {
                let scope = LogScope::Account(args.required(0, "accountId")?.to_string());
                let query = args.range(1)?;
                self.run(&ctx, |s| s.tx_history(&scope, &query))
            }

            // Allocation
            "allocate" => {
                let order = AllocationOrder {
                    rack_id: args.required(0, "rackId")?.to_string(),
                    allocation_key: args.required(1, "allocationKey")?.to_string(),
                    total_amount: args.parse(2, "totalAmount")?,
                    accounts_by_role: parse_accounts_by_role(args.required(3, "accountsByRole")?)?,
                    role_rates: args.required(4, "roleRates")?.to_string(),
                    payer: args.optional(5).map(str::to_string),
                };
                self.run(&ctx, |s| s.allocate(&order))
            }
            "allocationHistory" => {
                let scope = AllocationScope::Rack(args.required(0, "rackId")?.to_string());
                let query = args.range(1)?;
                self.run(&ctx, |s| s.allocation_history(&scope, &query))
            }
            "accountAllocationHistory" => {
                let scope = AllocationScope::Account(args.required(0, "accountId")?.to_string());
                let query = args.range(1)?;
                self.run(&ctx, |s| s.allocation_history(&scope, &query))
            }
            "findAllocation" => {
                let rack = args.required(0, "rackId")?;
                let key = args.required(1, "allocationKey")?;
                let order = args.order(2)?;
                self.run(&ctx, |s| s.find_allocation(rack, key, order))
            }

            // Financing
            "setFinanceConfig" => {
                let rack = args.required(0, "rackId")?;
                let config = FinanceConfig {
                    capacity: args.parse(1, "capacity")?,
                    profit_percent: args.parse(2, "profitPercent")?,
                    invest_profit_percent: args.parse(3, "investProfitPercent")?,
                    payee_account: args.required(4, "payeeAccount")?.to_string(),
                };
                self.run(&ctx, |s| s.set_finance_config(rack, &config))
            }
            "setRoleRates" => {
                let rack = args.required(0, "rackId")?;
                let rates = RoleRates::parse(args.required(1, "roleRates")?)?;
                self.run(&ctx, |s| s.set_role_rates(rack, &rates))
            }
            "setCurrentRound" => {
                let round = args.required(0, "roundId")?;
                self.run(&ctx, |s| s.set_current_round(round))
            }
            "financingHistory" => self.run(&ctx, |s| s.financing_history()),
            "invest" => {
                let order = InvestOrder::new(
                    args.required(0, "accountId")?,
                    args.required(1, "rackId")?,
                    args.parse(2, "amount")?,
                );
                self.run(&ctx, |s| s.invest(&order))
            }
            "closeRound" => self.run(&ctx, |s| s.close_round()),
            "payBonus" => {
                let rack = args.required(0, "rackId")?;
                let round = args.required(1, "roundId")?;
                let sales: Amount = args.parse(2, "sales")?;
                self.run(&ctx, |s| s.pay_bonus(rack, round, sales))
            }
            "redeem" => {
                let account = args.required(0, "accountId")?;
                let rack = args.required(1, "rackId")?;
                let payer = args.required(2, "payerId")?;
                self.run(&ctx, |s| s.redeem(account, rack, payer))
            }
            "remainingCapacity" => {
                let rack = args.required(0, "rackId")?;
                self.run(&ctx, |s| s.remaining_capacity(rack))
            }
            "redeemable" => {
                let account = args.required(0, "accountId")?;
                let rack = args.required(1, "rackId")?;
                self.run(&ctx, |s| s.redeemable(account, rack))
            }
            "profitToDate" => {
                let account = args.required(0, "accountId")?;
                self.run(&ctx, |s| s.profit_to_date(account))
            }
            "getRound" => {
                let rack = args.required(0, "rackId")?;
                let round = args.required(1, "roundId")?;
                self.run(&ctx, |s| s.round(rack, round))
            }
            "investmentIndex" => {
                let account = args.required(0, "accountId")?;
                self.run(&ctx, |s| s.investment_index(account))
            }

            other => Err(LedgerError::invalid(format!("unknown command '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rl_01_world_state::InMemoryWorldState;
    use rl_02_ledger_engine::ErrorKind;

    fn dispatcher() -> Dispatcher<InMemoryWorldState> {
        Dispatcher::new(LedgerEngine::new(InMemoryWorldState::new()))
    }

    fn request(command: &str, args: &[&str]) -> CommandRequest {
        CommandRequest::new("tx-1", 1_000, command, args.iter().copied())
    }

    #[test]
    fn test_every_listed_command_is_routed() {
        let mut d = dispatcher();
        for command in COMMANDS {
            if let CommandResponse::Error { error, .. } = d.handle(&request(command, &[])) {
                assert!(
                    !error.message.contains("unknown command"),
                    "{} is listed but not routed",
                    command
                );
            }
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        let err = dispatcher().dispatch(&request("mint", &[])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.message.contains("mint"));
    }

    #[test]
    fn test_bad_amount_rejected() {
        let err = dispatcher()
            .dispatch(&request("initIssuancePool", &["a lot"]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_missing_argument_rejected() {
        let err = dispatcher().dispatch(&request("transfer", &["alice"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.message.contains("to"));
    }

    #[test]
    fn test_dispatch_returns_json() {
        let mut d = dispatcher();
        let bytes = d.dispatch(&request("initIssuancePool", &["1000"])).unwrap();
        let account: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(account["rest_balance"], 1000);
        assert_eq!(account["kind"], "system");
    }

    #[test]
    fn test_range_arguments() {
        let values: Vec<String> = ["acct", "3", "10", "desc", "", "500", "42"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let query = Args::new("accountTxHistory", &values).range(1).unwrap();
        assert_eq!(query.begin_seq, 3);
        assert_eq!(query.count, 10);
        assert_eq!(query.order, ScanOrder::Descending);
        assert_eq!(query.begin_time, 0);
        assert_eq!(query.end_time, 500);
        assert_eq!(query.pinned_max_seq, Some(42));
    }

    #[test]
    fn test_negative_max_seq_is_not_pinned() {
        let values: Vec<String> = ["1", "-1", "desc", "", "", "-1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let query = Args::new("txHistory", &values).range(0).unwrap();
        assert_eq!(query.count, -1);
        assert_eq!(query.pinned_max_seq, None);

        let values: Vec<String> = ["", "", "", "", "", "0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let query = Args::new("txHistory", &values).range(0).unwrap();
        assert_eq!(query.pinned_max_seq, Some(0));
    }

    #[test]
    fn test_self_transfer_flag() {
        let mut d = dispatcher();
        d.dispatch(&request("initIssuancePool", &["1000"])).unwrap();
        d.dispatch(&request("createAccount", &["alice", "person", "alice"])).unwrap();
        d.dispatch(&request("issue", &["alice", "50"])).unwrap();

        let skipped: Value =
            serde_json::from_slice(&d.dispatch(&request("transfer", &["alice", "alice", "10"])).unwrap())
                .unwrap();
        assert_eq!(skipped, Value::Null);

        let recorded: Value = serde_json::from_slice(
            &d.dispatch(&request("transfer", &["alice", "alice", "10", "", "audit", "true"]))
                .unwrap(),
        )
        .unwrap();
        assert!(!recorded.is_null());

        let err = d
            .dispatch(&request("transfer", &["alice", "alice", "10", "", "", "maybe"]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_range_defaults() {
        let values: Vec<String> = Vec::new();
        let query = Args::new("txHistory", &values).range(0).unwrap();
        assert_eq!(query, RangeQuery::ascending());
    }

    #[test]
    fn test_accounts_by_role_parsing() {
        let parsed = parse_accounts_by_role(r#"{"seller":"alice","platform":"bob:1;carol:2"}"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("platform".to_string(), "bob:1;carol:2".to_string()),
                ("seller".to_string(), "alice".to_string()),
            ]
        );
        assert!(parse_accounts_by_role("seller=alice").is_err());
    }
}
