//! Value objects passed into and returned from engine operations.

use serde::{Deserialize, Serialize};
use shared_types::{AccountId, Amount, RackId, RoundId, Timestamp};

use super::entities::{LockEntry, RoundKey};
use super::keys;

/// Direction of a log scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanOrder {
    #[default]
    Ascending,
    Descending,
}

/// Transaction log selectable by a history query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogScope {
    Global,
    Account(AccountId),
    Issuance,
}

/// Allocation log selectable by a history query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationScope {
    Rack(RackId),
    Account(AccountId),
}

/// Where the records of a scope live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeRef {
    /// Sequencer scope
    pub scope: String,
    /// Records are pointers under `IDX~` rather than records under `LOG~`.
    pub indexed: bool,
}

impl From<&LogScope> for ScopeRef {
    fn from(scope: &LogScope) -> Self {
        match scope {
            LogScope::Global => Self {
                scope: keys::GLOBAL_TX_SCOPE.to_string(),
                indexed: false,
            },
            LogScope::Account(id) => Self {
                scope: keys::account_tx_scope(id),
                indexed: true,
            },
            LogScope::Issuance => Self {
                scope: keys::ISSUANCE_SCOPE.to_string(),
                indexed: false,
            },
        }
    }
}

impl From<&AllocationScope> for ScopeRef {
    fn from(scope: &AllocationScope) -> Self {
        match scope {
            AllocationScope::Rack(id) => Self {
                scope: keys::rack_allocation_scope(id),
                indexed: false,
            },
            AllocationScope::Account(id) => Self {
                scope: keys::account_allocation_scope(id),
                indexed: true,
            },
        }
    }
}

/// Bounded, bidirectional page request.
///
/// Serials are client-visible positions starting at 1. In descending order
/// serial 1 is the newest record at `max_seq`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeQuery {
    /// Floored to 1.
    pub begin_seq: i64,
    /// Negative means "to the end". A non-negative count is capped at the
    /// engine's page size.
    pub count: i64,
    pub begin_time: Timestamp,
    /// Negative means unbounded.
    pub end_time: Timestamp,
    /// Reuse this log length instead of the live counter.
    pub pinned_max_seq: Option<u64>,
    pub order: ScanOrder,
}

impl Default for RangeQuery {
    fn default() -> Self {
        Self {
            begin_seq: 1,
            count: -1,
            begin_time: 0,
            end_time: -1,
            pinned_max_seq: None,
            order: ScanOrder::Ascending,
        }
    }
}

impl RangeQuery {
    pub fn ascending() -> Self {
        Self::default()
    }

    pub fn descending() -> Self {
        Self {
            order: ScanOrder::Descending,
            ..Self::default()
        }
    }

    pub fn starting_at(mut self, begin_seq: i64) -> Self {
        self.begin_seq = begin_seq;
        self
    }

    pub fn take(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn between(mut self, begin_time: Timestamp, end_time: Timestamp) -> Self {
        self.begin_time = begin_time;
        self.end_time = end_time;
        self
    }

    pub fn pinned(mut self, max_seq: u64) -> Self {
        self.pinned_max_seq = Some(max_seq);
        self
    }

    pub fn accepts_time(&self, time: Timestamp) -> bool {
        time >= self.begin_time && (self.end_time < 0 || time <= self.end_time)
    }
}

/// One record of a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedRecord<T> {
    /// Client-visible position.
    pub serial: u64,
    /// Position in the underlying log.
    pub source_seq: u64,
    pub record: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<PagedRecord<T>>,
    /// Serial to resume from. Greater than `max_seq` once exhausted.
    pub next_seq: u64,
    /// Log length the page was computed against.
    pub max_seq: u64,
}

impl<T> Page<T> {
    pub fn is_exhausted(&self) -> bool {
        self.next_seq > self.max_seq
    }

    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|item| &item.record)
    }
}

/// Balance view with the zero fallback for unknown accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BalanceView {
    pub account_id: AccountId,
    pub rest_balance: Amount,
    pub total_issued: Amount,
    pub locked: Amount,
    pub available: Amount,
}

/// Locked amount at a time together with the full schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LockedBalance {
    pub locked: Amount,
    pub entries: Vec<LockEntry>,
}

/// Request to move value between two accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TransferOrder {
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: Amount,
    pub trans_type: String,
    pub description: String,
    /// Log a self-transfer even though no balance changes.
    pub record_self_transfer: bool,
}

impl TransferOrder {
    pub fn new(from_id: impl Into<AccountId>, to_id: impl Into<AccountId>, amount: Amount) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            amount,
            trans_type: "transfer".to_string(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, trans_type: impl Into<String>) -> Self {
        self.trans_type = trans_type.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn recording_self_transfer(mut self) -> Self {
        self.record_self_transfer = true;
        self
    }
}

/// Log positions of a recorded transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub debit_seq: u64,
    pub credit_seq: u64,
}

/// Request to split a total across roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AllocationOrder {
    pub rack_id: RackId,
    pub allocation_key: String,
    pub total_amount: Amount,
    /// `(role, beneficiary spec)`; a spec is an account id or
    /// `account:weight;account:weight`.
    pub accounts_by_role: Vec<(String, String)>,
    /// `role:weight,role:weight`, in split order.
    pub role_rates: String,
    /// Pays every share when set.
    pub payer: Option<AccountId>,
}

/// Request to put principal into the current round of a rack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InvestOrder {
    pub account_id: AccountId,
    pub rack_id: RackId,
    pub amount: Amount,
    /// Carried-forward principal; moves no funds and skips the capacity check.
    pub renewal: bool,
}

impl InvestOrder {
    pub fn new(account_id: impl Into<AccountId>, rack_id: impl Into<RackId>, amount: Amount) -> Self {
        Self {
            account_id: account_id.into(),
            rack_id: rack_id.into(),
            amount,
            renewal: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestReceipt {
    pub round: RoundKey,
    pub user_amount: Amount,
    pub amount_invested: Amount,
}

/// Principal carried from the previous round into the current one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollover {
    pub rack_id: RackId,
    pub account_id: AccountId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSummary {
    pub round_id: RoundId,
    pub closed_racks: Vec<RackId>,
    pub rollovers: Vec<Rollover>,
}

impl CloseSummary {
    pub fn rolled_principal(&self) -> Amount {
        self.rollovers.iter().map(|r| r.amount).sum()
    }
}

/// What a redemption pays, or would pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Redemption {
    pub principal: Amount,
    pub profit: Amount,
    pub rounds: Vec<RoundKey>,
    /// Set once funds moved.
    pub transfer: Option<TransferReceipt>,
}

impl Redemption {
    pub fn total(&self) -> Amount {
        self.principal + self.profit
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_query_defaults() {
        let query = RangeQuery::default();
        assert_eq!(query.begin_seq, 1);
        assert!(query.count < 0);
        assert!(query.accepts_time(i64::MAX));
    }

    #[test]
    fn test_time_window() {
        let query = RangeQuery::ascending().between(10, 20);
        assert!(!query.accepts_time(9));
        assert!(query.accepts_time(10));
        assert!(query.accepts_time(20));
        assert!(!query.accepts_time(21));
    }

    #[test]
    fn test_scope_refs() {
        let global = ScopeRef::from(&LogScope::Global);
        assert_eq!(global.scope, "TX");
        assert!(!global.indexed);

        let account = ScopeRef::from(&LogScope::Account("alice".into()));
        assert_eq!(account.scope, "TX|alice");
        assert!(account.indexed);

        let rack = ScopeRef::from(&AllocationScope::Rack("r1".into()));
        assert_eq!(rack.scope, "ALLOC|r1");
    }
}
