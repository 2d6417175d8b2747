//! # Domain Entities
//!
//! Records persisted in the world state.
//!
//! ## Encoding
//!
//! Every record is a JSON object tagged by field name. Structs carry
//! `#[serde(default)]` so a record written before a field existed still
//! decodes. Maps are `BTreeMap` and lists keep insertion order, so the same
//! logical state always encodes to the same bytes on every replica.

use serde::{Deserialize, Serialize};
use shared_types::{AccountId, Amount, RackId, RoundId, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::errors::LedgerError;

/// Role whose weight decides the seller's share of rack profit.
pub const SELLER_ROLE: &str = "seller";

/// Records ordered by a logical timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Bank,
    Company,
    Project,
    #[default]
    Person,
    System,
}

impl FromStr for AccountKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "company" => Ok(Self::Company),
            "project" => Ok(Self::Project),
            "person" => Ok(Self::Person),
            "system" => Ok(Self::System),
            other => Err(LedgerError::invalid(format!("unknown account kind '{}'", other))),
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bank => "bank",
            Self::Company => "company",
            Self::Project => "project",
            Self::Person => "person",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// Account entity.
///
/// `rest_balance >= 0` always holds; spendable funds are
/// `rest_balance - locked(now)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Account {
    pub id: AccountId,
    pub kind: AccountKind,
    /// Total value ever credited to this account.
    pub total_issued: Amount,
    /// Current balance.
    pub rest_balance: Amount,
    pub owner: String,
    pub authorized_users: Vec<String>,
    pub creation_time: Timestamp,
}

impl Account {
    pub fn new(
        id: impl Into<AccountId>,
        kind: AccountKind,
        owner: impl Into<String>,
        creation_time: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            owner: owner.into(),
            creation_time,
            ..Default::default()
        }
    }

    /// Owner or an explicitly authorized user.
    pub fn is_authorized(&self, user: &str) -> bool {
        self.owner == user || self.authorized_users.iter().any(|u| u == user)
    }
}

// =============================================================================
// TRANSACTION LOG
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryFlag {
    #[default]
    Debit,
    Credit,
}

/// Visibility class of a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransLevel {
    /// Publicly queryable by the owner.
    #[default]
    Ordinary,
    /// One party is the central account.
    Restricted,
}

/// One side of a transfer, written once and never mutated.
///
/// `from_id` is the perspective account: the payer for the debit half, the
/// payee for the credit half. Both halves carry the same `global_serial`,
/// the log position of the debit half.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerEntry {
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub flag: EntryFlag,
    pub amount: Amount,
    pub trans_type: String,
    pub description: String,
    pub tx_id: String,
    pub time: Timestamp,
    pub global_serial: u64,
    pub trans_level: TransLevel,
}

impl Timestamped for LedgerEntry {
    fn timestamp(&self) -> Timestamp {
        self.time
    }
}

/// Index entry pointing at a record stored under another key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogPointer {
    pub target_key: String,
    pub target_seq: u64,
}

/// Entry of the account-name index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccountIndexEntry {
    pub account_id: AccountId,
    pub kind: AccountKind,
    pub creation_time: Timestamp,
}

impl Timestamped for AccountIndexEntry {
    fn timestamp(&self) -> Timestamp {
        self.creation_time
    }
}

// =============================================================================
// LOCKS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LockEntry {
    /// Lock is active while `time < lock_end_time`.
    pub lock_end_time: Timestamp,
    pub lock_amount: Amount,
}

impl LockEntry {
    pub fn new(lock_end_time: Timestamp, lock_amount: Amount) -> Self {
        Self {
            lock_end_time,
            lock_amount,
        }
    }
}

/// Per-account list of holds. Expired entries stay until overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LockSchedule {
    pub entries: Vec<LockEntry>,
}

impl LockSchedule {
    /// Sum of entries with `lock_end_time > at`.
    pub fn locked_at(&self, at: Timestamp) -> Amount {
        self.entries
            .iter()
            .filter(|e| e.lock_end_time > at)
            .fold(0, |acc: Amount, e| acc.saturating_add(e.lock_amount))
    }
}

// =============================================================================
// ROLES & ALLOCATIONS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoleRate {
    pub role: String,
    pub weight: i64,
}

/// Ordered role weights. The LAST role absorbs rounding remainders.
///
/// Roles may repeat; their shares accumulate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoleRates {
    pub rates: Vec<RoleRate>,
}

impl RoleRates {
    pub fn new(rates: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(role, weight)| RoleRate { role, weight })
                .collect(),
        }
    }

    /// Parse `role:weight,role:weight`.
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let mut rates = Vec::new();
        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (role, weight) = part
                .split_once(':')
                .ok_or_else(|| LedgerError::invalid(format!("role rate '{}' is not role:weight", part)))?;
            let weight: i64 = weight.trim().parse().map_err(|_| {
                LedgerError::invalid(format!("role rate '{}' has a non-integer weight", part))
            })?;
            rates.push((role.trim().to_string(), weight));
        }
        let parsed = Self::new(rates);
        parsed.validate()?;
        Ok(parsed)
    }

    /// At least one role, no negative weight, positive total.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.rates.is_empty() {
            return Err(LedgerError::invalid("role rates are empty"));
        }
        if let Some(bad) = self.rates.iter().find(|r| r.weight < 0 || r.role.is_empty()) {
            return Err(LedgerError::invalid(format!(
                "role rate '{}:{}' is invalid",
                bad.role, bad.weight
            )));
        }
        if self.total_weight() <= 0 {
            return Err(LedgerError::invalid("role rates sum to zero"));
        }
        Ok(())
    }

    pub fn total_weight(&self) -> i64 {
        self.rates.iter().map(|r| r.weight).sum()
    }

    /// Summed weight of every entry for `role`.
    pub fn weight_of(&self, role: &str) -> Option<i64> {
        let mut found = None;
        for rate in self.rates.iter().filter(|r| r.role == role) {
            *found.get_or_insert(0) += rate.weight;
        }
        found
    }

    pub fn weights(&self) -> Vec<i64> {
        self.rates.iter().map(|r| r.weight).collect()
    }
}

impl fmt::Display for RoleRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .rates
            .iter()
            .map(|r| format!("{}:{}", r.role, r.weight))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// One split of a total across roles and accounts. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AllocationRecord {
    pub rack_id: RackId,
    /// Caller-supplied lookup key; uniqueness is not enforced.
    pub allocation_key: String,
    pub total_amount: Amount,
    /// role -> account -> amount
    pub amount_by_role_by_account: BTreeMap<String, BTreeMap<AccountId, Amount>>,
    pub roles_rate_percentages: Vec<RoleRate>,
    /// Position in the rack's allocation log.
    pub global_serial: u64,
    pub time: Timestamp,
    pub tx_id: String,
    /// Account the shares were paid from, if funds moved.
    pub payer: Option<AccountId>,
}

impl AllocationRecord {
    /// Distinct beneficiary accounts, in account order.
    pub fn beneficiaries(&self) -> BTreeSet<&str> {
        self.amount_by_role_by_account
            .values()
            .flat_map(|accounts| accounts.keys().map(String::as_str))
            .collect()
    }

    /// Total credited to each distinct account across all roles.
    pub fn amount_by_account(&self) -> BTreeMap<&str, Amount> {
        let mut totals: BTreeMap<&str, Amount> = BTreeMap::new();
        for accounts in self.amount_by_role_by_account.values() {
            for (account, amount) in accounts {
                *totals.entry(account.as_str()).or_insert(0) += *amount;
            }
        }
        totals
    }
}

impl Timestamped for AllocationRecord {
    fn timestamp(&self) -> Timestamp {
        self.time
    }
}

// =============================================================================
// FINANCING
// =============================================================================

/// Per-rack financing parameters. Snapshotted into each round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FinanceConfig {
    /// Maximum principal a round may hold, carryover included.
    pub capacity: Amount,
    /// Share of sales that is rack profit, in percent.
    pub profit_percent: i64,
    /// Share of seller profit paid to investors, in percent.
    pub invest_profit_percent: i64,
    /// Account receiving invested funds.
    pub payee_account: AccountId,
}

impl FinanceConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.capacity <= 0 {
            return Err(LedgerError::invalid(format!(
                "capacity must be positive, got {}",
                self.capacity
            )));
        }
        for (name, value) in [
            ("profit_percent", self.profit_percent),
            ("invest_profit_percent", self.invest_profit_percent),
        ] {
            if !(0..=100).contains(&value) {
                return Err(LedgerError::invalid(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        if self.payee_account.is_empty() {
            return Err(LedgerError::invalid("payee_account must be set"));
        }
        Ok(())
    }
}

/// Round lifecycle. Only moves forward.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum RoundStage {
    #[default]
    Open,
    Closed,
    BonusPaid,
}

/// Profit figures recorded when the bonus is paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CostEarnInfo {
    pub sales: Amount,
    pub rack_profit: Amount,
    pub seller_profit: Amount,
    pub investor_pool: Amount,
    pub distributed_profit: Amount,
}

/// Financing state of one rack in one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FinancingRound {
    pub rack_id: RackId,
    pub round_id: RoundId,
    pub amount_invested: Amount,
    pub cost_earn_info: CostEarnInfo,
    pub finance_config: FinanceConfig,
    pub role_rates: RoleRates,
    pub user_amount: BTreeMap<AccountId, Amount>,
    pub user_profit: BTreeMap<AccountId, Amount>,
    pub user_renewal: BTreeMap<AccountId, Amount>,
    pub stage: RoundStage,
    pub redeemed_users: Vec<AccountId>,
}

impl FinancingRound {
    pub fn new(
        rack_id: impl Into<RackId>,
        round_id: impl Into<RoundId>,
        finance_config: FinanceConfig,
        role_rates: RoleRates,
    ) -> Self {
        Self {
            rack_id: rack_id.into(),
            round_id: round_id.into(),
            finance_config,
            role_rates,
            ..Default::default()
        }
    }

    pub fn key(&self) -> RoundKey {
        RoundKey::new(&self.rack_id, &self.round_id)
    }

    pub fn is_redeemed_by(&self, account: &str) -> bool {
        self.redeemed_users.iter().any(|u| u == account)
    }

    /// Principal still owed to investors who have not redeemed.
    pub fn unredeemed_principal(&self) -> Amount {
        self.unredeemed_positions().map(|(_, amount)| amount).sum()
    }

    /// `(account, principal)` of every investor who has not redeemed.
    pub fn unredeemed_positions(&self) -> impl Iterator<Item = (&str, Amount)> + '_ {
        self.user_amount
            .iter()
            .filter(|(account, amount)| **amount > 0 && !self.is_redeemed_by(account))
            .map(|(account, amount)| (account.as_str(), *amount))
    }

    pub fn total_user_amount(&self) -> Amount {
        self.user_amount.values().sum()
    }
}

/// Identifies a [`FinancingRound`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoundKey {
    pub rack_id: RackId,
    pub round_id: RoundId,
}

impl RoundKey {
    pub fn new(rack_id: &str, round_id: &str) -> Self {
        Self {
            rack_id: rack_id.to_string(),
            round_id: round_id.to_string(),
        }
    }
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rack_id, self.round_id)
    }
}

/// Program-wide two-slot window of round ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FinancingHistory {
    pub previous_round_id: Option<RoundId>,
    pub current_round_id: Option<RoundId>,
}

impl FinancingHistory {
    /// Shift the window. Returns `false` if `round_id` is already current.
    pub fn advance(&mut self, round_id: &str) -> bool {
        if self.current_round_id.as_deref() == Some(round_id) {
            return false;
        }
        self.previous_round_id = self.current_round_id.take();
        self.current_round_id = Some(round_id.to_string());
        true
    }
}

/// Rounds an account participates in, oldest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccountInvestmentIndex {
    pub active_round_keys: Vec<RoundKey>,
    pub latest_round_id: Option<RoundId>,
    pub redeemed_round_ids: Vec<RoundKey>,
}

impl AccountInvestmentIndex {
    pub fn record(&mut self, key: RoundKey) {
        self.latest_round_id = Some(key.round_id.clone());
        if !self.active_round_keys.contains(&key) {
            self.active_round_keys.push(key);
        }
    }

    pub fn keys_for_rack<'a>(&'a self, rack_id: &'a str) -> impl Iterator<Item = &'a RoundKey> {
        self.active_round_keys
            .iter()
            .filter(move |k| k.rack_id == rack_id)
    }

    /// Move `consumed` from the active set to the redeemed list.
    pub fn retire(&mut self, consumed: &[RoundKey]) {
        self.active_round_keys.retain(|k| !consumed.contains(k));
        for key in consumed {
            if !self.redeemed_round_ids.contains(key) {
                self.redeemed_round_ids.push(key.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_kind_parse() {
        assert_eq!("Bank".parse::<AccountKind>().unwrap(), AccountKind::Bank);
        assert_eq!("system".parse::<AccountKind>().unwrap(), AccountKind::System);
        assert!("robot".parse::<AccountKind>().is_err());
    }

    #[test]
    fn test_account_decodes_with_missing_fields() {
        let account: Account = serde_json::from_str(r#"{"id":"alice","kind":"person"}"#).unwrap();
        assert_eq!(account.id, "alice");
        assert_eq!(account.rest_balance, 0);
        assert!(account.authorized_users.is_empty());
    }

    #[test]
    fn test_account_authorization() {
        let mut account = Account::new("acme", AccountKind::Company, "carol", 0);
        assert!(account.is_authorized("carol"));
        assert!(!account.is_authorized("dave"));
        account.authorized_users.push("dave".into());
        assert!(account.is_authorized("dave"));
    }

    #[test]
    fn test_locked_amount_ignores_expired() {
        let schedule = LockSchedule {
            entries: vec![LockEntry::new(110, 40), LockEntry::new(100, 25)],
        };
        assert_eq!(schedule.locked_at(99), 65);
        assert_eq!(schedule.locked_at(100), 40);
        assert_eq!(schedule.locked_at(110), 0);
    }

    #[test]
    fn test_role_rates_parse() {
        let rates = RoleRates::parse("seller:40, operator:30,platform:30").unwrap();
        assert_eq!(rates.rates.len(), 3);
        assert_eq!(rates.total_weight(), 100);
        assert_eq!(rates.weight_of("seller"), Some(40));
        assert_eq!(rates.weight_of("missing"), None);
        assert_eq!(rates.to_string(), "seller:40,operator:30,platform:30");
    }

    #[test]
    fn test_role_rates_repeated_role_sums() {
        let rates = RoleRates::parse("a:1,b:1,b:1").unwrap();
        assert_eq!(rates.weight_of("b"), Some(2));
    }

    #[test]
    fn test_role_rates_reject_malformed() {
        assert!(RoleRates::parse("").is_err());
        assert!(RoleRates::parse("seller").is_err());
        assert!(RoleRates::parse("seller:x").is_err());
        assert!(RoleRates::parse("seller:-5,platform:10").is_err());
        assert!(RoleRates::parse("seller:0,platform:0").is_err());
    }

    #[test]
    fn test_finance_config_validation() {
        let config = FinanceConfig {
            capacity: 1000,
            profit_percent: 20,
            invest_profit_percent: 50,
            payee_account: "rack-owner".into(),
        };
        assert!(config.validate().is_ok());

        let bad = FinanceConfig {
            profit_percent: 101,
            ..config.clone()
        };
        assert!(bad.validate().is_err());

        let bad = FinanceConfig {
            capacity: 0,
            ..config
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_round_stage_is_ordered() {
        assert!(RoundStage::Open < RoundStage::Closed);
        assert!(RoundStage::Closed < RoundStage::BonusPaid);
    }

    #[test]
    fn test_unredeemed_principal_skips_redeemed_users() {
        let mut round = FinancingRound::new("r1", "f1", FinanceConfig::default(), RoleRates::default());
        round.user_amount.insert("alice".into(), 300);
        round.user_amount.insert("bob".into(), 200);
        round.redeemed_users.push("bob".into());
        assert_eq!(round.unredeemed_principal(), 300);
    }

    #[test]
    fn test_history_advance_is_idempotent() {
        let mut history = FinancingHistory::default();
        assert!(history.advance("f1"));
        assert!(!history.advance("f1"));
        assert!(history.advance("f2"));
        assert_eq!(history.previous_round_id.as_deref(), Some("f1"));
        assert_eq!(history.current_round_id.as_deref(), Some("f2"));
    }

    #[test]
    fn test_investment_index_record_and_retire() {
        let mut index = AccountInvestmentIndex::default();
        index.record(RoundKey::new("r1", "f1"));
        index.record(RoundKey::new("r1", "f1"));
        index.record(RoundKey::new("r2", "f2"));
        assert_eq!(index.active_round_keys.len(), 2);
        assert_eq!(index.latest_round_id.as_deref(), Some("f2"));

        index.retire(&[RoundKey::new("r1", "f1")]);
        assert_eq!(index.keys_for_rack("r1").count(), 0);
        assert_eq!(index.redeemed_round_ids, vec![RoundKey::new("r1", "f1")]);
    }

    #[test]
    fn test_allocation_beneficiaries_are_distinct() {
        let mut record = AllocationRecord::default();
        record
            .amount_by_role_by_account
            .entry("seller".into())
            .or_default()
            .insert("alice".into(), 10);
        record
            .amount_by_role_by_account
            .entry("platform".into())
            .or_default()
            .insert("alice".into(), 5);
        assert_eq!(record.beneficiaries().len(), 1);
        assert_eq!(record.amount_by_account()["alice"], 15);
    }
}
