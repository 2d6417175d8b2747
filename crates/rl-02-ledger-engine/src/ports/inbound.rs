//! Inbound Ports (Driving Ports / API)
//!
//! Every trait is implemented by [`Session`](crate::Session), so operations
//! compose freely inside one invocation: an investment calls the transfer
//! engine, which consults the lock engine, which reads the account store,
//! all through the same write buffer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Amount, Timestamp};

use crate::domain::entities::{
    Account, AccountIndexEntry, AccountInvestmentIndex, AccountKind, AllocationRecord,
    FinanceConfig, FinancingHistory, FinancingRound, LedgerEntry, LockEntry, LockSchedule,
    RoleRates, Timestamped,
};
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{
    AllocationOrder, AllocationScope, BalanceView, CloseSummary, InvestOrder, InvestReceipt,
    LockedBalance, LogScope, Page, RangeQuery, Redemption, ScanOrder, ScopeRef, TransferOrder,
    TransferReceipt,
};

/// CRUD over account entities.
pub trait AccountStore {
    fn find_account(&mut self, id: &str) -> Result<Option<Account>, LedgerError>;

    /// `NotFound` when absent.
    fn get_account(&mut self, id: &str) -> Result<Account, LedgerError>;

    fn put_account(&mut self, account: &Account) -> Result<(), LedgerError>;

    fn account_exists(&mut self, id: &str) -> Result<bool, LedgerError>;

    /// Register a new account at the invocation time.
    ///
    /// Non-system accounts are appended to the account-name index.
    fn create_account(
        &mut self,
        id: &str,
        kind: AccountKind,
        owner: &str,
    ) -> Result<Account, LedgerError>;

    /// Balance at the invocation time. Unknown accounts read as zero.
    fn balance(&mut self, id: &str) -> Result<BalanceView, LedgerError>;

    fn account_count(&mut self) -> Result<u64, LedgerError>;

    fn list_accounts(&mut self, query: &RangeQuery) -> Result<Page<AccountIndexEntry>, LedgerError>;

    fn authorize_user(&mut self, account_id: &str, user: &str) -> Result<Account, LedgerError>;

    fn is_authorized(&mut self, account_id: &str, user: &str) -> Result<bool, LedgerError>;
}

/// Monotonic counters keyed by scope. Counters start at 0.
pub trait Sequencer {
    /// Increment and return the new value.
    fn next_seq(&mut self, scope: &str) -> Result<u64, LedgerError>;

    fn current_seq(&mut self, scope: &str) -> Result<u64, LedgerError>;
}

/// Append-only sequenced records with secondary indexes.
pub trait TransactionLog {
    /// Append `record` to `scope` and a pointer to it in every index scope.
    ///
    /// Returns the record's sequence number in `scope`.
    fn append<T: Serialize>(
        &mut self,
        scope: &str,
        record: &T,
        index_scopes: &[String],
    ) -> Result<u64, LedgerError>;

    /// Page through a log or an index.
    fn range_query<T: DeserializeOwned + Timestamped>(
        &mut self,
        scope: &ScopeRef,
        query: &RangeQuery,
    ) -> Result<Page<T>, LedgerError>;

    fn tx_history(
        &mut self,
        scope: &LogScope,
        query: &RangeQuery,
    ) -> Result<Page<LedgerEntry>, LedgerError> {
        self.range_query(&ScopeRef::from(scope), query)
    }
}

/// Value movement between accounts.
pub trait TransferEngine {
    /// `None` when the order is a silent no-op.
    fn transfer(&mut self, order: &TransferOrder) -> Result<Option<TransferReceipt>, LedgerError>;
}

/// Supply creation through the issuance pool.
pub trait IssuanceEngine {
    fn init_issuance_pool(&mut self, total_supply: Amount) -> Result<Account, LedgerError>;

    /// Returns the issuance log sequence number.
    fn issue(&mut self, to_id: &str, amount: Amount, description: &str) -> Result<u64, LedgerError>;

    fn issued_supply(&mut self) -> Result<Amount, LedgerError>;
}

/// Time-boxed holds on spendable balance.
pub trait LockEngine {
    fn locked_amount(&mut self, account_id: &str, at: Timestamp) -> Result<LockedBalance, LedgerError>;

    /// Append to, or with `overwrite` replace, the account's schedule.
    fn add_locks(
        &mut self,
        account_id: &str,
        entries: &[LockEntry],
        overwrite: bool,
    ) -> Result<LockSchedule, LedgerError>;
}

/// Role-weighted revenue splits.
pub trait AllocationEngine {
    fn allocate(&mut self, order: &AllocationOrder) -> Result<AllocationRecord, LedgerError>;

    fn allocation_history(
        &mut self,
        scope: &AllocationScope,
        query: &RangeQuery,
    ) -> Result<Page<AllocationRecord>, LedgerError>;

    /// First record of `rack_id` carrying `allocation_key` in scan order.
    fn find_allocation(
        &mut self,
        rack_id: &str,
        allocation_key: &str,
        order: ScanOrder,
    ) -> Result<Option<AllocationRecord>, LedgerError>;
}

/// Multi-round rack financing.
pub trait FinancingEngine {
    fn set_finance_config(&mut self, rack_id: &str, config: &FinanceConfig) -> Result<(), LedgerError>;

    fn set_role_rates(&mut self, rack_id: &str, rates: &RoleRates) -> Result<(), LedgerError>;

    /// Idempotent for the current id.
    fn set_current_round(&mut self, round_id: &str) -> Result<FinancingHistory, LedgerError>;

    fn financing_history(&mut self) -> Result<FinancingHistory, LedgerError>;

    fn invest(&mut self, order: &InvestOrder) -> Result<InvestReceipt, LedgerError>;

    /// Close the current round and roll the previous round's unredeemed
    /// principal into it.
    fn close_round(&mut self) -> Result<CloseSummary, LedgerError>;

    fn pay_bonus(
        &mut self,
        rack_id: &str,
        round_id: &str,
        sales: Amount,
    ) -> Result<FinancingRound, LedgerError>;

    /// Pay out every unredeemed closed round of `rack_id` from `payer_id`.
    fn redeem(
        &mut self,
        account_id: &str,
        rack_id: &str,
        payer_id: &str,
    ) -> Result<Redemption, LedgerError>;

    /// What [`FinancingEngine::redeem`] would pay, without writing.
    fn redeemable(&mut self, account_id: &str, rack_id: &str) -> Result<Redemption, LedgerError>;

    fn remaining_capacity(&mut self, rack_id: &str) -> Result<Amount, LedgerError>;

    fn profit_to_date(&mut self, account_id: &str) -> Result<Amount, LedgerError>;

    fn round(&mut self, rack_id: &str, round_id: &str) -> Result<FinancingRound, LedgerError>;

    fn investment_index(&mut self, account_id: &str) -> Result<AccountInvestmentIndex, LedgerError>;
}
