//! Reconciliation invariants.
//!
//! A violation is never corrected: callers turn it into
//! [`LedgerError::InvariantViolation`] and the invocation aborts.

use shared_types::Amount;

use super::entities::{AllocationRecord, FinancingRound};
use super::errors::LedgerError;

/// Allocation shares sum exactly to the allocated total.
pub fn invariant_allocation_complete(record: &AllocationRecord) -> bool {
    let sum: i128 = record
        .amount_by_role_by_account
        .values()
        .flat_map(|accounts| accounts.values())
        .map(|amount| i128::from(*amount))
        .sum();
    sum == i128::from(record.total_amount)
}

/// Profit handed out never exceeds the investor pool.
pub fn invariant_profit_within_pool(round: &FinancingRound) -> bool {
    let distributed: i128 = round.user_profit.values().map(|p| i128::from(*p)).sum();
    distributed <= i128::from(round.cost_earn_info.investor_pool)
}

/// Per-investor principal adds up to the round's invested amount.
pub fn invariant_principal_reconciles(round: &FinancingRound) -> bool {
    let total: i128 = round.user_amount.values().map(|a| i128::from(*a)).sum();
    total == i128::from(round.amount_invested)
}

/// Balances never go negative.
pub fn invariant_non_negative(balance: Amount) -> bool {
    balance >= 0
}

/// Check both allocation invariants, naming the record on failure.
pub fn check_allocation(record: &AllocationRecord) -> Result<(), LedgerError> {
    if !invariant_allocation_complete(record) {
        return Err(LedgerError::InvariantViolation(format!(
            "allocation {} on rack {} does not sum to {}",
            record.global_serial, record.rack_id, record.total_amount
        )));
    }
    Ok(())
}

/// Check the bonus reconciliation of a round.
pub fn check_bonus(round: &FinancingRound) -> Result<(), LedgerError> {
    if !invariant_principal_reconciles(round) {
        return Err(LedgerError::InvariantViolation(format!(
            "round {} principal does not match amount invested {}",
            round.key(),
            round.amount_invested
        )));
    }
    if !invariant_profit_within_pool(round) {
        return Err(LedgerError::InvariantViolation(format!(
            "round {} distributes more than investor pool {}",
            round.key(),
            round.cost_earn_info.investor_pool
        )));
    }
    Ok(())
}
