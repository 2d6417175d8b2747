//! Bonus arithmetic for a closed financing round.
//!
//! ```text
//! rack_profit   = sales * profit_percent / 100
//! seller_profit = rack_profit * seller_weight / Σweights
//! investor_pool = seller_profit * invest_profit_percent / 100 / 100
//! profit(user)  = user_amount * investor_pool / capacity
//! ```
//!
//! The final `/ 100` converts from the profit unit to the investment unit.
//! The per-investor denominator is the round capacity, not the amount
//! actually invested, so an under-subscribed round leaves part of the pool
//! undistributed.

use shared_types::{AccountId, Amount};
use std::collections::BTreeMap;

use super::entities::{CostEarnInfo, FinanceConfig, RoleRates, SELLER_ROLE};
use super::errors::LedgerError;

/// Result of [`compute_bonus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BonusComputation {
    pub cost_earn_info: CostEarnInfo,
    pub user_profit: BTreeMap<AccountId, Amount>,
}

fn narrow(value: i128, what: &'static str) -> Result<Amount, LedgerError> {
    Amount::try_from(value).map_err(|_| LedgerError::Overflow(what))
}

/// Compute every investor's profit for one round.
pub fn compute_bonus(
    sales: Amount,
    config: &FinanceConfig,
    rates: &RoleRates,
    user_amount: &BTreeMap<AccountId, Amount>,
) -> Result<BonusComputation, LedgerError> {
    if sales < 0 {
        return Err(LedgerError::invalid(format!(
            "sales must be non-negative, got {}",
            sales
        )));
    }
    if config.capacity <= 0 {
        return Err(LedgerError::invalid("round capacity must be positive"));
    }
    let seller_weight = rates
        .weight_of(SELLER_ROLE)
        .ok_or_else(|| LedgerError::invalid("role rates have no seller role"))?;
    let weight_sum = i128::from(rates.total_weight());
    if weight_sum <= 0 {
        return Err(LedgerError::invalid("role rates sum to zero"));
    }

    let rack_profit = i128::from(sales) * i128::from(config.profit_percent) / 100;
    let seller_profit = rack_profit * i128::from(seller_weight) / weight_sum;
    let investor_pool = seller_profit * i128::from(config.invest_profit_percent) / 100 / 100;

    let mut distributed: i128 = 0;
    let mut user_profit = BTreeMap::new();
    for (account, amount) in user_amount {
        let profit = i128::from(*amount) * investor_pool / i128::from(config.capacity);
        distributed += profit;
        user_profit.insert(account.clone(), narrow(profit, "investor profit")?);
    }

    Ok(BonusComputation {
        cost_earn_info: CostEarnInfo {
            sales,
            rack_profit: narrow(rack_profit, "rack profit")?,
            seller_profit: narrow(seller_profit, "seller profit")?,
            investor_pool: narrow(investor_pool, "investor pool")?,
            distributed_profit: narrow(distributed, "distributed profit")?,
        },
        user_profit,
    })
}
