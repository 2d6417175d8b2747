//! # Rack Financing
//!
//! Per `(rack, round)` state machine: `Open -> Closed -> BonusPaid`.
//!
//! ## Round window
//!
//! One program-wide [`FinancingHistory`] holds the previous and current
//! round ids. Investments always target the current round. The window only
//! moves to a new id once the current round is closed. Closing the current
//! round:
//!
//! 1. marks every rack's round under the current id `Closed`,
//! 2. re-invests each unredeemed position of the previous round into the
//!    current round as a renewal (bookkeeping only, no funds move),
//! 3. records the id as the last closed round so a second close fails.
//!
//! ## Capacity
//!
//! Until the current round is closed, the previous round's unredeemed
//! principal is carryover and counts against capacity. After the close it
//! has been rolled into `amount_invested` and no longer counts separately.
//!
//! ## Redemption
//!
//! Only closed rounds the account has not yet redeemed qualify. Each one
//! contributes its position less the renewal rolled in from the round
//! before, so rolled principal is paid once. Profit is summed over every
//! qualifying round.

use rl_01_world_state::WorldState;
use shared_types::{validate_identifier, AccountId, Amount, RoundId};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::session::Session;
use crate::domain::entities::{
    AccountInvestmentIndex, FinanceConfig, FinancingHistory, FinancingRound, RoleRates, RoundKey,
    RoundStage, SELLER_ROLE,
};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::check_bonus;
use crate::domain::keys;
use crate::domain::profit::compute_bonus;
use crate::domain::value_objects::{
    CloseSummary, InvestOrder, InvestReceipt, Redemption, Rollover, TransferOrder,
};
use crate::ports::inbound::{AccountStore, FinancingEngine, TransferEngine};

/// Add `amount` of principal for `account` to `round`.
///
/// An account that already redeemed this round starts over: its stale
/// principal and profit are replaced rather than accumulated.
fn credit_position(
    round: &mut FinancingRound,
    account_id: &str,
    amount: Amount,
    renewal: bool,
) -> Result<Amount, LedgerError> {
    let previous = round.user_amount.get(account_id).copied().unwrap_or(0);
    let user_amount = if round.is_redeemed_by(account_id) {
        round.redeemed_users.retain(|u| u != account_id);
        round.user_profit.remove(account_id);
        round.user_renewal.remove(account_id);
        amount
    } else {
        previous
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("user principal"))?
    };

    round.amount_invested = round
        .amount_invested
        .checked_add(user_amount - previous)
        .ok_or(LedgerError::Overflow("round principal"))?;
    round.user_amount.insert(account_id.to_string(), user_amount);
    if renewal {
        let renewed = round.user_renewal.entry(account_id.to_string()).or_insert(0);
        *renewed = renewed
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("user renewal"))?;
    }
    Ok(user_amount)
}

impl<S: WorldState> Session<'_, S> {
    fn load_history(&mut self) -> Result<FinancingHistory, LedgerError> {
        Ok(self
            .get_record(keys::FINANCING_HISTORY_KEY)?
            .unwrap_or_default())
    }

    fn current_round_id(&mut self) -> Result<RoundId, LedgerError> {
        self.load_history()?
            .current_round_id
            .ok_or_else(|| LedgerError::conflict("no current financing round"))
    }

    fn last_closed_round(&mut self) -> Result<Option<RoundId>, LedgerError> {
        self.get_record(keys::LAST_CLOSED_ROUND_KEY)
    }

    fn is_closed_round_id(&mut self, round_id: &str) -> Result<bool, LedgerError> {
        Ok(self.last_closed_round()?.as_deref() == Some(round_id))
    }

    fn load_round(&mut self, rack_id: &str, round_id: &str) -> Result<Option<FinancingRound>, LedgerError> {
        self.get_record(&keys::round_key(rack_id, round_id))
    }

    fn save_round(&mut self, round: &FinancingRound) -> Result<(), LedgerError> {
        self.put_record(&keys::round_key(&round.rack_id, &round.round_id), round)
    }

    fn racks_in_round(&mut self, round_id: &str) -> Result<Vec<String>, LedgerError> {
        Ok(self
            .get_record(&keys::round_racks_key(round_id))?
            .unwrap_or_default())
    }

    fn rack_config(&mut self, rack_id: &str) -> Result<FinanceConfig, LedgerError> {
        self.get_record(&keys::finance_config_key(rack_id))?
            .ok_or_else(|| LedgerError::not_found("finance config", rack_id))
    }

    /// Existing round, or a new one snapshotting the rack's current config.
    fn round_or_create(
        &mut self,
        rack_id: &str,
        round_id: &str,
        stage: RoundStage,
    ) -> Result<FinancingRound, LedgerError> {
        if let Some(round) = self.load_round(rack_id, round_id)? {
            return Ok(round);
        }
        let config = self.rack_config(rack_id)?;
        let rates: RoleRates = self
            .get_record(&keys::role_rates_key(rack_id))?
            .ok_or_else(|| LedgerError::not_found("role rates", rack_id))?;

        let mut racks = self.racks_in_round(round_id)?;
        if !racks.iter().any(|r| r == rack_id) {
            racks.push(rack_id.to_string());
            self.put_record(&keys::round_racks_key(round_id), &racks)?;
        }

        debug!(rack_id = %rack_id, round_id = %round_id, stage = ?stage, "Financing round created");
        let mut round = FinancingRound::new(rack_id, round_id, config, rates);
        round.stage = stage;
        Ok(round)
    }

    /// Unredeemed principal of the previous round not yet rolled forward.
    fn carryover(&mut self, rack_id: &str) -> Result<Amount, LedgerError> {
        let history = self.load_history()?;
        if let Some(current) = &history.current_round_id {
            if self.is_closed_round_id(current)? {
                return Ok(0);
            }
        }
        let Some(previous) = history.previous_round_id else {
            return Ok(0);
        };
        Ok(self
            .load_round(rack_id, &previous)?
            .map(|round| round.unredeemed_principal())
            .unwrap_or(0))
    }

    fn load_investment_index(&mut self, account_id: &str) -> Result<AccountInvestmentIndex, LedgerError> {
        Ok(self
            .get_record(&keys::investment_index_key(account_id))?
            .unwrap_or_default())
    }

    fn record_investment(&mut self, account_id: &str, key: RoundKey) -> Result<(), LedgerError> {
        let mut index = self.load_investment_index(account_id)?;
        index.record(key);
        self.put_record(&keys::investment_index_key(account_id), &index)
    }
}

impl<S: WorldState> FinancingEngine for Session<'_, S> {
    fn set_finance_config(&mut self, rack_id: &str, config: &FinanceConfig) -> Result<(), LedgerError> {
        validate_identifier("rack id", rack_id)?;
        validate_identifier("payee account", &config.payee_account)?;
        config.validate()?;
        self.put_record(&keys::finance_config_key(rack_id), config)?;
        info!(
            rack_id = %rack_id,
            capacity = config.capacity,
            profit_percent = config.profit_percent,
            invest_profit_percent = config.invest_profit_percent,
            "Finance config set"
        );
        Ok(())
    }

    fn set_role_rates(&mut self, rack_id: &str, rates: &RoleRates) -> Result<(), LedgerError> {
        validate_identifier("rack id", rack_id)?;
        rates.validate()?;
        if rates.weight_of(SELLER_ROLE).is_none() {
            return Err(LedgerError::invalid(format!(
                "role rates for rack {} need a '{}' role",
                rack_id, SELLER_ROLE
            )));
        }
        self.put_record(&keys::role_rates_key(rack_id), rates)?;
        info!(rack_id = %rack_id, rates = %rates, "Role rates set");
        Ok(())
    }

    fn set_current_round(&mut self, round_id: &str) -> Result<FinancingHistory, LedgerError> {
        validate_identifier("round id", round_id)?;
        let mut history = self.load_history()?;
        if let Some(current) = history.current_round_id.clone() {
            if current != round_id && !self.is_closed_round_id(&current)? {
                return Err(LedgerError::conflict(format!(
                    "round {} must be closed before advancing to {}",
                    current, round_id
                )));
            }
        }
        if history.advance(round_id) {
            self.put_record(keys::FINANCING_HISTORY_KEY, &history)?;
            info!(
                round_id = %round_id,
                previous = ?history.previous_round_id,
                "Current financing round advanced"
            );
        }
        Ok(history)
    }

    fn financing_history(&mut self) -> Result<FinancingHistory, LedgerError> {
        self.load_history()
    }

    fn invest(&mut self, order: &InvestOrder) -> Result<InvestReceipt, LedgerError> {
        validate_identifier("account id", &order.account_id)?;
        validate_identifier("rack id", &order.rack_id)?;
        if order.amount <= 0 {
            return Err(LedgerError::invalid(format!(
                "investment must be positive, got {}",
                order.amount
            )));
        }
        self.get_account(&order.account_id)?;

        let round_id = self.current_round_id()?;
        let initial_stage = if self.is_closed_round_id(&round_id)? {
            RoundStage::Closed
        } else {
            RoundStage::Open
        };
        let mut round = self.round_or_create(&order.rack_id, &round_id, initial_stage)?;

        match (round.stage, order.renewal) {
            (RoundStage::Open, _) | (RoundStage::Closed, true) => {}
            (stage, _) => {
                return Err(LedgerError::conflict(format!(
                    "round {} is {:?} and not accepting investment",
                    round.key(),
                    stage
                )));
            }
        }

        if !order.renewal {
            let carryover = self.carryover(&order.rack_id)?;
            let remaining = round
                .finance_config
                .capacity
                .saturating_sub(round.amount_invested)
                .saturating_sub(carryover);
            if order.amount > remaining {
                return Err(LedgerError::CapacityExceeded {
                    rack_id: order.rack_id.clone(),
                    requested: order.amount,
                    remaining: remaining.max(0),
                });
            }

            let payment = TransferOrder::new(
                order.account_id.clone(),
                round.finance_config.payee_account.clone(),
                order.amount,
            )
            .with_type("invest")
            .with_description(round.key().to_string());
            self.transfer(&payment)?;
        }

        let user_amount = credit_position(&mut round, &order.account_id, order.amount, order.renewal)?;
        self.save_round(&round)?;
        self.record_investment(&order.account_id, round.key())?;

        info!(
            account_id = %order.account_id,
            round = %round.key(),
            amount = order.amount,
            renewal = order.renewal,
            amount_invested = round.amount_invested,
            "Investment recorded"
        );
        Ok(InvestReceipt {
            round: round.key(),
            user_amount,
            amount_invested: round.amount_invested,
        })
    }

    fn close_round(&mut self) -> Result<CloseSummary, LedgerError> {
        let history = self.load_history()?;
        let round_id = history
            .current_round_id
            .clone()
            .ok_or_else(|| LedgerError::conflict("no current financing round"))?;
        if self.is_closed_round_id(&round_id)? {
            return Err(LedgerError::conflict(format!(
                "round {} is already closed",
                round_id
            )));
        }

        let mut closed_racks = self.racks_in_round(&round_id)?;
        for rack_id in &closed_racks {
            if let Some(mut round) = self.load_round(rack_id, &round_id)? {
                if round.stage == RoundStage::Open {
                    round.stage = RoundStage::Closed;
                    self.save_round(&round)?;
                }
            }
        }

        let mut rollovers = Vec::new();
        if let Some(previous_id) = &history.previous_round_id {
            for rack_id in self.racks_in_round(previous_id)? {
                let Some(previous) = self.load_round(&rack_id, previous_id)? else {
                    continue;
                };
                let positions: Vec<(String, Amount)> = previous
                    .unredeemed_positions()
                    .map(|(account, amount)| (account.to_string(), amount))
                    .collect();
                if positions.is_empty() {
                    continue;
                }

                let mut target = self.round_or_create(&rack_id, &round_id, RoundStage::Closed)?;
                for (account_id, amount) in positions {
                    credit_position(&mut target, &account_id, amount, true)?;
                    self.record_investment(&account_id, target.key())?;
                    rollovers.push(Rollover {
                        rack_id: rack_id.clone(),
                        account_id,
                        amount,
                    });
                }
                self.save_round(&target)?;
                if !closed_racks.contains(&rack_id) {
                    closed_racks.push(rack_id);
                }
            }
        }

        self.put_record(keys::LAST_CLOSED_ROUND_KEY, &round_id)?;

        let summary = CloseSummary {
            round_id,
            closed_racks,
            rollovers,
        };
        info!(
            round_id = %summary.round_id,
            racks = summary.closed_racks.len(),
            rollovers = summary.rollovers.len(),
            rolled_principal = summary.rolled_principal(),
            "Financing round closed"
        );
        Ok(summary)
    }

    fn pay_bonus(
        &mut self,
        rack_id: &str,
        round_id: &str,
        sales: Amount,
    ) -> Result<FinancingRound, LedgerError> {
        let mut round = self.round(rack_id, round_id)?;
        match round.stage {
            RoundStage::Closed => {}
            RoundStage::Open => {
                return Err(LedgerError::conflict(format!(
                    "round {} is not closed",
                    round.key()
                )))
            }
            RoundStage::BonusPaid => {
                return Err(LedgerError::conflict(format!(
                    "bonus for round {} already paid",
                    round.key()
                )))
            }
        }

        // Investors who already redeemed exited before the bonus.
        let eligible: BTreeMap<AccountId, Amount> = round
            .unredeemed_positions()
            .map(|(account, amount)| (account.to_string(), amount))
            .collect();
        let bonus = compute_bonus(sales, &round.finance_config, &round.role_rates, &eligible)?;
        round.cost_earn_info = bonus.cost_earn_info;
        round.user_profit = bonus.user_profit;
        check_bonus(&round)?;
        round.stage = RoundStage::BonusPaid;
        self.save_round(&round)?;

        info!(
            round = %round.key(),
            sales,
            investor_pool = round.cost_earn_info.investor_pool,
            distributed = round.cost_earn_info.distributed_profit,
            "Bonus paid"
        );
        Ok(round)
    }

    fn redeem(
        &mut self,
        account_id: &str,
        rack_id: &str,
        payer_id: &str,
    ) -> Result<Redemption, LedgerError> {
        let mut redemption = self.redeemable(account_id, rack_id)?;
        if redemption.is_empty() {
            debug!(account_id = %account_id, rack_id = %rack_id, "Nothing to redeem");
            return Ok(redemption);
        }

        let payout = TransferOrder::new(payer_id, account_id, redemption.total())
            .with_type("redeem")
            .with_description(rack_id);
        redemption.transfer = self.transfer(&payout)?;

        for key in &redemption.rounds {
            let mut round = self.round(&key.rack_id, &key.round_id)?;
            round.redeemed_users.push(account_id.to_string());
            self.save_round(&round)?;
        }
        let mut index = self.load_investment_index(account_id)?;
        index.retire(&redemption.rounds);
        self.put_record(&keys::investment_index_key(account_id), &index)?;

        info!(
            account_id = %account_id,
            rack_id = %rack_id,
            principal = redemption.principal,
            profit = redemption.profit,
            rounds = redemption.rounds.len(),
            "Redemption paid"
        );
        Ok(redemption)
    }

    fn redeemable(&mut self, account_id: &str, rack_id: &str) -> Result<Redemption, LedgerError> {
        let index = self.load_investment_index(account_id)?;
        let mut redemption = Redemption::default();

        for key in index.keys_for_rack(rack_id) {
            let Some(round) = self.load_round(&key.rack_id, &key.round_id)? else {
                continue;
            };
            if round.stage == RoundStage::Open || round.is_redeemed_by(account_id) {
                continue;
            }
            let position = round.user_amount.get(account_id).copied().unwrap_or(0);
            let renewed = round.user_renewal.get(account_id).copied().unwrap_or(0);
            redemption.principal = redemption
                .principal
                .checked_add(position.saturating_sub(renewed).max(0))
                .ok_or(LedgerError::Overflow("redeemable principal"))?;
            redemption.profit = redemption
                .profit
                .checked_add(round.user_profit.get(account_id).copied().unwrap_or(0))
                .ok_or(LedgerError::Overflow("redeemable profit"))?;
            redemption.rounds.push(key.clone());
        }
        Ok(redemption)
    }

    fn remaining_capacity(&mut self, rack_id: &str) -> Result<Amount, LedgerError> {
        let history = self.load_history()?;
        let current = match &history.current_round_id {
            Some(round_id) => self.load_round(rack_id, round_id)?,
            None => None,
        };
        let (capacity, invested) = match current {
            Some(round) if round.stage != RoundStage::Open => return Ok(0),
            Some(round) => (round.finance_config.capacity, round.amount_invested),
            None => (self.rack_config(rack_id)?.capacity, 0),
        };
        if let Some(round_id) = &history.current_round_id {
            if self.is_closed_round_id(round_id)? {
                return Ok(0);
            }
        }
        let carryover = self.carryover(rack_id)?;
        Ok(capacity
            .saturating_sub(invested)
            .saturating_sub(carryover)
            .max(0))
    }

    fn profit_to_date(&mut self, account_id: &str) -> Result<Amount, LedgerError> {
        let index = self.load_investment_index(account_id)?;
        let mut total: Amount = 0;
        for key in index.active_round_keys.iter().chain(&index.redeemed_round_ids) {
            if let Some(round) = self.load_round(&key.rack_id, &key.round_id)? {
                total = total
                    .checked_add(round.user_profit.get(account_id).copied().unwrap_or(0))
                    .ok_or(LedgerError::Overflow("profit to date"))?;
            }
        }
        Ok(total)
    }

    fn round(&mut self, rack_id: &str, round_id: &str) -> Result<FinancingRound, LedgerError> {
        self.load_round(rack_id, round_id)?
            .ok_or_else(|| {
                LedgerError::not_found("financing round", RoundKey::new(rack_id, round_id).to_string())
            })
    }

    fn investment_index(&mut self, account_id: &str) -> Result<AccountInvestmentIndex, LedgerError> {
        self.load_investment_index(account_id)
    }
}
