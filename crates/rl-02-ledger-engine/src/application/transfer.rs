//! Transfer engine.
//!
//! A transfer writes two global log entries: the payer's debit, then the
//! payee's credit. Both carry the debit's log position as `global_serial`.

use rl_01_world_state::WorldState;
use shared_types::validate_identifier;
use tracing::{debug, info};

use super::session::Session;
use crate::domain::entities::{EntryFlag, LedgerEntry, TransLevel};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::invariant_non_negative;
use crate::domain::keys;
use crate::domain::value_objects::{TransferOrder, TransferReceipt};
use crate::ports::inbound::{AccountStore, LockEngine, Sequencer, TransactionLog, TransferEngine};

impl<S: WorldState> Session<'_, S> {
    fn trans_level(&self, from_id: &str, to_id: &str) -> TransLevel {
        if self.is_central(from_id) || self.is_central(to_id) {
            TransLevel::Restricted
        } else {
            TransLevel::Ordinary
        }
    }

    /// Append the mirrored debit/credit pair.
    fn record_transfer(&mut self, order: &TransferOrder) -> Result<TransferReceipt, LedgerError> {
        let global_serial = self.current_seq(keys::GLOBAL_TX_SCOPE)? + 1;
        let debit = LedgerEntry {
            from_id: order.from_id.clone(),
            to_id: order.to_id.clone(),
            flag: EntryFlag::Debit,
            amount: order.amount,
            trans_type: order.trans_type.clone(),
            description: order.description.clone(),
            tx_id: self.context().tx_id.clone(),
            time: self.time(),
            global_serial,
            trans_level: self.trans_level(&order.from_id, &order.to_id),
        };
        let credit = LedgerEntry {
            from_id: order.to_id.clone(),
            to_id: order.from_id.clone(),
            flag: EntryFlag::Credit,
            ..debit.clone()
        };

        let debit_seq = self.append(
            keys::GLOBAL_TX_SCOPE,
            &debit,
            &[keys::account_tx_scope(&order.from_id)],
        )?;
        let credit_seq = self.append(
            keys::GLOBAL_TX_SCOPE,
            &credit,
            &[keys::account_tx_scope(&order.to_id)],
        )?;
        Ok(TransferReceipt {
            debit_seq,
            credit_seq,
        })
    }
}

impl<S: WorldState> TransferEngine for Session<'_, S> {
    fn transfer(&mut self, order: &TransferOrder) -> Result<Option<TransferReceipt>, LedgerError> {
        if order.amount < 0 {
            return Err(LedgerError::invalid(format!(
                "transfer amount must be non-negative, got {}",
                order.amount
            )));
        }
        validate_identifier("account id", &order.from_id)?;
        validate_identifier("account id", &order.to_id)?;
        if self.is_issuance_pool(&order.from_id) {
            return Err(LedgerError::invalid(
                "the issuance pool can only be debited by issuance",
            ));
        }

        let self_transfer = order.from_id == order.to_id;
        if order.amount == 0 || (self_transfer && !order.record_self_transfer) {
            debug!(from = %order.from_id, to = %order.to_id, amount = order.amount, "Transfer is a no-op");
            return Ok(None);
        }

        let mut from = self.get_account(&order.from_id)?;
        if self_transfer {
            let receipt = self.record_transfer(order)?;
            debug!(account_id = %from.id, amount = order.amount, "Self-transfer recorded");
            return Ok(Some(receipt));
        }
        let mut to = self.get_account(&order.to_id)?;

        let locked = self.locked_amount(&from.id, self.time())?.locked;
        let available = from.rest_balance.saturating_sub(locked);
        if available < order.amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.id,
                required: order.amount,
                available: available.max(0),
            });
        }

        from.rest_balance -= order.amount;
        if !invariant_non_negative(from.rest_balance) {
            return Err(LedgerError::InvariantViolation(format!(
                "debit left {} negative",
                from.id
            )));
        }
        to.rest_balance = to
            .rest_balance
            .checked_add(order.amount)
            .ok_or(LedgerError::Overflow("credit balance"))?;
        to.total_issued = to
            .total_issued
            .checked_add(order.amount)
            .ok_or(LedgerError::Overflow("credit total issued"))?;
        self.put_account(&from)?;
        self.put_account(&to)?;

        let receipt = self.record_transfer(order)?;
        info!(
            from = %order.from_id,
            to = %order.to_id,
            amount = order.amount,
            trans_type = %order.trans_type,
            global_serial = receipt.debit_seq,
            "Transfer recorded"
        );
        Ok(Some(receipt))
    }
}
