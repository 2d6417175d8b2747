//! Supply issuance.
//!
//! The pool account starts with the whole supply. `issue` is the only
//! operation that debits it; its entries go to the issuance log, not the
//! global transaction log, and carry no global serial.

use rl_01_world_state::WorldState;
use shared_types::{validate_identifier, Amount};
use tracing::info;

use super::session::Session;
use crate::domain::entities::{Account, AccountKind, EntryFlag, LedgerEntry, TransLevel};
use crate::domain::errors::LedgerError;
use crate::domain::keys;
use crate::ports::inbound::{AccountStore, IssuanceEngine, TransactionLog};

impl<S: WorldState> IssuanceEngine for Session<'_, S> {
    fn init_issuance_pool(&mut self, total_supply: Amount) -> Result<Account, LedgerError> {
        if total_supply < 0 {
            return Err(LedgerError::invalid(format!(
                "total supply must be non-negative, got {}",
                total_supply
            )));
        }
        let pool_id = self.config().issuance_pool_id.clone();
        if self.account_exists(&pool_id)? {
            return Err(LedgerError::AlreadyExists {
                entity: "issuance pool",
                id: pool_id,
            });
        }

        let mut pool = Account::new(&pool_id, AccountKind::System, "system", self.time());
        pool.total_issued = total_supply;
        pool.rest_balance = total_supply;
        self.put_account(&pool)?;

        info!(pool_id = %pool_id, total_supply, "Issuance pool initialised");
        Ok(pool)
    }

    fn issue(&mut self, to_id: &str, amount: Amount, description: &str) -> Result<u64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::invalid(format!(
                "issued amount must be positive, got {}",
                amount
            )));
        }
        validate_identifier("account id", to_id)?;
        if self.is_issuance_pool(to_id) {
            return Err(LedgerError::invalid("cannot issue to the issuance pool"));
        }

        let pool_id = self.config().issuance_pool_id.clone();
        let mut pool = self.get_account(&pool_id)?;
        if pool.rest_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: pool_id,
                required: amount,
                available: pool.rest_balance,
            });
        }
        let mut recipient = self.get_account(to_id)?;

        pool.rest_balance -= amount;
        recipient.rest_balance = recipient
            .rest_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("issued balance"))?;
        recipient.total_issued = recipient
            .total_issued
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("issued total"))?;
        self.put_account(&pool)?;
        self.put_account(&recipient)?;

        let entry = LedgerEntry {
            from_id: to_id.to_string(),
            to_id: pool_id,
            flag: EntryFlag::Credit,
            amount,
            trans_type: "issue".to_string(),
            description: description.to_string(),
            tx_id: self.context().tx_id.clone(),
            time: self.time(),
            global_serial: 0,
            trans_level: if self.is_central(to_id) {
                TransLevel::Restricted
            } else {
                TransLevel::Ordinary
            },
        };
        let seq = self.append(
            keys::ISSUANCE_SCOPE,
            &entry,
            &[keys::account_tx_scope(to_id)],
        )?;

        info!(to = %to_id, amount, issuance_seq = seq, "Supply issued");
        Ok(seq)
    }

    fn issued_supply(&mut self) -> Result<Amount, LedgerError> {
        let pool_id = self.config().issuance_pool_id.clone();
        Ok(self
            .find_account(&pool_id)?
            .map(|pool| pool.total_issued - pool.rest_balance)
            .unwrap_or(0))
    }
}
