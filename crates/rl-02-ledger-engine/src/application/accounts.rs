//! Account store.

use rl_01_world_state::WorldState;
use shared_types::validate_identifier;
use tracing::info;

use super::session::Session;
use crate::domain::entities::{Account, AccountIndexEntry, AccountKind};
use crate::domain::errors::LedgerError;
use crate::domain::keys;
use crate::domain::value_objects::{BalanceView, Page, RangeQuery, ScopeRef};
use crate::ports::inbound::{AccountStore, LockEngine, Sequencer, TransactionLog};

fn accounts_scope() -> ScopeRef {
    ScopeRef {
        scope: keys::ACCOUNTS_SCOPE.to_string(),
        indexed: false,
    }
}

impl<S: WorldState> AccountStore for Session<'_, S> {
    fn find_account(&mut self, id: &str) -> Result<Option<Account>, LedgerError> {
        self.get_record(&keys::account_key(id))
    }

    fn get_account(&mut self, id: &str) -> Result<Account, LedgerError> {
        self.find_account(id)?
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    fn put_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.put_record(&keys::account_key(&account.id), account)
    }

    fn account_exists(&mut self, id: &str) -> Result<bool, LedgerError> {
        Ok(self.find_account(id)?.is_some())
    }

    fn create_account(
        &mut self,
        id: &str,
        kind: AccountKind,
        owner: &str,
    ) -> Result<Account, LedgerError> {
        validate_identifier("account id", id)?;
        if self.account_exists(id)? {
            return Err(LedgerError::AlreadyExists {
                entity: "account",
                id: id.to_string(),
            });
        }

        let account = Account::new(id, kind, owner, self.time());
        self.put_account(&account)?;

        if kind != AccountKind::System {
            let entry = AccountIndexEntry {
                account_id: account.id.clone(),
                kind,
                creation_time: account.creation_time,
            };
            self.append(keys::ACCOUNTS_SCOPE, &entry, &[])?;
        }

        info!(account_id = %id, kind = %kind, owner = %owner, "Account created");
        Ok(account)
    }

    fn balance(&mut self, id: &str) -> Result<BalanceView, LedgerError> {
        let Some(account) = self.find_account(id)? else {
            return Ok(BalanceView {
                account_id: id.to_string(),
                ..Default::default()
            });
        };
        let locked = self.locked_amount(id, self.time())?.locked;
        Ok(BalanceView {
            account_id: account.id,
            rest_balance: account.rest_balance,
            total_issued: account.total_issued,
            locked,
            available: account.rest_balance.saturating_sub(locked).max(0),
        })
    }

    fn account_count(&mut self) -> Result<u64, LedgerError> {
        self.current_seq(keys::ACCOUNTS_SCOPE)
    }

    fn list_accounts(&mut self, query: &RangeQuery) -> Result<Page<AccountIndexEntry>, LedgerError> {
        self.range_query(&accounts_scope(), query)
    }

    fn authorize_user(&mut self, account_id: &str, user: &str) -> Result<Account, LedgerError> {
        validate_identifier("user", user)?;
        let mut account = self.get_account(account_id)?;
        if !account.is_authorized(user) {
            account.authorized_users.push(user.to_string());
            self.put_account(&account)?;
            info!(account_id = %account_id, user = %user, "User authorized");
        }
        Ok(account)
    }

    fn is_authorized(&mut self, account_id: &str, user: &str) -> Result<bool, LedgerError> {
        Ok(self
            .find_account(account_id)?
            .map(|account| account.is_authorized(user))
            .unwrap_or(false))
    }
}
