//! Allocation engine.

use rl_01_world_state::WorldState;
use shared_types::{validate_identifier, AccountId, Amount};
use std::collections::BTreeMap;
use tracing::info;

use super::session::Session;
use crate::domain::entities::{AllocationRecord, RoleRates};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::check_allocation;
use crate::domain::keys;
use crate::domain::split::{parse_beneficiaries, split_by_weights, split_to_accounts};
use crate::domain::value_objects::{
    AllocationOrder, AllocationScope, Page, RangeQuery, ScanOrder, ScopeRef, TransferOrder,
};
use crate::ports::inbound::{AccountStore, AllocationEngine, Sequencer, TransactionLog, TransferEngine};

/// Role -> account -> amount for `total` under `rates`.
///
/// Roles repeated in `rates` accumulate into the same entry.
pub fn split_allocation(
    total: Amount,
    rates: &RoleRates,
    accounts_by_role: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, BTreeMap<AccountId, Amount>>, LedgerError> {
    let shares = split_by_weights(total, &rates.weights())?;
    let mut split: BTreeMap<String, BTreeMap<AccountId, Amount>> = BTreeMap::new();

    for (rate, share) in rates.rates.iter().zip(shares) {
        let spec = accounts_by_role.get(&rate.role).ok_or_else(|| {
            LedgerError::invalid(format!("no beneficiary for role '{}'", rate.role))
        })?;
        let beneficiaries = parse_beneficiaries(spec)?;
        let role_entry = split.entry(rate.role.clone()).or_default();
        for (account, amount) in split_to_accounts(share, &beneficiaries)? {
            *role_entry.entry(account).or_insert(0) += amount;
        }
    }
    Ok(split)
}

impl<S: WorldState> AllocationEngine for Session<'_, S> {
    fn allocate(&mut self, order: &AllocationOrder) -> Result<AllocationRecord, LedgerError> {
        validate_identifier("rack id", &order.rack_id)?;
        validate_identifier("allocation key", &order.allocation_key)?;
        if order.total_amount < 0 {
            return Err(LedgerError::invalid(format!(
                "allocation total must be non-negative, got {}",
                order.total_amount
            )));
        }
        let rates = RoleRates::parse(&order.role_rates)?;

        let mut accounts_by_role = BTreeMap::new();
        for (role, spec) in &order.accounts_by_role {
            if accounts_by_role.insert(role.clone(), spec.clone()).is_some() {
                return Err(LedgerError::invalid(format!(
                    "role '{}' has more than one beneficiary spec",
                    role
                )));
            }
        }
        let split = split_allocation(order.total_amount, &rates, &accounts_by_role)?;

        let scope = keys::rack_allocation_scope(&order.rack_id);
        let record = AllocationRecord {
            rack_id: order.rack_id.clone(),
            allocation_key: order.allocation_key.clone(),
            total_amount: order.total_amount,
            amount_by_role_by_account: split,
            roles_rate_percentages: rates.rates,
            global_serial: self.current_seq(&scope)? + 1,
            time: self.time(),
            tx_id: self.context().tx_id.clone(),
            payer: order.payer.clone(),
        };
        check_allocation(&record)?;

        let payouts: Vec<(AccountId, Amount)> = record
            .amount_by_account()
            .into_iter()
            .map(|(account, amount)| (account.to_string(), amount))
            .collect();
        for (account, _) in &payouts {
            self.get_account(account)?;
        }
        if let Some(payer) = &order.payer {
            for (account, amount) in &payouts {
                let transfer = TransferOrder::new(payer.clone(), account.clone(), *amount)
                    .with_type("allocation")
                    .with_description(order.allocation_key.clone());
                self.transfer(&transfer)?;
            }
        }

        let index_scopes: Vec<String> = record
            .beneficiaries()
            .into_iter()
            .map(keys::account_allocation_scope)
            .collect();
        let seq = self.append(&scope, &record, &index_scopes)?;

        info!(
            rack_id = %order.rack_id,
            allocation_key = %order.allocation_key,
            total = order.total_amount,
            beneficiaries = index_scopes.len(),
            seq,
            "Allocation recorded"
        );
        Ok(record)
    }

    fn allocation_history(
        &mut self,
        scope: &AllocationScope,
        query: &RangeQuery,
    ) -> Result<Page<AllocationRecord>, LedgerError> {
        self.range_query(&ScopeRef::from(scope), query)
    }

    fn find_allocation(
        &mut self,
        rack_id: &str,
        allocation_key: &str,
        order: ScanOrder,
    ) -> Result<Option<AllocationRecord>, LedgerError> {
        let prefix = keys::log_scope_prefix(&keys::rack_allocation_scope(rack_id));
        let records = self.scan_records::<AllocationRecord>(&prefix)?;
        let matches = |(_, record): &(String, AllocationRecord)| record.allocation_key == allocation_key;
        let found = match order {
            ScanOrder::Ascending => records.into_iter().find(matches),
            ScanOrder::Descending => records.into_iter().rev().find(matches),
        };
        Ok(found.map(|(_, record)| record))
    }
}
