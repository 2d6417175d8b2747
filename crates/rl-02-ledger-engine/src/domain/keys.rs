//! World-state key layout.
//!
//! Every record kind owns a distinct prefix ending in `~`. Identifiers are
//! validated to never contain `~` or `|`, so no key of one kind can be a
//! prefix of a key of another kind. Sequence numbers are zero-padded so
//! lexicographic order equals numeric order.

pub const ACCOUNT_PREFIX: &str = "ACCT~";
pub const SEQUENCE_PREFIX: &str = "SEQ~";
pub const LOG_PREFIX: &str = "LOG~";
pub const INDEX_PREFIX: &str = "IDX~";
pub const LOCK_PREFIX: &str = "LOCK~";
pub const FINANCE_CONFIG_PREFIX: &str = "FCFG~";
pub const ROLE_RATES_PREFIX: &str = "RRATE~";
pub const ROUND_PREFIX: &str = "ROUND~";
pub const ROUND_RACKS_PREFIX: &str = "RRACKS~";
pub const FINANCING_HISTORY_KEY: &str = "FHIST~";
pub const LAST_CLOSED_ROUND_KEY: &str = "FMARK~";
pub const INVESTMENT_INDEX_PREFIX: &str = "INVIDX~";

/// Global transaction log.
pub const GLOBAL_TX_SCOPE: &str = "TX";
/// Issuance log.
pub const ISSUANCE_SCOPE: &str = "ISSUE";
/// Account-name index; its counter is the account count.
pub const ACCOUNTS_SCOPE: &str = "ACCOUNTS";

/// Per-account transaction index.
pub fn account_tx_scope(account_id: &str) -> String {
    format!("TX|{}", account_id)
}

/// Per-rack allocation log.
pub fn rack_allocation_scope(rack_id: &str) -> String {
    format!("ALLOC|{}", rack_id)
}

/// Per-account allocation index.
pub fn account_allocation_scope(account_id: &str) -> String {
    format!("ALLOCA|{}", account_id)
}

pub fn account_key(account_id: &str) -> String {
    format!("{}{}", ACCOUNT_PREFIX, account_id)
}

pub fn sequence_key(scope: &str) -> String {
    format!("{}{}", SEQUENCE_PREFIX, scope)
}

pub fn log_key(scope: &str, seq: u64) -> String {
    format!("{}{}~{:020}", LOG_PREFIX, scope, seq)
}

/// Prefix shared by every record of a log scope.
pub fn log_scope_prefix(scope: &str) -> String {
    format!("{}{}~", LOG_PREFIX, scope)
}

pub fn index_key(scope: &str, seq: u64) -> String {
    format!("{}{}~{:020}", INDEX_PREFIX, scope, seq)
}

pub fn lock_key(account_id: &str) -> String {
    format!("{}{}", LOCK_PREFIX, account_id)
}

pub fn finance_config_key(rack_id: &str) -> String {
    format!("{}{}", FINANCE_CONFIG_PREFIX, rack_id)
}

pub fn role_rates_key(rack_id: &str) -> String {
    format!("{}{}", ROLE_RATES_PREFIX, rack_id)
}

pub fn round_key(rack_id: &str, round_id: &str) -> String {
    format!("{}{}~{}", ROUND_PREFIX, rack_id, round_id)
}

/// Racks holding a round under `round_id`.
pub fn round_racks_key(round_id: &str) -> String {
    format!("{}{}", ROUND_RACKS_PREFIX, round_id)
}

pub fn investment_index_key(account_id: &str) -> String {
    format!("{}{}", INVESTMENT_INDEX_PREFIX, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keys_sort_numerically() {
        assert!(log_key(GLOBAL_TX_SCOPE, 9) < log_key(GLOBAL_TX_SCOPE, 10));
        assert_eq!(log_key("TX", 1), "LOG~TX~00000000000000000001");
    }

    #[test]
    fn test_global_and_account_scopes_do_not_overlap() {
        let global = log_scope_prefix(GLOBAL_TX_SCOPE);
        let account = log_key(&account_tx_scope("alice"), 1);
        assert!(!account.starts_with(&global));
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let prefixes = [
            ACCOUNT_PREFIX,
            SEQUENCE_PREFIX,
            LOG_PREFIX,
            INDEX_PREFIX,
            LOCK_PREFIX,
            FINANCE_CONFIG_PREFIX,
            ROLE_RATES_PREFIX,
            ROUND_PREFIX,
            ROUND_RACKS_PREFIX,
            FINANCING_HISTORY_KEY,
            LAST_CLOSED_ROUND_KEY,
            INVESTMENT_INDEX_PREFIX,
        ];
        for (i, a) in prefixes.iter().enumerate() {
            for (j, b) in prefixes.iter().enumerate() {
                if i != j {
                    assert!(!a.starts_with(b), "{} collides with {}", a, b);
                }
            }
        }
    }
}
