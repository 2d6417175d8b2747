//! Weighted split with remainder-to-last rounding.
//!
//! Every share except the last is `floor(total * w_i / Σw)`; the last takes
//! whatever is left, so shares always sum to exactly `total`.

use shared_types::{validate_identifier, AccountId, Amount};

use super::errors::LedgerError;

/// Split `total` across `weights`.
pub fn split_by_weights(total: Amount, weights: &[i64]) -> Result<Vec<Amount>, LedgerError> {
    if total < 0 {
        return Err(LedgerError::invalid(format!(
            "amount must be non-negative, got {}",
            total
        )));
    }
    if weights.is_empty() {
        return Err(LedgerError::invalid("no weights to split across"));
    }
    if weights.iter().any(|w| *w < 0) {
        return Err(LedgerError::invalid("weights must be non-negative"));
    }
    let base: i128 = weights.iter().map(|w| i128::from(*w)).sum();
    if base <= 0 {
        return Err(LedgerError::invalid("weights sum to zero"));
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut assigned: Amount = 0;
    for weight in &weights[..weights.len() - 1] {
        let share = i128::from(total) * i128::from(*weight) / base;
        // share <= total, so it always fits back into an Amount
        let share = Amount::try_from(share).map_err(|_| LedgerError::Overflow("split share"))?;
        assigned += share;
        shares.push(share);
    }
    shares.push(total - assigned);
    Ok(shares)
}

/// Parse a beneficiary spec.
///
/// Either a single account id (weight 1) or `account:weight;account:weight`.
pub fn parse_beneficiaries(spec: &str) -> Result<Vec<(AccountId, i64)>, LedgerError> {
    let spec = spec.trim();
    if !spec.contains(':') && !spec.contains(';') {
        validate_identifier("account id", spec)?;
        return Ok(vec![(spec.to_string(), 1)]);
    }

    let mut parsed = Vec::new();
    for part in spec.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (account, weight) = part.split_once(':').ok_or_else(|| {
            LedgerError::invalid(format!("beneficiary '{}' is not account:weight", part))
        })?;
        let account = account.trim();
        validate_identifier("account id", account)?;
        let weight: i64 = weight.trim().parse().map_err(|_| {
            LedgerError::invalid(format!("beneficiary '{}' has a non-integer weight", part))
        })?;
        parsed.push((account.to_string(), weight));
    }
    if parsed.is_empty() {
        return Err(LedgerError::invalid("beneficiary list is empty"));
    }
    Ok(parsed)
}

/// Split `total` across the parsed beneficiaries of one role.
pub fn split_to_accounts(
    total: Amount,
    beneficiaries: &[(AccountId, i64)],
) -> Result<Vec<(AccountId, Amount)>, LedgerError> {
    let weights: Vec<i64> = beneficiaries.iter().map(|(_, w)| *w).collect();
    let shares = split_by_weights(total, &weights)?;
    Ok(beneficiaries
        .iter()
        .map(|(account, _)| account.clone())
        .zip(shares)
        .collect())
}
