//! Lock engine.
//!
//! Expired entries are never pruned; they stop counting once
//! `lock_end_time <= time` and disappear only when the schedule is
//! overwritten.

use rl_01_world_state::WorldState;
use shared_types::Timestamp;
use tracing::info;

use super::session::Session;
use crate::domain::entities::{LockEntry, LockSchedule};
use crate::domain::errors::LedgerError;
use crate::domain::keys;
use crate::domain::value_objects::LockedBalance;
use crate::ports::inbound::{AccountStore, LockEngine};

impl<S: WorldState> LockEngine for Session<'_, S> {
    fn locked_amount(&mut self, account_id: &str, at: Timestamp) -> Result<LockedBalance, LedgerError> {
        let schedule: LockSchedule = self
            .get_record(&keys::lock_key(account_id))?
            .unwrap_or_default();
        Ok(LockedBalance {
            locked: schedule.locked_at(at),
            entries: schedule.entries,
        })
    }

    fn add_locks(
        &mut self,
        account_id: &str,
        entries: &[LockEntry],
        overwrite: bool,
    ) -> Result<LockSchedule, LedgerError> {
        if let Some(bad) = entries.iter().find(|e| e.lock_amount < 0) {
            return Err(LedgerError::invalid(format!(
                "lock amount must be non-negative, got {}",
                bad.lock_amount
            )));
        }
        self.get_account(account_id)?;

        let key = keys::lock_key(account_id);
        let mut schedule: LockSchedule = if overwrite {
            LockSchedule::default()
        } else {
            self.get_record(&key)?.unwrap_or_default()
        };
        schedule.entries.extend_from_slice(entries);
        self.put_record(&key, &schedule)?;

        info!(
            account_id = %account_id,
            added = entries.len(),
            overwrite,
            locked_now = schedule.locked_at(self.time()),
            "Lock schedule updated"
        );
        Ok(schedule)
    }
}

/// Parse `end:amount;end:amount`.
pub fn parse_lock_entries(text: &str) -> Result<Vec<LockEntry>, LedgerError> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (end, amount) = part.split_once(':').ok_or_else(|| {
                LedgerError::invalid(format!("lock entry '{}' is not end:amount", part))
            })?;
            let end: Timestamp = end
                .trim()
                .parse()
                .map_err(|_| LedgerError::invalid(format!("lock end time '{}' is not an integer", end)))?;
            let amount: i64 = amount
                .trim()
                .parse()
                .map_err(|_| LedgerError::invalid(format!("lock amount '{}' is not an integer", amount)))?;
            if amount < 0 {
                return Err(LedgerError::invalid(format!(
                    "lock amount must be non-negative, got {}",
                    amount
                )));
            }
            Ok(LockEntry::new(end, amount))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{ctx, engine_with_accounts};

    #[test]
    fn test_append_then_overwrite() {
        let mut engine = engine_with_accounts(&["alice"]);
        let t = ctx(2).time;
        engine
            .execute(&ctx(2), |s| {
                s.add_locks("alice", &[LockEntry::new(t + 10, 40)], false)?;
                s.add_locks("alice", &[LockEntry::new(t + 20, 5)], false)
            })
            .unwrap();

        let locked = engine.execute(&ctx(3), |s| s.locked_amount("alice", t + 5)).unwrap();
        assert_eq!(locked.locked, 45);
        assert_eq!(locked.entries.len(), 2);

        engine
            .execute(&ctx(4), |s| s.add_locks("alice", &[LockEntry::new(t + 30, 7)], true))
            .unwrap();
        let locked = engine.execute(&ctx(5), |s| s.locked_amount("alice", t + 5)).unwrap();
        assert_eq!(locked.locked, 7);
        assert_eq!(locked.entries.len(), 1);
    }

    #[test]
    fn test_expired_entries_remain_inert() {
        let mut engine = engine_with_accounts(&["alice"]);
        engine
            .execute(&ctx(2), |s| s.add_locks("alice", &[LockEntry::new(100, 40)], false))
            .unwrap();
        let locked = engine.execute(&ctx(3), |s| s.locked_amount("alice", 100)).unwrap();
        assert_eq!(locked.locked, 0);
        assert_eq!(locked.entries, vec![LockEntry::new(100, 40)]);
    }

    #[test]
    fn test_negative_lock_rejected() {
        let mut engine = engine_with_accounts(&["alice"]);
        let err = engine
            .execute(&ctx(2), |s| s.add_locks("alice", &[LockEntry::new(100, -1)], false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[test]
    fn test_unknown_account_rejected() {
        let mut engine = engine_with_accounts(&[]);
        let err = engine
            .execute(&ctx(2), |s| s.add_locks("ghost", &[LockEntry::new(100, 1)], false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[test]
    fn test_parse_lock_entries() {
        let entries = parse_lock_entries("1000:40; 2000:5").unwrap();
        assert_eq!(entries, vec![LockEntry::new(1000, 40), LockEntry::new(2000, 5)]);
        assert!(parse_lock_entries("").unwrap().is_empty());
        assert!(parse_lock_entries("1000").is_err());
        assert!(parse_lock_entries("x:1").is_err());
        assert!(parse_lock_entries("1000:-3").is_err());
    }
}
