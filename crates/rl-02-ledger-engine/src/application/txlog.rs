//! Append-only logs and paginated range queries.
//!
//! A log scope stores records at `LOG~{scope}~{seq}`. An index scope stores
//! [`LogPointer`]s at `IDX~{scope}~{seq}`, so per-account history is read
//! without scanning the global log.

use rl_01_world_state::WorldState;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::session::Session;
use crate::domain::entities::{LogPointer, Timestamped};
use crate::domain::errors::LedgerError;
use crate::domain::keys;
use crate::domain::value_objects::{Page, PagedRecord, RangeQuery, ScanOrder, ScopeRef};
use crate::ports::inbound::{Sequencer, TransactionLog};

impl<S: WorldState> Session<'_, S> {
    fn load_scoped<T: DeserializeOwned>(
        &mut self,
        scope: &ScopeRef,
        seq: u64,
    ) -> Result<Option<T>, LedgerError> {
        if !scope.indexed {
            return self.get_record(&keys::log_key(&scope.scope, seq));
        }
        match self.get_record::<LogPointer>(&keys::index_key(&scope.scope, seq))? {
            Some(pointer) => self.get_record(&pointer.target_key),
            None => Ok(None),
        }
    }

    /// Negative counts read to the end; explicit counts are capped.
    fn page_limit(&self, count: i64) -> usize {
        match usize::try_from(count) {
            Ok(count) => count.min(self.config().max_page_size),
            Err(_) => usize::MAX,
        }
    }
}

impl<S: WorldState> TransactionLog for Session<'_, S> {
    fn append<T: Serialize>(
        &mut self,
        scope: &str,
        record: &T,
        index_scopes: &[String],
    ) -> Result<u64, LedgerError> {
        let seq = self.next_seq(scope)?;
        let target_key = keys::log_key(scope, seq);
        self.put_record(&target_key, record)?;

        for index_scope in index_scopes {
            let index_seq = self.next_seq(index_scope)?;
            let pointer = LogPointer {
                target_key: target_key.clone(),
                target_seq: seq,
            };
            self.put_record(&keys::index_key(index_scope, index_seq), &pointer)?;
        }
        Ok(seq)
    }

    fn range_query<T: DeserializeOwned + Timestamped>(
        &mut self,
        scope: &ScopeRef,
        query: &RangeQuery,
    ) -> Result<Page<T>, LedgerError> {
        let max_seq = match query.pinned_max_seq {
            Some(pinned) => pinned,
            None => self.current_seq(&scope.scope)?,
        };
        let limit = self.page_limit(query.count);
        let mut serial = u64::try_from(query.begin_seq.max(1)).unwrap_or(1);
        let mut items = Vec::new();

        while serial <= max_seq && items.len() < limit {
            let source_seq = match query.order {
                ScanOrder::Ascending => serial,
                ScanOrder::Descending => max_seq - serial + 1,
            };
            if let Some(record) = self.load_scoped::<T>(scope, source_seq)? {
                if query.accepts_time(record.timestamp()) {
                    items.push(PagedRecord {
                        serial,
                        source_seq,
                        record,
                    });
                }
            }
            serial += 1;
        }

        Ok(Page {
            items,
            next_seq: serial,
            max_seq,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{ctx, engine};
    use crate::domain::entities::LedgerEntry;
    use crate::domain::value_objects::LogScope;

    fn entry(amount: i64, time: i64) -> LedgerEntry {
        LedgerEntry {
            from_id: "alice".into(),
            to_id: "bob".into(),
            amount,
            time,
            ..Default::default()
        }
    }

    fn seed(count: i64) -> crate::LedgerEngine<rl_01_world_state::InMemoryWorldState> {
        let mut engine = engine();
        engine
            .execute(&ctx(1), |s| {
                for i in 1..=count {
                    s.append("TX", &entry(i, i * 10), &["TX|alice".to_string()])?;
                }
                Ok(())
            })
            .unwrap();
        engine
    }

    fn amounts(page: &Page<LedgerEntry>) -> Vec<i64> {
        page.records().map(|e| e.amount).collect()
    }

    #[test]
    fn test_append_writes_record_and_pointer() {
        let mut engine = seed(2);
        let pointer = engine
            .execute(&ctx(2), |s| s.get_record::<LogPointer>(&keys::index_key("TX|alice", 2)))
            .unwrap()
            .unwrap();
        assert_eq!(pointer.target_seq, 2);
        assert_eq!(pointer.target_key, keys::log_key("TX", 2));
    }

    #[test]
    fn test_ascending_page() {
        let mut engine = seed(5);
        let page = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::ascending().starting_at(2).take(2))
            })
            .unwrap();
        assert_eq!(amounts(&page), vec![2, 3]);
        assert_eq!(page.next_seq, 4);
        assert_eq!(page.max_seq, 5);
    }

    #[test]
    fn test_begin_is_floored_to_one() {
        let mut engine = seed(3);
        let page = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::ascending().starting_at(-7))
            })
            .unwrap();
        assert_eq!(amounts(&page), vec![1, 2, 3]);
        assert!(page.is_exhausted());
    }

    #[test]
    fn test_descending_serials_count_from_newest() {
        let mut engine = seed(5);
        let page = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::descending().take(2))
            })
            .unwrap();
        assert_eq!(amounts(&page), vec![5, 4]);
        assert_eq!(page.items[0].serial, 1);
        assert_eq!(page.items[0].source_seq, 5);
    }

    #[test]
    fn test_time_window_filters_records() {
        let mut engine = seed(5);
        let page = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::ascending().between(20, 40))
            })
            .unwrap();
        assert_eq!(amounts(&page), vec![2, 3, 4]);
    }

    #[test]
    fn test_index_scope_follows_pointers() {
        let mut engine = seed(3);
        let page = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Account("alice".into()), &RangeQuery::ascending())
            })
            .unwrap();
        assert_eq!(amounts(&page), vec![1, 2, 3]);

        let empty = engine
            .execute(&ctx(3), |s| {
                s.tx_history(&LogScope::Account("carol".into()), &RangeQuery::ascending())
            })
            .unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.max_seq, 0);
    }

    #[test]
    fn test_page_size_caps_explicit_count_only() {
        let mut engine = crate::LedgerEngine::with_config(
            rl_01_world_state::InMemoryWorldState::new(),
            crate::EngineConfig {
                max_page_size: 2,
                ..Default::default()
            },
        );
        engine
            .execute(&ctx(1), |s| {
                for i in 1..=4 {
                    s.append("TX", &entry(i, i), &[])?;
                }
                Ok(())
            })
            .unwrap();

        let capped = engine
            .execute(&ctx(2), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::ascending().take(3))
            })
            .unwrap();
        assert_eq!(amounts(&capped), vec![1, 2]);
        assert_eq!(capped.next_seq, 3);

        let all = engine
            .execute(&ctx(3), |s| {
                s.tx_history(&LogScope::Global, &RangeQuery::ascending().take(-1))
            })
            .unwrap();
        assert_eq!(amounts(&all), vec![1, 2, 3, 4]);
        assert_eq!(all.max_seq, 4);
        assert_eq!(all.next_seq, 5);
    }
}
