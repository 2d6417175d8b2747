use std::collections::BTreeMap;
use std::ops::Bound;

use crate::domain::WorldStateError;
use crate::ports::{BatchOperation, WorldState};

/// In-memory world state.
///
/// Backed by a `BTreeMap` so range scans come back in key order, matching
/// what a production LSM store returns.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorldState {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Full copy of the keyspace, in key order.
    pub fn dump(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl WorldState for InMemoryWorldState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, WorldStateError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), WorldStateError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), WorldStateError> {
        self.data.remove(key);
        Ok(())
    }

    fn range_scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, WorldStateError> {
        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Ok(self
            .data
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn atomic_batch_write(
        &mut self,
        operations: Vec<BatchOperation>,
    ) -> Result<(), WorldStateError> {
        // Single-threaded map: applying in order is already all-or-nothing.
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
