//! Scoped monotonic counters.

use rl_01_world_state::WorldState;

use super::session::Session;
use crate::domain::errors::LedgerError;
use crate::domain::keys;
use crate::ports::inbound::Sequencer;

impl<S: WorldState> Sequencer for Session<'_, S> {
    fn next_seq(&mut self, scope: &str) -> Result<u64, LedgerError> {
        let next = self
            .current_seq(scope)?
            .checked_add(1)
            .ok_or(LedgerError::Overflow("sequence counter"))?;
        self.put_record(&keys::sequence_key(scope), &next)?;
        Ok(next)
    }

    fn current_seq(&mut self, scope: &str) -> Result<u64, LedgerError> {
        Ok(self
            .get_record::<u64>(&keys::sequence_key(scope))?
            .unwrap_or(0))
    }
}
