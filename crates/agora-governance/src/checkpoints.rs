//! Append-only value history keyed by block number.
//!
//! Entries are never rewritten. Several entries may share a block; a lookup
//! returns the last entry recorded at or before the queried block.

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// A value in force from `block` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: u64,
    pub value: u64,
}

/// History of a single subject (one delegate, or the total supply).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoints {
    history: Vec<Checkpoint>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest recorded value, zero if empty.
    pub fn latest(&self) -> u64 {
        self.history.last().map(|c| c.value).unwrap_or(0)
    }

    /// Value in force at `block`: the last entry with `entry.block <= block`.
    pub fn upper_lookup(&self, block: u64) -> u64 {
        let idx = self.history.partition_point(|c| c.block <= block);
        if idx == 0 {
            0
        } else {
            self.history[idx - 1].value
        }
    }

    /// Append `value` at `block`. Returns (previous, new).
    ///
    /// # Errors
    /// Returns an error if `block` is older than the last entry.
    pub fn push(&mut self, block: u64, value: u64) -> Result<(u64, u64), GovernanceError> {
        if let Some(last) = self.history.last() {
            if block < last.block {
                return Err(GovernanceError::InvalidInput(format!(
                    "checkpoint at block {} is older than latest block {}",
                    block, last.block
                )));
            }
        }
        let previous = self.latest();
        self.history.push(Checkpoint { block, value });
        Ok((previous, value))
    }

    /// Apply `op` to the latest value and append the result at `block`.
    pub fn update(
        &mut self,
        block: u64,
        op: impl FnOnce(u64) -> Option<u64>,
    ) -> Result<(u64, u64), GovernanceError> {
        let next = op(self.latest()).ok_or_else(|| {
            GovernanceError::InvalidState(format!(
                "checkpoint arithmetic out of range at block {}",
                block
            ))
        })?;
        self.push(block, next)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.history
    }
}
