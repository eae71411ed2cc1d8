//! Timelock controller.
//!
//! Operations are scheduled by proposers, become ready once their timestamp
//! passes, and are executed at most once by executors. Execution is split in
//! two: `claim_execution` validates and marks the operation Done, then the
//! chain substrate performs the calls with the controller as caller. A
//! re-entrant execute of the same id therefore observes Done and fails.

use std::collections::HashMap;

use agora_types::{Address, Hash, HashBuilder};
use serde::{Deserialize, Serialize};

use crate::access::{AccessControl, Role};
use crate::error::GovernanceError;

/// Lifecycle of a timelock operation, derived from storage and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    /// Never scheduled, or cancelled
    Unset,
    /// Scheduled, waiting for its timestamp
    Pending,
    /// Scheduled and executable
    Ready,
    /// Executed
    Done,
}

/// A scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Earliest timestamp at which the operation may run
    pub ready_at: u64,
    pub done: bool,
}

/// Role-gated delayed executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelockController {
    /// Own address, for the self-call guard
    address: Address,
    min_delay: u64,
    roles: AccessControl,
    operations: HashMap<Hash, Operation>,
}

impl TimelockController {
    /// Create a controller.
    ///
    /// The controller itself and `admin` (if any) hold `Admin`. Each proposer
    /// also becomes a canceller.
    pub fn new(
        address: Address,
        min_delay: u64,
        proposers: &[Address],
        executors: &[Address],
        admin: Option<Address>,
    ) -> Self {
        let mut roles = AccessControl::new();
        for role in [Role::Admin, Role::Proposer, Role::Executor, Role::Canceller] {
            roles.set_role_admin(role, Role::Admin);
        }
        roles.setup_role(Role::Admin, address);
        if let Some(admin) = admin {
            roles.setup_role(Role::Admin, admin);
        }
        for proposer in proposers {
            roles.setup_role(Role::Proposer, *proposer);
            roles.setup_role(Role::Canceller, *proposer);
        }
        for executor in executors {
            roles.setup_role(Role::Executor, *executor);
        }

        Self {
            address,
            min_delay,
            roles,
            operations: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn get_min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn roles(&self) -> &AccessControl {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut AccessControl {
        &mut self.roles
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles.has_role(role, account)
    }

    /// Id of a single-call operation.
    pub fn hash_operation(
        target: &Address,
        value: u128,
        data: &[u8],
        predecessor: &Hash,
        salt: &Hash,
    ) -> Hash {
        HashBuilder::new("agora.timelock.operation")
            .address(target)
            .u128(value)
            .bytes(data)
            .hash(predecessor)
            .hash(salt)
            .finish()
    }

    /// Id of a batched operation.
    pub fn hash_operation_batch(
        targets: &[Address],
        values: &[u128],
        payloads: &[Vec<u8>],
        predecessor: &Hash,
        salt: &Hash,
    ) -> Hash {
        HashBuilder::new("agora.timelock.operation-batch")
            .addresses(targets)
            .u128s(values)
            .byte_strings(payloads)
            .hash(predecessor)
            .hash(salt)
            .finish()
    }

    pub fn operation(&self, id: &Hash) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn operation_state(&self, id: &Hash, now: u64) -> OperationState {
        match self.operations.get(id) {
            None => OperationState::Unset,
            Some(op) if op.done => OperationState::Done,
            Some(op) if now >= op.ready_at => OperationState::Ready,
            Some(_) => OperationState::Pending,
        }
    }

    pub fn is_operation(&self, id: &Hash) -> bool {
        self.operations.contains_key(id)
    }

    /// Scheduled and not yet executed, whether or not it is ready.
    pub fn is_operation_pending(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| !op.done).unwrap_or(false)
    }

    pub fn is_operation_ready(&self, id: &Hash, now: u64) -> bool {
        self.operation_state(id, now) == OperationState::Ready
    }

    pub fn is_operation_done(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| op.done).unwrap_or(false)
    }

    /// Ready timestamp of a scheduled operation.
    pub fn get_timestamp(&self, id: &Hash) -> Option<u64> {
        self.operations.get(id).map(|op| op.ready_at)
    }

    /// Schedule a single call. Returns the operation id.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &mut self,
        caller: &Address,
        target: &Address,
        value: u128,
        data: &[u8],
        predecessor: &Hash,
        salt: &Hash,
        delay: u64,
        now: u64,
    ) -> Result<Hash, GovernanceError> {
        self.roles.check_role(Role::Proposer, caller)?;
        let id = Self::hash_operation(target, value, data, predecessor, salt);
        self.insert_operation(id, delay, now)?;
        Ok(id)
    }

    /// Schedule a batch of calls executed together. Returns the operation id.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_batch(
        &mut self,
        caller: &Address,
        targets: &[Address],
        values: &[u128],
        payloads: &[Vec<u8>],
        predecessor: &Hash,
        salt: &Hash,
        delay: u64,
        now: u64,
    ) -> Result<Hash, GovernanceError> {
        self.roles.check_role(Role::Proposer, caller)?;
        check_batch_lengths(targets, values, payloads)?;
        let id = Self::hash_operation_batch(targets, values, payloads, predecessor, salt);
        self.insert_operation(id, delay, now)?;
        Ok(id)
    }

    fn insert_operation(&mut self, id: Hash, delay: u64, now: u64) -> Result<(), GovernanceError> {
        if self.operations.contains_key(&id) {
            return Err(GovernanceError::OperationExists(id));
        }
        if delay < self.min_delay {
            return Err(GovernanceError::InvalidInput(format!(
                "delay {} is below minimum delay {}",
                delay, self.min_delay
            )));
        }
        let ready_at = now.checked_add(delay).ok_or_else(|| {
            GovernanceError::InvalidInput(format!("delay {} overflows the clock", delay))
        })?;

        self.operations.insert(id, Operation { ready_at, done: false });
        tracing::info!("Scheduled operation {} ready at {}", id, ready_at);
        Ok(())
    }

    /// Validate an execution of `id` and mark it Done.
    ///
    /// Must run before any of the operation's calls are performed.
    ///
    /// # Errors
    /// - caller lacks `Executor` and execution is not open
    /// - the operation is not Ready
    /// - `predecessor` is non-zero and not Done
    pub fn claim_execution(
        &mut self,
        caller: &Address,
        id: &Hash,
        predecessor: &Hash,
        now: u64,
    ) -> Result<(), GovernanceError> {
        self.roles.check_role_or_open(Role::Executor, caller)?;

        let state = self.operation_state(id, now);
        if state != OperationState::Ready {
            return Err(GovernanceError::UnexpectedOperationState {
                id: *id,
                actual: state,
                expected: "Ready",
            });
        }
        if !predecessor.is_zero() && !self.is_operation_done(predecessor) {
            return Err(GovernanceError::UnexpectedOperationState {
                id: *predecessor,
                actual: self.operation_state(predecessor, now),
                expected: "Done (predecessor)",
            });
        }

        if let Some(op) = self.operations.get_mut(id) {
            op.done = true;
        }
        tracing::info!("Executing operation {}", id);
        Ok(())
    }

    /// Remove a scheduled operation that has not run yet.
    pub fn cancel(&mut self, caller: &Address, id: &Hash, now: u64) -> Result<(), GovernanceError> {
        self.roles.check_role(Role::Canceller, caller)?;
        if !self.is_operation_pending(id) {
            return Err(GovernanceError::UnexpectedOperationState {
                id: *id,
                actual: self.operation_state(id, now),
                expected: "Pending or Ready",
            });
        }
        self.operations.remove(id);
        tracing::info!("Cancelled operation {}", id);
        Ok(())
    }

    /// Change the minimum delay. Only the controller itself may call this,
    /// which means the change has to pass through its own schedule/execute.
    ///
    /// Returns the previous delay.
    pub fn update_delay(&mut self, caller: &Address, new_delay: u64) -> Result<u64, GovernanceError> {
        if caller != &self.address {
            return Err(GovernanceError::Unauthorized(format!(
                "caller {} must be the timelock {}",
                caller, self.address
            )));
        }
        let old = self.min_delay;
        self.min_delay = new_delay;
        tracing::info!("Timelock min delay changed from {} to {}", old, new_delay);
        Ok(old)
    }
}

pub(crate) fn check_batch_lengths(
    targets: &[Address],
    values: &[u128],
    payloads: &[Vec<u8>],
) -> Result<(), GovernanceError> {
    if targets.len() != values.len() || targets.len() != payloads.len() {
        return Err(GovernanceError::InvalidInput(format!(
            "batch length mismatch: {} targets, {} values, {} payloads",
            targets.len(),
            values.len(),
            payloads.len()
        )));
    }
    Ok(())
}
