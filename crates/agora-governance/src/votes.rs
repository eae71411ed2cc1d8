//! Non-fungible voting token.
//!
//! Each token is one voting unit. Units only count as votes once their
//! holder delegates (possibly to itself); the delegate's power is kept as an
//! append-only checkpoint history so past snapshots never change.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use agora_types::Address;
use serde::{Deserialize, Serialize};

use crate::checkpoints::{Checkpoint, Checkpoints};
use crate::error::GovernanceError;

/// Historical voting power source consumed by the governor.
pub trait Votes {
    /// Power attributed to `account` at `block`.
    fn get_past_votes(&self, account: &Address, block: u64) -> u64;

    /// Number of units in existence at `block`.
    fn get_past_total_supply(&self, block: u64) -> u64;
}

/// A power movement between two delegates, as recorded in checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotesMoved {
    pub delegate: Address,
    pub previous: u64,
    pub new: u64,
}

/// Voting credential registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingToken {
    name: String,
    symbol: String,
    /// Only account allowed to mint
    minter: Address,
    /// token id -> owner
    owners: BTreeMap<u64, Address>,
    /// owner -> number of units held
    balances: HashMap<Address, u64>,
    /// token id -> approved spender
    token_approvals: HashMap<u64, Address>,
    /// owner -> operators approved for all of its units
    operator_approvals: HashMap<Address, BTreeSet<Address>>,
    /// holder -> delegate
    delegates: HashMap<Address, Address>,
    /// delegate -> power history
    delegate_checkpoints: HashMap<Address, Checkpoints>,
    total_checkpoints: Checkpoints,
    /// Latest block a tally has read; later writes land after it
    #[serde(default)]
    finalized: Option<u64>,
}

impl VotingToken {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, minter: Address) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            minter,
            owners: BTreeMap::new(),
            balances: HashMap::new(),
            token_approvals: HashMap::new(),
            operator_approvals: HashMap::new(),
            delegates: HashMap::new(),
            delegate_checkpoints: HashMap::new(),
            total_checkpoints: Checkpoints::new(),
            finalized: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Owner of `token_id`.
    pub fn owner_of(&self, token_id: u64) -> Result<Address, GovernanceError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or_else(|| GovernanceError::InvalidInput(format!("token {} does not exist", token_id)))
    }

    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Units held directly, whether or not they are delegated.
    pub fn get_voting_units(&self, account: &Address) -> u64 {
        self.balance_of(account)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_checkpoints.latest()
    }

    pub fn get_approved(&self, token_id: u64) -> Option<Address> {
        self.token_approvals.get(&token_id).copied()
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operator_approvals
            .get(owner)
            .map(|ops| ops.contains(operator))
            .unwrap_or(false)
    }

    /// Current delegate of `account`, if it has delegated.
    pub fn delegates(&self, account: &Address) -> Option<Address> {
        self.delegates.get(account).copied()
    }

    /// Current voting power of `account`.
    pub fn get_votes(&self, account: &Address) -> u64 {
        self.delegate_checkpoints
            .get(account)
            .map(Checkpoints::latest)
            .unwrap_or(0)
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.delegate_checkpoints
            .get(account)
            .map(Checkpoints::len)
            .unwrap_or(0)
    }

    pub fn checkpoints(&self, account: &Address) -> &[Checkpoint] {
        self.delegate_checkpoints
            .get(account)
            .map(Checkpoints::as_slice)
            .unwrap_or(&[])
    }

    /// Freeze the checkpoints of `block` and every earlier block.
    ///
    /// Power changes made afterwards in the same block are recorded at the
    /// next block, so a tally that read `block` can never be contradicted.
    pub fn finalize(&mut self, block: u64) {
        self.finalized = Some(self.finalized.map_or(block, |done| done.max(block)));
    }

    pub fn finalized_block(&self) -> Option<u64> {
        self.finalized
    }

    fn checkpoint_block(&self, block: u64) -> u64 {
        match self.finalized {
            Some(done) if block <= done => done.saturating_add(1),
            _ => block,
        }
    }

    /// Issue `token_id` to `to`. Only the minter may call this.
    pub fn mint(
        &mut self,
        caller: &Address,
        to: Address,
        token_id: u64,
        block: u64,
    ) -> Result<Vec<VotesMoved>, GovernanceError> {
        if caller != &self.minter {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the minter of {}",
                caller, self.symbol
            )));
        }
        if to.is_zero() {
            return Err(GovernanceError::InvalidInput("mint to the zero address".into()));
        }
        if self.owners.contains_key(&token_id) {
            return Err(GovernanceError::InvalidInput(format!(
                "token {} already minted",
                token_id
            )));
        }

        self.owners.insert(token_id, to);
        *self.balances.entry(to).or_insert(0) += 1;
        let block = self.checkpoint_block(block);
        self.total_checkpoints.update(block, |v| v.checked_add(1))?;

        let moved = self.move_delegate_votes(None, self.delegates(&to), 1, block)?;
        tracing::debug!("Minted {} #{} to {}", self.symbol, token_id, to);
        Ok(moved)
    }

    /// Move `token_id` from `from` to `to`.
    ///
    /// The caller must be the owner, the token's approved spender, or an
    /// operator approved for all of the owner's units.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: Address,
        to: Address,
        token_id: u64,
        block: u64,
    ) -> Result<Vec<VotesMoved>, GovernanceError> {
        let owner = self.owner_of(token_id)?;
        if !self.is_approved_or_owner(caller, owner, token_id) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not owner or approved for token {}",
                caller, token_id
            )));
        }
        if owner != from {
            return Err(GovernanceError::InvalidInput(format!(
                "token {} is owned by {}, not {}",
                token_id, owner, from
            )));
        }
        if to.is_zero() {
            return Err(GovernanceError::InvalidInput("transfer to the zero address".into()));
        }

        self.token_approvals.remove(&token_id);
        if let Some(balance) = self.balances.get_mut(&from) {
            *balance -= 1;
        }
        *self.balances.entry(to).or_insert(0) += 1;
        self.owners.insert(token_id, to);

        self.move_delegate_votes(self.delegates(&from), self.delegates(&to), 1, block)
    }

    /// Approve `to` to transfer `token_id`.
    pub fn approve(
        &mut self,
        caller: &Address,
        to: Address,
        token_id: u64,
    ) -> Result<Address, GovernanceError> {
        let owner = self.owner_of(token_id)?;
        if to == owner {
            return Err(GovernanceError::InvalidInput("approval to current owner".into()));
        }
        if caller != &owner && !self.is_approved_for_all(&owner, caller) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not owner or operator of token {}",
                caller, token_id
            )));
        }
        self.token_approvals.insert(token_id, to);
        Ok(owner)
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: &Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), GovernanceError> {
        if caller == &operator {
            return Err(GovernanceError::InvalidInput("approve to caller".into()));
        }
        let ops = self.operator_approvals.entry(*caller).or_default();
        if approved {
            ops.insert(operator);
        } else {
            ops.remove(&operator);
        }
        Ok(())
    }

    /// Point the caller's units at `delegatee`. The zero address undelegates.
    ///
    /// Returns the previous delegate and the checkpoint movements.
    pub fn delegate(
        &mut self,
        caller: &Address,
        delegatee: Address,
        block: u64,
    ) -> Result<(Option<Address>, Vec<VotesMoved>), GovernanceError> {
        let previous = self.delegates(caller);
        let next = if delegatee.is_zero() {
            self.delegates.remove(caller);
            None
        } else {
            self.delegates.insert(*caller, delegatee);
            Some(delegatee)
        };

        let units = self.balance_of(caller);
        let moved = self.move_delegate_votes(previous, next, units, block)?;
        Ok((previous, moved))
    }

    fn is_approved_or_owner(&self, spender: &Address, owner: Address, token_id: u64) -> bool {
        spender == &owner
            || self.get_approved(token_id).as_ref() == Some(spender)
            || self.is_approved_for_all(&owner, spender)
    }

    fn move_delegate_votes(
        &mut self,
        from: Option<Address>,
        to: Option<Address>,
        amount: u64,
        block: u64,
    ) -> Result<Vec<VotesMoved>, GovernanceError> {
        let mut moved = Vec::new();
        if from == to || amount == 0 {
            return Ok(moved);
        }
        let block = self.checkpoint_block(block);
        if let Some(delegate) = from {
            let (previous, new) = self
                .delegate_checkpoints
                .entry(delegate)
                .or_default()
                .update(block, |v| v.checked_sub(amount))?;
            moved.push(VotesMoved { delegate, previous, new });
        }
        if let Some(delegate) = to {
            let (previous, new) = self
                .delegate_checkpoints
                .entry(delegate)
                .or_default()
                .update(block, |v| v.checked_add(amount))?;
            moved.push(VotesMoved { delegate, previous, new });
        }
        Ok(moved)
    }
}

impl Votes for VotingToken {
    fn get_past_votes(&self, account: &Address, block: u64) -> u64 {
        self.delegate_checkpoints
            .get(account)
            .map(|history| history.upper_lookup(block))
            .unwrap_or(0)
    }

    fn get_past_total_supply(&self, block: u64) -> u64 {
        self.total_checkpoints.upper_lookup(block)
    }
}
