//! Proposal governor.
//!
//! A proposal's state is never stored. It is computed from the proposal's
//! fields, the current block, and (once queued) the timelock operation the
//! proposal was scheduled as.

use std::collections::{BTreeMap, HashMap};

use agora_types::{Address, Hash, HashBuilder};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::chain::BlockEnv;
use crate::checkpoints::Checkpoints;
use crate::error::GovernanceError;
use crate::timelock::{check_batch_lengths, OperationState, TimelockController};
use crate::votes::Votes;

/// Quorum numerators are percentages of the snapshotted total supply.
pub const QUORUM_DENOMINATOR: u64 = 100;

/// Proposal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

/// Ballot options.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl TryFrom<u8> for VoteSupport {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteSupport::Against),
            1 => Ok(VoteSupport::For),
            2 => Ok(VoteSupport::Abstain),
            other => Err(GovernanceError::InvalidInput(format!(
                "invalid vote type {}",
                other
            ))),
        }
    }
}

/// Tunable governor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorSettings {
    /// Blocks between proposal creation and the vote start
    pub voting_delay: u64,
    /// Blocks the vote stays open
    pub voting_period: u64,
    /// Votes required to propose
    pub proposal_threshold: u64,
    /// Percentage of total supply that must participate
    pub quorum_numerator: u64,
    /// Seconds after the eta before a queued proposal expires; `None` never expires
    pub queue_grace_period: Option<u64>,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            voting_delay: 1,
            voting_period: 100,
            proposal_threshold: 1,
            quorum_numerator: 4,
            queue_grace_period: None,
        }
    }
}

impl GovernorSettings {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period == 0 {
            return Err(GovernanceError::InvalidInput("voting period must be non-zero".into()));
        }
        if self.quorum_numerator > QUORUM_DENOMINATOR {
            return Err(GovernanceError::InvalidInput(format!(
                "quorum numerator {} exceeds {}",
                self.quorum_numerator, QUORUM_DENOMINATOR
            )));
        }
        Ok(())
    }
}

/// Timelock operation a proposal was queued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub operation_id: Hash,
    pub eta: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Hash,
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Vec<u8>>,
    pub description_hash: Hash,
    pub snapshot: u64,
    pub deadline: u64,
    pub against_votes: u64,
    pub for_votes: u64,
    pub abstain_votes: u64,
    /// voter -> ballot
    pub voters: BTreeMap<Address, VoteSupport>,
    pub canceled: bool,
    pub executed: bool,
    pub queued: Option<QueuedOperation>,
}

/// What the governor reads from its surroundings during a call.
#[derive(Clone, Copy)]
pub struct GovernorContext<'a> {
    pub env: BlockEnv,
    pub votes: &'a dyn Votes,
    pub timelock: &'a TimelockController,
}

/// Result of `queue`: the batch the governor must schedule in its timelock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRequest {
    pub proposal_id: Hash,
    pub operation_id: Hash,
    pub salt: Hash,
    pub delay: u64,
    pub eta: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Governor {
    name: String,
    address: Address,
    token: Address,
    /// Governance executor; the only caller allowed to change settings
    timelock: Address,
    settings: GovernorSettings,
    /// Quorum numerator in force for each snapshot block
    quorum_history: Checkpoints,
    proposals: HashMap<Hash, Proposal>,
}

impl Governor {
    pub fn new(
        name: impl Into<String>,
        address: Address,
        token: Address,
        timelock: Address,
        settings: GovernorSettings,
    ) -> Result<Self, GovernanceError> {
        settings.validate()?;
        let mut quorum_history = Checkpoints::new();
        quorum_history.push(0, settings.quorum_numerator)?;
        Ok(Self {
            name: name.into(),
            address,
            token,
            timelock,
            settings,
            quorum_history,
            proposals: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn timelock(&self) -> Address {
        self.timelock
    }

    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    pub fn voting_delay(&self) -> u64 {
        self.settings.voting_delay
    }

    pub fn voting_period(&self) -> u64 {
        self.settings.voting_period
    }

    pub fn proposal_threshold(&self) -> u64 {
        self.settings.proposal_threshold
    }

    pub fn quorum_numerator(&self) -> u64 {
        self.settings.quorum_numerator
    }

    /// Numerator that applies to proposals snapshotted at `block`.
    pub fn quorum_numerator_at(&self, block: u64) -> u64 {
        self.quorum_history.upper_lookup(block)
    }

    /// Votes needed for quorum at `block`.
    pub fn quorum(&self, votes: &dyn Votes, block: u64) -> u64 {
        let supply = votes.get_past_total_supply(block) as u128;
        let numerator = self.quorum_numerator_at(block) as u128;
        (supply * numerator / QUORUM_DENOMINATOR as u128) as u64
    }

    pub fn hash_description(description: &str) -> Hash {
        Hash::compute(description.as_bytes())
    }

    /// Proposal id: a content hash of the batch and the description hash.
    pub fn hash_proposal(
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: &Hash,
    ) -> Hash {
        HashBuilder::new("agora.governor.proposal")
            .addresses(targets)
            .u128s(values)
            .byte_strings(calldatas)
            .hash(description_hash)
            .finish()
    }

    /// Timelock salt for a proposal, unique per governor.
    pub fn timelock_salt(&self, description_hash: &Hash) -> Hash {
        HashBuilder::new("agora.governor.salt")
            .address(&self.address)
            .hash(description_hash)
            .finish()
    }

    pub fn proposal(&self, id: &Hash) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    fn get(&self, id: &Hash) -> Result<&Proposal, GovernanceError> {
        self.proposals.get(id).ok_or(GovernanceError::UnknownProposal(*id))
    }

    fn get_mut(&mut self, id: &Hash) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(id)
            .ok_or(GovernanceError::UnknownProposal(*id))
    }

    pub fn proposal_snapshot(&self, id: &Hash) -> Option<u64> {
        self.proposals.get(id).map(|p| p.snapshot)
    }

    pub fn proposal_deadline(&self, id: &Hash) -> Option<u64> {
        self.proposals.get(id).map(|p| p.deadline)
    }

    pub fn proposal_proposer(&self, id: &Hash) -> Option<Address> {
        self.proposals.get(id).map(|p| p.proposer)
    }

    /// (against, for, abstain)
    pub fn proposal_votes(&self, id: &Hash) -> Option<(u64, u64, u64)> {
        self.proposals
            .get(id)
            .map(|p| (p.against_votes, p.for_votes, p.abstain_votes))
    }

    pub fn proposal_eta(&self, id: &Hash) -> Option<u64> {
        self.proposals.get(id).and_then(|p| p.queued).map(|q| q.eta)
    }

    pub fn has_voted(&self, id: &Hash, account: &Address) -> bool {
        self.proposals
            .get(id)
            .map(|p| p.voters.contains_key(account))
            .unwrap_or(false)
    }

    pub fn state(&self, id: &Hash, ctx: &GovernorContext<'_>) -> Result<ProposalState, GovernanceError> {
        let proposal = self.get(id)?;

        if proposal.executed {
            return Ok(ProposalState::Executed);
        }
        if proposal.canceled {
            return Ok(ProposalState::Canceled);
        }

        let block = ctx.env.number;
        if block < proposal.snapshot {
            return Ok(ProposalState::Pending);
        }
        if block < proposal.deadline {
            return Ok(ProposalState::Active);
        }

        let quorum_reached = proposal.for_votes.saturating_add(proposal.abstain_votes)
            >= self.quorum(ctx.votes, proposal.snapshot);
        let vote_succeeded = proposal.for_votes > proposal.against_votes;
        if !quorum_reached || !vote_succeeded {
            return Ok(ProposalState::Defeated);
        }

        let queued = match proposal.queued {
            None => return Ok(ProposalState::Succeeded),
            Some(queued) => queued,
        };

        let now = ctx.env.timestamp;
        match ctx.timelock.operation_state(&queued.operation_id, now) {
            OperationState::Done => Ok(ProposalState::Executed),
            OperationState::Unset => Ok(ProposalState::Canceled),
            OperationState::Pending | OperationState::Ready => match self.settings.queue_grace_period {
                Some(grace) if now >= queued.eta.saturating_add(grace) => Ok(ProposalState::Expired),
                _ => Ok(ProposalState::Queued),
            },
        }
    }

    fn expect_state(
        &self,
        id: &Hash,
        expected: ProposalState,
        label: &'static str,
        ctx: &GovernorContext<'_>,
    ) -> Result<(), GovernanceError> {
        let actual = self.state(id, ctx)?;
        if actual != expected {
            return Err(GovernanceError::UnexpectedProposalState {
                id: *id,
                actual,
                expected: label,
            });
        }
        Ok(())
    }

    /// Create a proposal. Returns its id.
    ///
    /// # Errors
    /// - proposer's votes at the previous block are below the threshold
    /// - batch lengths differ or the batch is empty
    /// - an identical proposal already exists
    pub fn propose(
        &mut self,
        caller: &Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description: &str,
        ctx: &GovernorContext<'_>,
    ) -> Result<Hash, GovernanceError> {
        let block = ctx.env.number;
        let votes = ctx.votes.get_past_votes(caller, block.saturating_sub(1));
        if votes < self.settings.proposal_threshold {
            return Err(GovernanceError::BelowProposalThreshold {
                account: *caller,
                votes,
                threshold: self.settings.proposal_threshold,
            });
        }

        check_batch_lengths(&targets, &values, &calldatas)?;
        if targets.is_empty() {
            return Err(GovernanceError::InvalidInput("empty proposal".into()));
        }

        let description_hash = Self::hash_description(description);
        let id = Self::hash_proposal(&targets, &values, &calldatas, &description_hash);
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::ProposalExists(id));
        }

        let snapshot = block
            .checked_add(self.settings.voting_delay)
            .ok_or_else(|| GovernanceError::InvalidInput("voting delay overflows".into()))?;
        let deadline = snapshot
            .checked_add(self.settings.voting_period)
            .ok_or_else(|| GovernanceError::InvalidInput("voting period overflows".into()))?;

        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer: *caller,
                targets,
                values,
                calldatas,
                description_hash,
                snapshot,
                deadline,
                against_votes: 0,
                for_votes: 0,
                abstain_votes: 0,
                voters: BTreeMap::new(),
                canceled: false,
                executed: false,
                queued: None,
            },
        );

        tracing::info!(
            "Proposal {} created by {}: voting blocks {}..{}",
            id,
            caller,
            snapshot,
            deadline
        );
        Ok(id)
    }

    /// Record the caller's ballot with its power at the proposal snapshot.
    /// Returns the counted weight.
    pub fn cast_vote(
        &mut self,
        caller: &Address,
        id: &Hash,
        support: VoteSupport,
        ctx: &GovernorContext<'_>,
    ) -> Result<u64, GovernanceError> {
        self.expect_state(id, ProposalState::Active, "Active", ctx)?;

        let proposal = self.get_mut(id)?;
        if proposal.voters.contains_key(caller) {
            return Err(GovernanceError::AlreadyVoted {
                id: *id,
                voter: *caller,
            });
        }

        let weight = ctx.votes.get_past_votes(caller, proposal.snapshot);
        let bucket = match support {
            VoteSupport::Against => &mut proposal.against_votes,
            VoteSupport::For => &mut proposal.for_votes,
            VoteSupport::Abstain => &mut proposal.abstain_votes,
        };
        *bucket = bucket.checked_add(weight).ok_or_else(|| {
            GovernanceError::InvalidState(format!("tally overflow on proposal {}", id))
        })?;
        proposal.voters.insert(*caller, support);

        tracing::debug!("{} voted {:?} on {} with weight {}", caller, support, id, weight);
        Ok(weight)
    }

    /// Mark a succeeded proposal as queued. The caller (the chain) must then
    /// schedule the batch in the timelock with the governor as proposer.
    pub fn queue(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: &Hash,
        ctx: &GovernorContext<'_>,
    ) -> Result<QueueRequest, GovernanceError> {
        let id = Self::hash_proposal(targets, values, calldatas, description_hash);
        self.expect_state(&id, ProposalState::Succeeded, "Succeeded", ctx)?;

        let salt = self.timelock_salt(description_hash);
        let operation_id = TimelockController::hash_operation_batch(
            targets,
            values,
            calldatas,
            &Hash::ZERO,
            &salt,
        );
        let delay = ctx.timelock.get_min_delay();
        let eta = ctx
            .env
            .timestamp
            .checked_add(delay)
            .ok_or_else(|| GovernanceError::InvalidInput("timelock delay overflows".into()))?;

        self.get_mut(&id)?.queued = Some(QueuedOperation { operation_id, eta });
        tracing::info!("Proposal {} queued as operation {} (eta {})", id, operation_id, eta);

        Ok(QueueRequest {
            proposal_id: id,
            operation_id,
            salt,
            delay,
            eta,
        })
    }

    /// Mark a queued proposal as executed. The caller (the chain) must then
    /// run the batch through the timelock. Returns the proposal id and salt.
    pub fn execute(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: &Hash,
        ctx: &GovernorContext<'_>,
    ) -> Result<(Hash, Hash), GovernanceError> {
        let id = Self::hash_proposal(targets, values, calldatas, description_hash);
        self.expect_state(&id, ProposalState::Queued, "Queued", ctx)?;

        self.get_mut(&id)?.executed = true;
        tracing::info!("Executing proposal {}", id);
        Ok((id, self.timelock_salt(description_hash)))
    }

    /// Withdraw a proposal before voting starts. Proposer only.
    pub fn cancel(
        &mut self,
        caller: &Address,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: &Hash,
        ctx: &GovernorContext<'_>,
    ) -> Result<Hash, GovernanceError> {
        let id = Self::hash_proposal(targets, values, calldatas, description_hash);
        let proposer = self.get(&id)?.proposer;
        if caller != &proposer {
            return Err(GovernanceError::Unauthorized(format!(
                "only proposer {} can cancel {}",
                proposer, id
            )));
        }
        self.expect_state(&id, ProposalState::Pending, "Pending", ctx)?;

        self.get_mut(&id)?.canceled = true;
        tracing::info!("Proposal {} canceled", id);
        Ok(id)
    }

    fn only_governance(&self, caller: &Address) -> Result<(), GovernanceError> {
        if caller != &self.timelock {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not the governance executor {}",
                caller, self.timelock
            )));
        }
        Ok(())
    }

    /// Returns the previous value.
    pub fn set_voting_delay(&mut self, caller: &Address, new_delay: u64) -> Result<u64, GovernanceError> {
        self.only_governance(caller)?;
        let old = std::mem::replace(&mut self.settings.voting_delay, new_delay);
        tracing::info!("Voting delay set from {} to {}", old, new_delay);
        Ok(old)
    }

    pub fn set_voting_period(&mut self, caller: &Address, new_period: u64) -> Result<u64, GovernanceError> {
        self.only_governance(caller)?;
        if new_period == 0 {
            return Err(GovernanceError::InvalidInput("voting period must be non-zero".into()));
        }
        let old = std::mem::replace(&mut self.settings.voting_period, new_period);
        tracing::info!("Voting period set from {} to {}", old, new_period);
        Ok(old)
    }

    pub fn set_proposal_threshold(
        &mut self,
        caller: &Address,
        new_threshold: u64,
    ) -> Result<u64, GovernanceError> {
        self.only_governance(caller)?;
        let old = std::mem::replace(&mut self.settings.proposal_threshold, new_threshold);
        tracing::info!("Proposal threshold set from {} to {}", old, new_threshold);
        Ok(old)
    }

    /// Applies to proposals whose snapshot is after `block`; proposals that
    /// already reached their snapshot keep the numerator they had.
    pub fn update_quorum_numerator(
        &mut self,
        caller: &Address,
        new_numerator: u64,
        block: u64,
    ) -> Result<u64, GovernanceError> {
        self.only_governance(caller)?;
        if new_numerator > QUORUM_DENOMINATOR {
            return Err(GovernanceError::InvalidInput(format!(
                "quorum numerator {} exceeds {}",
                new_numerator, QUORUM_DENOMINATOR
            )));
        }
        self.quorum_history
            .push(block.saturating_add(1), new_numerator)?;
        let old = std::mem::replace(&mut self.settings.quorum_numerator, new_numerator);
        tracing::info!(
            "Quorum numerator updated from {} to {} for snapshots after block {}",
            old,
            new_numerator,
            block
        );
        Ok(old)
    }
}
