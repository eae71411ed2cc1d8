//! Events emitted by components, collected per transaction.

use agora_types::{Address, Hash};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::governor::VoteSupport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Token
    Transfer {
        from: Address,
        to: Address,
        token_id: u64,
    },
    Approval {
        owner: Address,
        approved: Address,
        token_id: u64,
    },
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
    DelegateChanged {
        delegator: Address,
        from_delegate: Option<Address>,
        to_delegate: Option<Address>,
    },
    DelegateVotesChanged {
        delegate: Address,
        previous_votes: u64,
        new_votes: u64,
    },

    // Timelock
    CallScheduled {
        id: Hash,
        index: u64,
        target: Address,
        value: u128,
        data: Vec<u8>,
        predecessor: Hash,
        delay: u64,
    },
    CallExecuted {
        id: Hash,
        index: u64,
        target: Address,
        value: u128,
        data: Vec<u8>,
    },
    Cancelled {
        id: Hash,
    },
    MinDelayChange {
        old_duration: u64,
        new_duration: u64,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },

    // Governor
    ProposalCreated {
        proposal_id: Hash,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        vote_start: u64,
        vote_end: u64,
        description: String,
    },
    VoteCast {
        voter: Address,
        proposal_id: Hash,
        support: VoteSupport,
        weight: u64,
        reason: String,
    },
    ProposalQueued {
        proposal_id: Hash,
        eta: u64,
    },
    ProposalExecuted {
        proposal_id: Hash,
    },
    ProposalCanceled {
        proposal_id: Hash,
    },
    VotingDelaySet {
        old_voting_delay: u64,
        new_voting_delay: u64,
    },
    VotingPeriodSet {
        old_voting_period: u64,
        new_voting_period: u64,
    },
    ProposalThresholdSet {
        old_proposal_threshold: u64,
        new_proposal_threshold: u64,
    },
    QuorumNumeratorUpdated {
        old_quorum_numerator: u64,
        new_quorum_numerator: u64,
    },

    // Treasury
    FundsReceived {
        from: Address,
        amount: u128,
    },
    FundsReleased {
        to: Address,
        amount: u128,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

/// An event with the component that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub emitter: Address,
    pub block: u64,
    pub event: Event,
}
