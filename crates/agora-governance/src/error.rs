use agora_types::{Address, Hash};
use thiserror::Error;

use crate::access::Role;
use crate::governor::ProposalState;
use crate::timelock::OperationState;

/// Errors that can occur in governance operations.
///
/// Every failure reverts the whole transaction; the variants only carry
/// enough context for callers to report what went wrong.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unauthorized: account {account} is missing role {role}")]
    MissingRole { account: Address, role: Role },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Proposer {account} has {votes} votes, below proposal threshold {threshold}")]
    BelowProposalThreshold {
        account: Address,
        votes: u64,
        threshold: u64,
    },

    #[error("Proposal {id} is {actual:?}, expected {expected}")]
    UnexpectedProposalState {
        id: Hash,
        actual: ProposalState,
        expected: &'static str,
    },

    #[error("Operation {id} is {actual:?}, expected {expected}")]
    UnexpectedOperationState {
        id: Hash,
        actual: OperationState,
        expected: &'static str,
    },

    #[error("Account {voter} already voted on proposal {id}")]
    AlreadyVoted { id: Hash, voter: Address },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown proposal: {0}")]
    UnknownProposal(Hash),

    #[error("Proposal already exists: {0}")]
    ProposalExists(Hash),

    #[error("Operation already scheduled: {0}")]
    OperationExists(Hash),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),

    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: Address,
        requested: u128,
        available: u128,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse failure category, stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    InvalidState,
    InvalidInput,
    InsufficientFunds,
    Storage,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::MissingRole { .. }
            | GovernanceError::Unauthorized(_)
            | GovernanceError::BelowProposalThreshold { .. } => ErrorKind::Unauthorized,

            GovernanceError::UnexpectedProposalState { .. }
            | GovernanceError::UnexpectedOperationState { .. }
            | GovernanceError::AlreadyVoted { .. }
            | GovernanceError::InvalidState(_) => ErrorKind::InvalidState,

            GovernanceError::UnknownProposal(_)
            | GovernanceError::ProposalExists(_)
            | GovernanceError::OperationExists(_)
            | GovernanceError::InvalidInput(_)
            | GovernanceError::InvalidCalldata(_)
            | GovernanceError::Config(_) => ErrorKind::InvalidInput,

            GovernanceError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,

            GovernanceError::Storage(_) => ErrorKind::Storage,
        }
    }
}
