//! Agora Governance - on-chain DAO governance core.
//!
//! This crate provides:
//! - A non-fungible voting token with delegation and historical vote checkpoints
//! - A role-gated timelock controller for delayed execution
//! - A proposal governor (propose, vote, queue, execute)
//! - A treasury owned by the timelock
//! - An in-memory chain substrate that runs calls atomically

pub mod access;
pub mod calldata;
pub mod chain;
pub mod checkpoints;
pub mod config;
pub mod deploy;
pub mod error;
pub mod events;
pub mod governor;
pub mod timelock;
pub mod treasury;
pub mod votes;

pub use access::{AccessControl, Role};
pub use calldata::{Call, GovernorCall, TimelockCall, TokenCall, TreasuryCall};
pub use chain::{BlockEnv, Chain, Receipt};
pub use config::GovernanceConfig;
pub use deploy::Deployment;
pub use error::{ErrorKind, GovernanceError};
pub use events::{Event, LogEntry};
pub use governor::{Governor, GovernorSettings, ProposalState, VoteSupport};
pub use timelock::{OperationState, TimelockController};
pub use treasury::Treasury;
pub use votes::{Votes, VotingToken};
