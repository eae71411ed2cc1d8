//! Call encoding between components.
//!
//! A call is a borsh-encoded [`Call`]: the outer variant names the component
//! family, the inner variant names the operation. Empty calldata is a plain
//! value transfer and never decodes into a `Call`.

use agora_types::{Address, Hash};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::access::Role;
use crate::error::GovernanceError;
use crate::governor::VoteSupport;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Call {
    Token(TokenCall),
    Timelock(TimelockCall),
    Governor(GovernorCall),
    Treasury(TreasuryCall),
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TokenCall {
    Mint { to: Address, token_id: u64 },
    TransferFrom { from: Address, to: Address, token_id: u64 },
    Approve { to: Address, token_id: u64 },
    SetApprovalForAll { operator: Address, approved: bool },
    Delegate { delegatee: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TimelockCall {
    Schedule {
        target: Address,
        value: u128,
        data: Vec<u8>,
        predecessor: Hash,
        salt: Hash,
        delay: u64,
    },
    ScheduleBatch {
        targets: Vec<Address>,
        values: Vec<u128>,
        payloads: Vec<Vec<u8>>,
        predecessor: Hash,
        salt: Hash,
        delay: u64,
    },
    Execute {
        target: Address,
        value: u128,
        data: Vec<u8>,
        predecessor: Hash,
        salt: Hash,
    },
    ExecuteBatch {
        targets: Vec<Address>,
        values: Vec<u128>,
        payloads: Vec<Vec<u8>>,
        predecessor: Hash,
        salt: Hash,
    },
    Cancel { id: Hash },
    UpdateDelay { new_delay: u64 },
    GrantRole { role: Role, account: Address },
    RevokeRole { role: Role, account: Address },
    RenounceRole { role: Role, account: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum GovernorCall {
    Propose {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description: String,
    },
    CastVote { proposal_id: Hash, support: VoteSupport },
    CastVoteWithReason { proposal_id: Hash, support: VoteSupport, reason: String },
    Queue {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    Execute {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    Cancel {
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description_hash: Hash,
    },
    SetVotingDelay { new_delay: u64 },
    SetVotingPeriod { new_period: u64 },
    SetProposalThreshold { new_threshold: u64 },
    UpdateQuorumNumerator { new_numerator: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TreasuryCall {
    ReleaseFunds { to: Address, amount: u128 },
    TransferOwnership { new_owner: Address },
}

impl Call {
    pub fn encode(&self) -> Result<Vec<u8>, GovernanceError> {
        borsh::to_vec(self).map_err(|e| GovernanceError::InvalidCalldata(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, GovernanceError> {
        borsh::from_slice(data).map_err(|e| GovernanceError::InvalidCalldata(e.to_string()))
    }

    /// Component family name, for logs and errors.
    pub fn family(&self) -> &'static str {
        match self {
            Call::Token(_) => "token",
            Call::Timelock(_) => "timelock",
            Call::Governor(_) => "governor",
            Call::Treasury(_) => "treasury",
        }
    }
}

impl From<TokenCall> for Call {
    fn from(call: TokenCall) -> Self {
        Call::Token(call)
    }
}

impl From<TimelockCall> for Call {
    fn from(call: TimelockCall) -> Self {
        Call::Timelock(call)
    }
}

impl From<GovernorCall> for Call {
    fn from(call: GovernorCall) -> Self {
        Call::Governor(call)
    }
}

impl From<TreasuryCall> for Call {
    fn from(call: TreasuryCall) -> Self {
        Call::Treasury(call)
    }
}
