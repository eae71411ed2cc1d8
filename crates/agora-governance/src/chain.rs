//! In-memory chain substrate.
//!
//! Holds native balances and every deployed component, and runs each
//! transaction atomically: the world state is snapshotted before dispatch and
//! restored if any nested call fails. Components call each other through
//! [`Chain::call`], with the calling component as the caller.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use agora_types::{Address, Hash};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::calldata::{Call, GovernorCall, TimelockCall, TokenCall, TreasuryCall};
use crate::error::GovernanceError;
use crate::events::{Event, LogEntry};
use crate::governor::{Governor, GovernorContext, GovernorSettings, ProposalState};
use crate::timelock::{check_batch_lengths, TimelockController};
use crate::treasury::Treasury;
use crate::votes::{Votes, VotesMoved, VotingToken};

/// Maximum nesting of calls inside one transaction.
pub const MAX_CALL_DEPTH: usize = 64;

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const DEFAULT_BLOCK_TIME: u64 = 12;

/// Current block as seen by a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    pub number: u64,
    /// Seconds
    pub timestamp: u64,
}

/// Events emitted by one committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub block: u64,
    pub logs: Vec<LogEntry>,
}

impl Receipt {
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.logs.iter().map(|log| &log.event)
    }

    /// Id of the first proposal created in this transaction.
    pub fn proposal_id(&self) -> Option<Hash> {
        self.events().find_map(|event| match event {
            Event::ProposalCreated { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        })
    }

    /// Id of the first timelock operation scheduled in this transaction.
    pub fn operation_id(&self) -> Option<Hash> {
        self.events().find_map(|event| match event {
            Event::CallScheduled { id, .. } => Some(*id),
            _ => None,
        })
    }
}

/// Everything a transaction may change. Cloned for rollback and persisted
/// as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldState {
    env: BlockEnv,
    block_time: u64,
    balances: HashMap<Address, u128>,
    nonces: HashMap<Address, u64>,
    tokens: HashMap<Address, VotingToken>,
    timelocks: HashMap<Address, TimelockController>,
    governors: HashMap<Address, Governor>,
    treasuries: HashMap<Address, Treasury>,
    logs: Vec<LogEntry>,
}

#[derive(Debug)]
pub struct Chain {
    state: WorldState,
    depth: usize,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Chain at block 1 with 12 second blocks.
    pub fn new() -> Self {
        Self::with_env(
            BlockEnv {
                number: 1,
                timestamp: GENESIS_TIMESTAMP,
            },
            DEFAULT_BLOCK_TIME,
        )
    }

    pub fn with_env(env: BlockEnv, block_time: u64) -> Self {
        Self {
            state: WorldState {
                env,
                block_time,
                ..WorldState::default()
            },
            depth: 0,
        }
    }

    pub fn env(&self) -> BlockEnv {
        self.state.env
    }

    pub fn block_number(&self) -> u64 {
        self.state.env.number
    }

    pub fn timestamp(&self) -> u64 {
        self.state.env.timestamp
    }

    /// Advance `blocks` blocks, moving the clock by the block time for each.
    pub fn mine(&mut self, blocks: u64) {
        let env = &mut self.state.env;
        env.number = env.number.saturating_add(blocks);
        env.timestamp = env
            .timestamp
            .saturating_add(blocks.saturating_mul(self.state.block_time));
        tracing::debug!("Mined to block {} (t={})", env.number, env.timestamp);
    }

    /// Advance the clock without producing blocks.
    pub fn increase_time(&mut self, seconds: u64) {
        self.state.env.timestamp = self.state.env.timestamp.saturating_add(seconds);
    }

    /// Credit native balance out of thin air.
    pub fn fund(&mut self, account: Address, amount: u128) {
        let balance = self.state.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.state.balances.get(account).copied().unwrap_or(0)
    }

    pub fn nonce(&self, account: &Address) -> u64 {
        self.state.nonces.get(account).copied().unwrap_or(0)
    }

    /// Every event committed so far.
    pub fn logs(&self) -> &[LogEntry] {
        &self.state.logs
    }

    // Deployment

    fn next_contract_address(&mut self, deployer: &Address) -> Address {
        let nonce = self.state.nonces.entry(*deployer).or_insert(0);
        let address = Address::for_contract(deployer, *nonce);
        *nonce += 1;
        address
    }

    pub fn deploy_voting_token(
        &mut self,
        deployer: Address,
        name: &str,
        symbol: &str,
    ) -> Address {
        let address = self.next_contract_address(&deployer);
        self.state
            .tokens
            .insert(address, VotingToken::new(name, symbol, deployer));
        tracing::info!("Deployed voting token {} at {}", symbol, address);
        address
    }

    pub fn deploy_timelock(
        &mut self,
        deployer: Address,
        min_delay: u64,
        proposers: &[Address],
        executors: &[Address],
        admin: Option<Address>,
    ) -> Address {
        let address = self.next_contract_address(&deployer);
        let timelock = TimelockController::new(address, min_delay, proposers, executors, admin);

        let mut events = Vec::new();
        for role in [Role::Admin, Role::Proposer, Role::Canceller, Role::Executor] {
            for account in timelock.roles().members(role) {
                events.push(Event::RoleGranted {
                    role,
                    account,
                    sender: deployer,
                });
            }
        }
        events.push(Event::MinDelayChange {
            old_duration: 0,
            new_duration: min_delay,
        });

        self.state.timelocks.insert(address, timelock);
        self.emit(address, events);
        tracing::info!("Deployed timelock at {} (min delay {}s)", address, min_delay);
        address
    }

    pub fn deploy_governor(
        &mut self,
        deployer: Address,
        name: &str,
        token: Address,
        timelock: Address,
        settings: GovernorSettings,
    ) -> Result<Address, GovernanceError> {
        self.token(&token)?;
        self.timelock(&timelock)?;

        let address = Address::for_contract(&deployer, self.nonce(&deployer));
        let governor = Governor::new(name, address, token, timelock, settings)?;
        self.next_contract_address(&deployer);
        self.state.governors.insert(address, governor);
        tracing::info!("Deployed governor {} at {}", name, address);
        Ok(address)
    }

    /// Deploy a treasury owned by `deployer`, funded with `initial_funds`
    /// from the deployer's balance.
    pub fn deploy_treasury(
        &mut self,
        deployer: Address,
        initial_funds: u128,
    ) -> Result<Address, GovernanceError> {
        self.atomically(|chain| {
            let address = chain.next_contract_address(&deployer);
            chain
                .state
                .treasuries
                .insert(address, Treasury::new(address, deployer));
            chain.emit(
                address,
                [Event::OwnershipTransferred {
                    previous_owner: Address::ZERO,
                    new_owner: deployer,
                }],
            );
            chain.call(deployer, address, initial_funds, &[])?;
            tracing::info!("Deployed treasury at {} with {} funds", address, initial_funds);
            Ok(address)
        })
    }

    // Transactions

    /// Run `call` from `caller` against `target`, sending `value`.
    pub fn transact(
        &mut self,
        caller: Address,
        target: Address,
        value: u128,
        call: impl Into<Call>,
    ) -> Result<Receipt, GovernanceError> {
        self.transact_raw(caller, target, value, &call.into().encode()?)
    }

    /// Run already-encoded calldata. Empty data is a plain value transfer.
    pub fn transact_raw(
        &mut self,
        caller: Address,
        target: Address,
        value: u128,
        data: &[u8],
    ) -> Result<Receipt, GovernanceError> {
        let first_log = self.state.logs.len();
        match self.atomically(|chain| chain.call(caller, target, value, data)) {
            Ok(()) => {
                let logs = self.state.logs[first_log..].to_vec();
                tracing::debug!(
                    "Transaction {} -> {} committed with {} events",
                    caller,
                    target,
                    logs.len()
                );
                Ok(Receipt {
                    block: self.state.env.number,
                    logs,
                })
            }
            Err(e) => {
                tracing::warn!("Transaction {} -> {} reverted: {}", caller, target, e);
                Err(e)
            }
        }
    }

    /// Run `f`, restoring the whole world state if it fails.
    pub(crate) fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, GovernanceError>,
    ) -> Result<T, GovernanceError> {
        let snapshot = self.state.clone();
        let result = f(self);
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }

    /// Message call: move `value`, then run `data` against `target`.
    fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: u128,
        data: &[u8],
    ) -> Result<(), GovernanceError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(GovernanceError::InvalidState(format!(
                "call depth limit {} exceeded",
                MAX_CALL_DEPTH
            )));
        }
        self.depth += 1;
        let result = self.dispatch(caller, target, value, data);
        self.depth -= 1;
        result
    }

    fn dispatch(
        &mut self,
        caller: Address,
        target: Address,
        value: u128,
        data: &[u8],
    ) -> Result<(), GovernanceError> {
        self.transfer_value(&caller, &target, value)?;

        if value > 0 {
            if let Some(treasury) = self.state.treasuries.get_mut(&target) {
                treasury.receive(&caller, value)?;
                self.emit(target, [Event::FundsReceived { from: caller, amount: value }]);
            }
        }

        if data.is_empty() {
            return Ok(());
        }

        let call = Call::decode(data)?;
        tracing::debug!("Call {} -> {} ({})", caller, target, call.family());
        match call {
            Call::Token(call) => self.call_token(caller, target, call),
            Call::Timelock(call) => self.call_timelock(caller, target, call),
            Call::Governor(call) => self.call_governor(caller, target, value, call),
            Call::Treasury(call) => self.call_treasury(caller, target, call),
        }
    }

    fn transfer_value(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), GovernanceError> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(GovernanceError::InsufficientFunds {
                account: *from,
                requested: amount,
                available,
            })?;
        let credited = self.balance_of(to).checked_add(amount).ok_or_else(|| {
            GovernanceError::InvalidInput(format!("balance of {} overflows", to))
        })?;

        self.state.balances.insert(*from, remaining);
        self.state.balances.insert(*to, credited);
        Ok(())
    }

    fn emit(&mut self, emitter: Address, events: impl IntoIterator<Item = Event>) {
        let block = self.state.env.number;
        self.state.logs.extend(events.into_iter().map(|event| LogEntry {
            emitter,
            block,
            event,
        }));
    }

    fn call_token(
        &mut self,
        caller: Address,
        target: Address,
        call: TokenCall,
    ) -> Result<(), GovernanceError> {
        let block = self.state.env.number;
        let token = self
            .state
            .tokens
            .get_mut(&target)
            .ok_or_else(|| not_a(&target, "voting token"))?;

        let mut events = Vec::new();
        match call {
            TokenCall::Mint { to, token_id } => {
                let moved = token.mint(&caller, to, token_id, block)?;
                events.push(Event::Transfer {
                    from: Address::ZERO,
                    to,
                    token_id,
                });
                events.extend(moved.into_iter().map(votes_changed));
            }
            TokenCall::TransferFrom { from, to, token_id } => {
                let moved = token.transfer_from(&caller, from, to, token_id, block)?;
                events.push(Event::Transfer { from, to, token_id });
                events.extend(moved.into_iter().map(votes_changed));
            }
            TokenCall::Approve { to, token_id } => {
                let owner = token.approve(&caller, to, token_id)?;
                events.push(Event::Approval {
                    owner,
                    approved: to,
                    token_id,
                });
            }
            TokenCall::SetApprovalForAll { operator, approved } => {
                token.set_approval_for_all(&caller, operator, approved)?;
                events.push(Event::ApprovalForAll {
                    owner: caller,
                    operator,
                    approved,
                });
            }
            TokenCall::Delegate { delegatee } => {
                let (previous, moved) = token.delegate(&caller, delegatee, block)?;
                events.push(Event::DelegateChanged {
                    delegator: caller,
                    from_delegate: previous,
                    to_delegate: (!delegatee.is_zero()).then_some(delegatee),
                });
                events.extend(moved.into_iter().map(votes_changed));
            }
        }

        self.emit(target, events);
        Ok(())
    }

    fn timelock_mut(&mut self, address: &Address) -> Result<&mut TimelockController, GovernanceError> {
        self.state
            .timelocks
            .get_mut(address)
            .ok_or_else(|| not_a(address, "timelock"))
    }

    fn call_timelock(
        &mut self,
        caller: Address,
        target: Address,
        call: TimelockCall,
    ) -> Result<(), GovernanceError> {
        let now = self.state.env.timestamp;
        match call {
            TimelockCall::Schedule {
                target: callee,
                value,
                data,
                predecessor,
                salt,
                delay,
            } => {
                let id = self.timelock_mut(&target)?.schedule(
                    &caller,
                    &callee,
                    value,
                    &data,
                    &predecessor,
                    &salt,
                    delay,
                    now,
                )?;
                self.emit(
                    target,
                    [Event::CallScheduled {
                        id,
                        index: 0,
                        target: callee,
                        value,
                        data,
                        predecessor,
                        delay,
                    }],
                );
            }
            TimelockCall::ScheduleBatch {
                targets,
                values,
                payloads,
                predecessor,
                salt,
                delay,
            } => {
                let id = self.timelock_mut(&target)?.schedule_batch(
                    &caller,
                    &targets,
                    &values,
                    &payloads,
                    &predecessor,
                    &salt,
                    delay,
                    now,
                )?;
                let events = targets
                    .into_iter()
                    .zip(values)
                    .zip(payloads)
                    .enumerate()
                    .map(|(index, ((callee, value), data))| Event::CallScheduled {
                        id,
                        index: index as u64,
                        target: callee,
                        value,
                        data,
                        predecessor,
                        delay,
                    })
                    .collect::<Vec<_>>();
                self.emit(target, events);
            }
            TimelockCall::Execute {
                target: callee,
                value,
                data,
                predecessor,
                salt,
            } => {
                let id = TimelockController::hash_operation(&callee, value, &data, &predecessor, &salt);
                self.timelock_mut(&target)?
                    .claim_execution(&caller, &id, &predecessor, now)?;
                self.call(target, callee, value, &data)?;
                self.emit(
                    target,
                    [Event::CallExecuted {
                        id,
                        index: 0,
                        target: callee,
                        value,
                        data,
                    }],
                );
            }
            TimelockCall::ExecuteBatch {
                targets,
                values,
                payloads,
                predecessor,
                salt,
            } => {
                check_batch_lengths(&targets, &values, &payloads)?;
                let id = TimelockController::hash_operation_batch(
                    &targets,
                    &values,
                    &payloads,
                    &predecessor,
                    &salt,
                );
                self.timelock_mut(&target)?
                    .claim_execution(&caller, &id, &predecessor, now)?;
                for (index, ((callee, value), data)) in
                    targets.into_iter().zip(values).zip(payloads).enumerate()
                {
                    self.call(target, callee, value, &data)?;
                    self.emit(
                        target,
                        [Event::CallExecuted {
                            id,
                            index: index as u64,
                            target: callee,
                            value,
                            data,
                        }],
                    );
                }
            }
            TimelockCall::Cancel { id } => {
                self.timelock_mut(&target)?.cancel(&caller, &id, now)?;
                self.emit(target, [Event::Cancelled { id }]);
            }
            TimelockCall::UpdateDelay { new_delay } => {
                let old = self.timelock_mut(&target)?.update_delay(&caller, new_delay)?;
                self.emit(
                    target,
                    [Event::MinDelayChange {
                        old_duration: old,
                        new_duration: new_delay,
                    }],
                );
            }
            TimelockCall::GrantRole { role, account } => {
                let roles = self.timelock_mut(&target)?.roles_mut();
                if roles.grant_role(&caller, role, account)? {
                    tracing::info!("Granted {} to {} on {}", role, account, target);
                    self.emit(target, [Event::RoleGranted { role, account, sender: caller }]);
                }
            }
            TimelockCall::RevokeRole { role, account } => {
                let roles = self.timelock_mut(&target)?.roles_mut();
                if roles.revoke_role(&caller, role, &account)? {
                    tracing::info!("Revoked {} from {} on {}", role, account, target);
                    self.emit(target, [Event::RoleRevoked { role, account, sender: caller }]);
                }
            }
            TimelockCall::RenounceRole { role, account } => {
                let roles = self.timelock_mut(&target)?.roles_mut();
                if roles.renounce_role(&caller, role, &account)? {
                    tracing::info!("{} renounced {} on {}", account, role, target);
                    self.emit(target, [Event::RoleRevoked { role, account, sender: caller }]);
                }
            }
        }
        Ok(())
    }

    fn call_governor(
        &mut self,
        caller: Address,
        target: Address,
        value: u128,
        call: GovernorCall,
    ) -> Result<(), GovernanceError> {
        let env = self.state.env;
        let state = &mut self.state;
        let governor = state
            .governors
            .get_mut(&target)
            .ok_or_else(|| not_a(&target, "governor"))?;
        let timelock_address = governor.timelock();
        let token_address = governor.token();
        let votes: &dyn Votes = state
            .tokens
            .get(&token_address)
            .ok_or_else(|| not_a(&token_address, "voting token"))?;
        let timelock = state
            .timelocks
            .get(&timelock_address)
            .ok_or_else(|| not_a(&timelock_address, "timelock"))?;
        let ctx = GovernorContext {
            env,
            votes,
            timelock,
        };

        // Nested timelock call the governor makes after updating itself
        let mut forward: Option<(TimelockCall, u128)> = None;
        // Snapshot block a ballot was weighted at
        let mut tallied: Option<u64> = None;
        let events = match call {
            GovernorCall::Propose {
                targets,
                values,
                calldatas,
                description,
            } => {
                let proposal_id = governor.propose(
                    &caller,
                    targets.clone(),
                    values.clone(),
                    calldatas.clone(),
                    &description,
                    &ctx,
                )?;
                let vote_start = governor.proposal_snapshot(&proposal_id).unwrap_or_default();
                let vote_end = governor.proposal_deadline(&proposal_id).unwrap_or_default();
                vec![Event::ProposalCreated {
                    proposal_id,
                    proposer: caller,
                    targets,
                    values,
                    calldatas,
                    vote_start,
                    vote_end,
                    description,
                }]
            }
            GovernorCall::CastVote { proposal_id, support } => {
                let weight = governor.cast_vote(&caller, &proposal_id, support, &ctx)?;
                tallied = governor.proposal_snapshot(&proposal_id);
                vec![Event::VoteCast {
                    voter: caller,
                    proposal_id,
                    support,
                    weight,
                    reason: String::new(),
                }]
            }
            GovernorCall::CastVoteWithReason {
                proposal_id,
                support,
                reason,
            } => {
                let weight = governor.cast_vote(&caller, &proposal_id, support, &ctx)?;
                tallied = governor.proposal_snapshot(&proposal_id);
                vec![Event::VoteCast {
                    voter: caller,
                    proposal_id,
                    support,
                    weight,
                    reason,
                }]
            }
            GovernorCall::Queue {
                targets,
                values,
                calldatas,
                description_hash,
            } => {
                let request = governor.queue(&targets, &values, &calldatas, &description_hash, &ctx)?;
                forward = Some((
                    TimelockCall::ScheduleBatch {
                        targets,
                        values,
                        payloads: calldatas,
                        predecessor: Hash::ZERO,
                        salt: request.salt,
                        delay: request.delay,
                    },
                    0,
                ));
                vec![Event::ProposalQueued {
                    proposal_id: request.proposal_id,
                    eta: request.eta,
                }]
            }
            GovernorCall::Execute {
                targets,
                values,
                calldatas,
                description_hash,
            } => {
                let (proposal_id, salt) =
                    governor.execute(&targets, &values, &calldatas, &description_hash, &ctx)?;
                forward = Some((
                    TimelockCall::ExecuteBatch {
                        targets,
                        values,
                        payloads: calldatas,
                        predecessor: Hash::ZERO,
                        salt,
                    },
                    value,
                ));
                vec![Event::ProposalExecuted { proposal_id }]
            }
            GovernorCall::Cancel {
                targets,
                values,
                calldatas,
                description_hash,
            } => {
                let proposal_id =
                    governor.cancel(&caller, &targets, &values, &calldatas, &description_hash, &ctx)?;
                vec![Event::ProposalCanceled { proposal_id }]
            }
            GovernorCall::SetVotingDelay { new_delay } => {
                let old = governor.set_voting_delay(&caller, new_delay)?;
                vec![Event::VotingDelaySet {
                    old_voting_delay: old,
                    new_voting_delay: new_delay,
                }]
            }
            GovernorCall::SetVotingPeriod { new_period } => {
                let old = governor.set_voting_period(&caller, new_period)?;
                vec![Event::VotingPeriodSet {
                    old_voting_period: old,
                    new_voting_period: new_period,
                }]
            }
            GovernorCall::SetProposalThreshold { new_threshold } => {
                let old = governor.set_proposal_threshold(&caller, new_threshold)?;
                vec![Event::ProposalThresholdSet {
                    old_proposal_threshold: old,
                    new_proposal_threshold: new_threshold,
                }]
            }
            GovernorCall::UpdateQuorumNumerator { new_numerator } => {
                let old = governor.update_quorum_numerator(&caller, new_numerator, env.number)?;
                vec![Event::QuorumNumeratorUpdated {
                    old_quorum_numerator: old,
                    new_quorum_numerator: new_numerator,
                }]
            }
        };

        if let Some(block) = tallied {
            if let Some(token) = self.state.tokens.get_mut(&token_address) {
                token.finalize(block);
            }
        }
        if let Some((call, forwarded)) = forward {
            self.call(target, timelock_address, forwarded, &Call::Timelock(call).encode()?)?;
        }
        self.emit(target, events);
        Ok(())
    }

    fn call_treasury(
        &mut self,
        caller: Address,
        target: Address,
        call: TreasuryCall,
    ) -> Result<(), GovernanceError> {
        let treasury = self
            .state
            .treasuries
            .get_mut(&target)
            .ok_or_else(|| not_a(&target, "treasury"))?;

        match call {
            TreasuryCall::ReleaseFunds { to, amount } => {
                treasury.release_funds(&caller, &to, amount)?;
                self.call(target, to, amount, &[])?;
                self.emit(target, [Event::FundsReleased { to, amount }]);
            }
            TreasuryCall::TransferOwnership { new_owner } => {
                let previous_owner = treasury.transfer_ownership(&caller, new_owner)?;
                self.emit(
                    target,
                    [Event::OwnershipTransferred {
                        previous_owner,
                        new_owner,
                    }],
                );
            }
        }
        Ok(())
    }

    // Views

    pub fn token(&self, address: &Address) -> Result<&VotingToken, GovernanceError> {
        self.state
            .tokens
            .get(address)
            .ok_or_else(|| not_a(address, "voting token"))
    }

    pub fn timelock(&self, address: &Address) -> Result<&TimelockController, GovernanceError> {
        self.state
            .timelocks
            .get(address)
            .ok_or_else(|| not_a(address, "timelock"))
    }

    pub fn governor(&self, address: &Address) -> Result<&Governor, GovernanceError> {
        self.state
            .governors
            .get(address)
            .ok_or_else(|| not_a(address, "governor"))
    }

    pub fn treasury(&self, address: &Address) -> Result<&Treasury, GovernanceError> {
        self.state
            .treasuries
            .get(address)
            .ok_or_else(|| not_a(address, "treasury"))
    }

    /// Context a governor call would see at the current block.
    pub fn governor_context<'a>(
        &'a self,
        governor: &Governor,
    ) -> Result<GovernorContext<'a>, GovernanceError> {
        Ok(GovernorContext {
            env: self.state.env,
            votes: self.token(&governor.token())?,
            timelock: self.timelock(&governor.timelock())?,
        })
    }

    pub fn proposal_state(
        &self,
        governor: &Address,
        proposal_id: &Hash,
    ) -> Result<ProposalState, GovernanceError> {
        let governor = self.governor(governor)?;
        governor.state(proposal_id, &self.governor_context(governor)?)
    }

    /// Whether a timelock operation is executable at the current time.
    pub fn is_operation_ready(&self, timelock: &Address, id: &Hash) -> Result<bool, GovernanceError> {
        Ok(self.timelock(timelock)?.is_operation_ready(id, self.timestamp()))
    }

    pub fn get_past_votes(
        &self,
        token: &Address,
        account: &Address,
        block: u64,
    ) -> Result<u64, GovernanceError> {
        self.check_past_block(block)?;
        Ok(self.token(token)?.get_past_votes(account, block))
    }

    pub fn get_past_total_supply(&self, token: &Address, block: u64) -> Result<u64, GovernanceError> {
        self.check_past_block(block)?;
        Ok(self.token(token)?.get_past_total_supply(block))
    }

    fn check_past_block(&self, block: u64) -> Result<(), GovernanceError> {
        if block > self.state.env.number {
            return Err(GovernanceError::InvalidInput(format!(
                "block {} is in the future (current {})",
                block, self.state.env.number
            )));
        }
        Ok(())
    }

    // Persistence

    /// Write the whole world state to `path` as JSON.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), GovernanceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GovernanceError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.state)
            .map_err(|e| GovernanceError::Storage(e.to_string()))?;
        fs::write(path, json).map_err(|e| GovernanceError::Storage(e.to_string()))?;
        tracing::debug!("State persisted to {:?}", path);
        Ok(())
    }

    pub fn load_state(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| GovernanceError::Storage(e.to_string()))?;
        let state: WorldState =
            serde_json::from_str(&json).map_err(|e| GovernanceError::Storage(e.to_string()))?;
        tracing::info!(
            "Loaded state from {:?}: block {}, {} events",
            path,
            state.env.number,
            state.logs.len()
        );
        Ok(Self { state, depth: 0 })
    }
}

fn votes_changed(moved: VotesMoved) -> Event {
    Event::DelegateVotesChanged {
        delegate: moved.delegate,
        previous_votes: moved.previous,
        new_votes: moved.new,
    }
}

fn not_a(address: &Address, kind: &str) -> GovernanceError {
    GovernanceError::InvalidCalldata(format!("{} is not a {} contract", address, kind))
}
