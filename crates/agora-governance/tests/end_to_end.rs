//! Full governance flows driven through the chain substrate.

use agora_governance::{
    Call, Chain, Deployment, ErrorKind, Event, GovernanceConfig, Governor, GovernorCall,
    OperationState, ProposalState, Role, TimelockCall, TimelockController, TokenCall,
    TreasuryCall, VoteSupport,
};
use agora_types::{Address, Hash};

const ONE: u128 = 1_000_000_000_000_000_000;

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn deployer() -> Address {
    addr(1)
}

fn holder() -> Address {
    addr(2)
}

struct Dao {
    chain: Chain,
    d: Deployment,
}

impl Dao {
    fn new() -> Self {
        Self::with_config(GovernanceConfig::default())
    }

    /// Deployed system where `holder()` owns one self-delegated unit.
    fn with_config(config: GovernanceConfig) -> Self {
        let mut chain = Chain::new();
        chain.fund(deployer(), 10 * ONE);
        let d = Deployment::deploy(&mut chain, deployer(), &config).unwrap();
        let mut dao = Self { chain, d };
        dao.mint(holder(), 0);
        dao.delegate(holder(), holder());
        dao.chain.mine(1);
        dao
    }

    fn mint(&mut self, to: Address, token_id: u64) {
        self.chain
            .transact(deployer(), self.d.token, 0, TokenCall::Mint { to, token_id })
            .unwrap();
    }

    fn delegate(&mut self, from: Address, to: Address) {
        self.chain
            .transact(from, self.d.token, 0, TokenCall::Delegate { delegatee: to })
            .unwrap();
    }

    fn state(&self, id: &Hash) -> ProposalState {
        self.chain.proposal_state(&self.d.governor, id).unwrap()
    }

    fn treasury_funds(&self) -> u128 {
        self.chain.treasury(&self.d.treasury).unwrap().total_funds()
    }

    fn is_released(&self) -> bool {
        self.chain.treasury(&self.d.treasury).unwrap().is_released()
    }

    fn vote(&mut self, voter: Address, id: Hash, support: VoteSupport) -> Result<(), agora_governance::GovernanceError> {
        self.chain
            .transact(
                voter,
                self.d.governor,
                0,
                GovernorCall::CastVote {
                    proposal_id: id,
                    support,
                },
            )
            .map(|_| ())
    }

    fn propose(&mut self, p: &ProposalBatch) -> Result<Hash, agora_governance::GovernanceError> {
        let receipt = self.chain.transact(holder(), self.d.governor, 0, p.propose())?;
        Ok(receipt.proposal_id().unwrap())
    }

    /// Propose, vote For with the holder, and run the vote to its deadline.
    fn pass(&mut self, p: &ProposalBatch) -> Hash {
        let id = self.propose(p).unwrap();
        self.chain.mine(1);
        self.vote(holder(), id, VoteSupport::For).unwrap();
        self.chain.mine(100);
        assert_eq!(self.state(&id), ProposalState::Succeeded);
        id
    }

    fn queue(&mut self, p: &ProposalBatch) -> Result<Hash, agora_governance::GovernanceError> {
        let receipt = self.chain.transact(holder(), self.d.governor, 0, p.queue())?;
        Ok(receipt.operation_id().unwrap())
    }

    fn execute(&mut self, p: &ProposalBatch) -> Result<(), agora_governance::GovernanceError> {
        self.chain
            .transact(holder(), self.d.governor, 0, p.execute())
            .map(|_| ())
    }

    /// Let the deployer (timelock admin) act as a timelock proposer too.
    fn make_deployer_proposer(&mut self) {
        self.chain
            .transact(
                deployer(),
                self.d.timelock,
                0,
                TimelockCall::GrantRole {
                    role: Role::Proposer,
                    account: deployer(),
                },
            )
            .unwrap();
    }
}

struct ProposalBatch {
    targets: Vec<Address>,
    values: Vec<u128>,
    calldatas: Vec<Vec<u8>>,
    description: String,
}

impl ProposalBatch {
    fn single(target: Address, call: impl Into<Call>, description: &str) -> Self {
        Self {
            targets: vec![target],
            values: vec![0],
            calldatas: vec![call.into().encode().unwrap()],
            description: description.to_string(),
        }
    }

    fn release(dao: &Dao, amount: u128, description: &str) -> Self {
        Self::single(
            dao.d.treasury,
            TreasuryCall::ReleaseFunds {
                to: holder(),
                amount,
            },
            description,
        )
    }

    fn description_hash(&self) -> Hash {
        Governor::hash_description(&self.description)
    }

    fn id(&self) -> Hash {
        Governor::hash_proposal(
            &self.targets,
            &self.values,
            &self.calldatas,
            &self.description_hash(),
        )
    }

    fn propose(&self) -> GovernorCall {
        GovernorCall::Propose {
            targets: self.targets.clone(),
            values: self.values.clone(),
            calldatas: self.calldatas.clone(),
            description: self.description.clone(),
        }
    }

    fn queue(&self) -> GovernorCall {
        GovernorCall::Queue {
            targets: self.targets.clone(),
            values: self.values.clone(),
            calldatas: self.calldatas.clone(),
            description_hash: self.description_hash(),
        }
    }

    fn execute(&self) -> GovernorCall {
        GovernorCall::Execute {
            targets: self.targets.clone(),
            values: self.values.clone(),
            calldatas: self.calldatas.clone(),
            description_hash: self.description_hash(),
        }
    }
}

#[test_log::test]
fn test_release_half_of_treasury() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, ONE / 2, "Release 0.5 to the holder");
    let holder_before = dao.chain.balance_of(&holder());

    let id = dao.propose(&p).unwrap();
    assert_eq!(id, p.id());
    assert_eq!(dao.state(&id), ProposalState::Pending);

    dao.chain.mine(1);
    assert_eq!(dao.state(&id), ProposalState::Active);
    dao.vote(holder(), id, VoteSupport::For).unwrap();

    dao.chain.mine(100);
    assert_eq!(dao.state(&id), ProposalState::Succeeded);

    let op = dao.queue(&p).unwrap();
    assert_eq!(dao.state(&id), ProposalState::Queued);
    assert!(!dao.chain.is_operation_ready(&dao.d.timelock, &op).unwrap());

    dao.chain.increase_time(60);
    assert!(dao.chain.is_operation_ready(&dao.d.timelock, &op).unwrap());
    dao.execute(&p).unwrap();

    assert_eq!(dao.state(&id), ProposalState::Executed);
    assert!(dao.is_released());
    assert_eq!(dao.treasury_funds(), ONE / 2);
    assert_eq!(dao.chain.balance_of(&dao.d.treasury), ONE / 2);
    assert_eq!(dao.chain.balance_of(&holder()), holder_before + ONE / 2);
    assert!(dao.chain.timelock(&dao.d.timelock).unwrap().is_operation_done(&op));
}

#[test_log::test]
fn test_execute_emits_the_whole_chain_of_events() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, ONE / 4, "Events");
    let id = dao.pass(&p);
    dao.queue(&p).unwrap();
    dao.chain.increase_time(60);

    let receipt = dao
        .chain
        .transact(holder(), dao.d.governor, 0, p.execute())
        .unwrap();
    let emitters: Vec<Address> = receipt.logs.iter().map(|log| log.emitter).collect();
    assert_eq!(emitters, vec![dao.d.treasury, dao.d.timelock, dao.d.governor]);
    assert!(matches!(
        receipt.logs[2].event,
        Event::ProposalExecuted { proposal_id } if proposal_id == id
    ));
}

#[test_log::test]
fn test_duplicate_proposal_fails() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 1, "Same twice");
    dao.propose(&p).unwrap();

    let err = dao.propose(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test_log::test]
fn test_proposer_needs_votes() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 1, "No votes");
    let err = dao
        .chain
        .transact(addr(9), dao.d.governor, 0, p.propose())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test_log::test]
fn test_double_vote_fails() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 1, "Vote once");
    let id = dao.propose(&p).unwrap();
    dao.chain.mine(1);

    dao.vote(holder(), id, VoteSupport::For).unwrap();
    let err = dao.vote(holder(), id, VoteSupport::Against).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let governor = dao.chain.governor(&dao.d.governor).unwrap();
    assert_eq!(governor.proposal_votes(&id), Some((0, 1, 0)));
}

#[test_log::test]
fn test_vote_with_reason_is_logged() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 1, "Reasons");
    let id = dao.propose(&p).unwrap();
    dao.chain.mine(1);

    let receipt = dao
        .chain
        .transact(
            holder(),
            dao.d.governor,
            0,
            GovernorCall::CastVoteWithReason {
                proposal_id: id,
                support: VoteSupport::Abstain,
                reason: "not sure".into(),
            },
        )
        .unwrap();
    assert_eq!(
        receipt.logs[0].event,
        Event::VoteCast {
            voter: holder(),
            proposal_id: id,
            support: VoteSupport::Abstain,
            weight: 1,
            reason: "not sure".into(),
        }
    );
}

#[test_log::test]
fn test_defeated_proposal_cannot_be_queued() {
    let mut dao = Dao::new();
    // addr(3) holds two units and votes against
    dao.mint(addr(3), 1);
    dao.mint(addr(3), 2);
    dao.delegate(addr(3), addr(3));
    dao.chain.mine(1);

    let p = ProposalBatch::release(&dao, ONE, "Drain");
    let id = dao.propose(&p).unwrap();
    dao.chain.mine(1);
    dao.vote(holder(), id, VoteSupport::For).unwrap();
    dao.vote(addr(3), id, VoteSupport::Against).unwrap();
    dao.chain.mine(100);

    assert_eq!(dao.state(&id), ProposalState::Defeated);
    let err = dao.queue(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(dao.state(&id), ProposalState::Defeated);
}

#[test_log::test]
fn test_execute_before_ready_reverts_everything() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, ONE / 2, "Too early");
    let id = dao.pass(&p);
    let op = dao.queue(&p).unwrap();
    let logs_before = dao.chain.logs().len();

    dao.chain.increase_time(59);
    let err = dao.execute(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // The governor's executed marker was rolled back with the timelock failure
    assert_eq!(dao.state(&id), ProposalState::Queued);
    assert_eq!(dao.chain.logs().len(), logs_before);
    assert!(!dao.is_released());

    dao.chain.increase_time(1);
    dao.execute(&p).unwrap();
    assert!(dao.chain.timelock(&dao.d.timelock).unwrap().is_operation_done(&op));

    let err = dao.execute(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(dao.treasury_funds(), ONE / 2);
}

#[test_log::test]
fn test_direct_release_by_non_owner_fails() {
    let mut dao = Dao::new();
    for caller in [holder(), deployer(), dao.d.governor] {
        let err = dao
            .chain
            .transact(
                caller,
                dao.d.treasury,
                0,
                TreasuryCall::ReleaseFunds {
                    to: caller,
                    amount: 1,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
    assert_eq!(dao.treasury_funds(), ONE);
    assert!(!dao.is_released());
}

#[test_log::test]
fn test_overdraw_through_governance_fails() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 2 * ONE, "Too much");
    let id = dao.pass(&p);
    dao.queue(&p).unwrap();
    dao.chain.increase_time(60);

    let err = dao.execute(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(dao.state(&id), ProposalState::Queued);
    assert_eq!(dao.treasury_funds(), ONE);
}

#[test_log::test]
fn test_settings_change_only_through_proposals() {
    let mut dao = Dao::new();

    let err = dao
        .chain
        .transact(holder(), dao.d.governor, 0, GovernorCall::SetVotingDelay { new_delay: 5 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let p = ProposalBatch::single(
        dao.d.governor,
        GovernorCall::SetVotingDelay { new_delay: 5 },
        "Longer voting delay",
    );
    dao.pass(&p);
    dao.queue(&p).unwrap();
    dao.chain.increase_time(60);
    dao.execute(&p).unwrap();

    assert_eq!(dao.chain.governor(&dao.d.governor).unwrap().voting_delay(), 5);
}

#[test_log::test]
fn test_timelock_delay_changes_through_itself() {
    let mut dao = Dao::new();

    // Even the admin cannot change the delay directly
    let err = dao
        .chain
        .transact(deployer(), dao.d.timelock, 0, TimelockCall::UpdateDelay { new_delay: 1 })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let p = ProposalBatch::single(
        dao.d.timelock,
        TimelockCall::UpdateDelay { new_delay: 120 },
        "Slower timelock",
    );
    dao.pass(&p);
    dao.queue(&p).unwrap();
    dao.chain.increase_time(60);
    let receipt = dao.chain.transact(holder(), dao.d.governor, 0, p.execute()).unwrap();

    assert!(receipt.events().any(|e| *e
        == Event::MinDelayChange {
            old_duration: 60,
            new_duration: 120
        }));
    assert_eq!(dao.chain.timelock(&dao.d.timelock).unwrap().get_min_delay(), 120);
}

#[test_log::test]
fn test_predecessor_orders_operations() {
    let mut dao = Dao::new();
    dao.make_deployer_proposer();
    let release = Call::from(TreasuryCall::ReleaseFunds {
        to: holder(),
        amount: ONE / 4,
    })
    .encode()
    .unwrap();

    let first = dao
        .chain
        .transact(
            deployer(),
            dao.d.timelock,
            0,
            TimelockCall::Schedule {
                target: dao.d.treasury,
                value: 0,
                data: release.clone(),
                predecessor: Hash::ZERO,
                salt: Hash::compute(b"first"),
                delay: 60,
            },
        )
        .unwrap()
        .operation_id()
        .unwrap();
    dao.chain
        .transact(
            deployer(),
            dao.d.timelock,
            0,
            TimelockCall::Schedule {
                target: dao.d.treasury,
                value: 0,
                data: release.clone(),
                predecessor: first,
                salt: Hash::compute(b"second"),
                delay: 60,
            },
        )
        .unwrap();
    dao.chain.increase_time(60);

    let execute_second = TimelockCall::Execute {
        target: dao.d.treasury,
        value: 0,
        data: release.clone(),
        predecessor: first,
        salt: Hash::compute(b"second"),
    };
    let err = dao
        .chain
        .transact(addr(7), dao.d.timelock, 0, execute_second.clone())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Anyone may execute: the zero address holds the executor role
    dao.chain
        .transact(
            addr(7),
            dao.d.timelock,
            0,
            TimelockCall::Execute {
                target: dao.d.treasury,
                value: 0,
                data: release,
                predecessor: Hash::ZERO,
                salt: Hash::compute(b"first"),
            },
        )
        .unwrap();
    dao.chain
        .transact(addr(7), dao.d.timelock, 0, execute_second)
        .unwrap();
    assert_eq!(dao.treasury_funds(), ONE / 2);
}

#[test_log::test]
fn test_reentrant_execute_observes_done() {
    let mut dao = Dao::new();
    dao.make_deployer_proposer();
    let timelock = dao.d.timelock;
    let release = Call::from(TreasuryCall::ReleaseFunds {
        to: holder(),
        amount: ONE / 4,
    })
    .encode()
    .unwrap();

    // Inner operation: a single release
    dao.chain
        .transact(
            deployer(),
            timelock,
            0,
            TimelockCall::Schedule {
                target: dao.d.treasury,
                value: 0,
                data: release.clone(),
                predecessor: Hash::ZERO,
                salt: Hash::ZERO,
                delay: 60,
            },
        )
        .unwrap();
    let inner_id =
        TimelockController::hash_operation(&dao.d.treasury, 0, &release, &Hash::ZERO, &Hash::ZERO);
    let execute_inner = Call::from(TimelockCall::Execute {
        target: dao.d.treasury,
        value: 0,
        data: release,
        predecessor: Hash::ZERO,
        salt: Hash::ZERO,
    })
    .encode()
    .unwrap();

    // Outer operation: executes the inner one twice
    let targets = vec![timelock, timelock];
    let values = vec![0, 0];
    let payloads = vec![execute_inner.clone(), execute_inner];
    dao.chain
        .transact(
            deployer(),
            timelock,
            0,
            TimelockCall::ScheduleBatch {
                targets: targets.clone(),
                values: values.clone(),
                payloads: payloads.clone(),
                predecessor: Hash::ZERO,
                salt: Hash::ZERO,
                delay: 60,
            },
        )
        .unwrap();
    let outer_id = TimelockController::hash_operation_batch(
        &targets,
        &values,
        &payloads,
        &Hash::ZERO,
        &Hash::ZERO,
    );
    dao.chain.increase_time(60);

    let err = dao
        .chain
        .transact(
            addr(7),
            timelock,
            0,
            TimelockCall::ExecuteBatch {
                targets,
                values,
                payloads,
                predecessor: Hash::ZERO,
                salt: Hash::ZERO,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        agora_governance::GovernanceError::UnexpectedOperationState {
            actual: OperationState::Done,
            ..
        }
    ));

    // The whole batch rolled back: nothing executed, nothing released
    let now = dao.chain.timestamp();
    let t = dao.chain.timelock(&timelock).unwrap();
    assert_eq!(t.operation_state(&outer_id, now), OperationState::Ready);
    assert_eq!(t.operation_state(&inner_id, now), OperationState::Ready);
    assert_eq!(dao.treasury_funds(), ONE);
}

#[test_log::test]
fn test_queued_proposal_expires() {
    let mut config = GovernanceConfig::default();
    config.governor.queue_grace_period = Some(100);
    let mut dao = Dao::with_config(config);

    let p = ProposalBatch::release(&dao, 1, "Expiring");
    let id = dao.pass(&p);
    dao.queue(&p).unwrap();

    dao.chain.increase_time(159);
    assert_eq!(dao.state(&id), ProposalState::Queued);
    dao.chain.increase_time(1);
    assert_eq!(dao.state(&id), ProposalState::Expired);

    let err = dao.execute(&p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(!dao.is_released());
}

#[test_log::test]
fn test_cancelled_timelock_operation_cancels_proposal() {
    let mut dao = Dao::new();
    dao.chain
        .transact(
            deployer(),
            dao.d.timelock,
            0,
            TimelockCall::GrantRole {
                role: Role::Canceller,
                account: deployer(),
            },
        )
        .unwrap();

    let p = ProposalBatch::release(&dao, 1, "Vetoed");
    let id = dao.pass(&p);
    let op = dao.queue(&p).unwrap();

    dao.chain
        .transact(deployer(), dao.d.timelock, 0, TimelockCall::Cancel { id: op })
        .unwrap();
    assert_eq!(dao.state(&id), ProposalState::Canceled);

    dao.chain.increase_time(60);
    assert!(dao.execute(&p).is_err());
}

#[test_log::test]
fn test_proposer_cancels_before_voting() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, 1, "Never mind");
    let id = dao.propose(&p).unwrap();

    let cancel = GovernorCall::Cancel {
        targets: p.targets.clone(),
        values: p.values.clone(),
        calldatas: p.calldatas.clone(),
        description_hash: p.description_hash(),
    };
    let err = dao
        .chain
        .transact(addr(9), dao.d.governor, 0, cancel.clone())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    dao.chain.transact(holder(), dao.d.governor, 0, cancel).unwrap();
    assert_eq!(dao.state(&id), ProposalState::Canceled);

    dao.chain.mine(1);
    let err = dao.vote(holder(), id, VoteSupport::For).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test_log::test]
fn test_transfer_moves_future_votes_only() {
    let mut dao = Dao::new();
    dao.delegate(addr(3), addr(3));
    let p = ProposalBatch::release(&dao, 1, "Snapshot");
    let id = dao.propose(&p).unwrap();
    dao.chain.mine(2);

    // After the snapshot the holder hands its unit to addr(3)
    dao.chain
        .transact(
            holder(),
            dao.d.token,
            0,
            TokenCall::TransferFrom {
                from: holder(),
                to: addr(3),
                token_id: 0,
            },
        )
        .unwrap();

    dao.vote(addr(3), id, VoteSupport::Against).unwrap();
    dao.vote(holder(), id, VoteSupport::For).unwrap();
    let governor = dao.chain.governor(&dao.d.governor).unwrap();
    assert_eq!(governor.proposal_votes(&id), Some((0, 1, 0)));

    let now = dao.chain.block_number();
    assert_eq!(dao.chain.get_past_votes(&dao.d.token, &addr(3), now).unwrap(), 1);
    assert_eq!(dao.chain.get_past_votes(&dao.d.token, &holder(), now).unwrap(), 0);
}

#[test_log::test]
fn test_power_moved_in_the_snapshot_block_is_not_counted_twice() {
    let mut dao = Dao::new();
    dao.delegate(addr(3), addr(3));
    let p = ProposalBatch::release(&dao, 1, "Vote in the snapshot block");
    let id = dao.propose(&p).unwrap();
    dao.chain.mine(1);

    let snapshot = dao.chain.governor(&dao.d.governor).unwrap().proposal_snapshot(&id).unwrap();
    assert_eq!(dao.chain.block_number(), snapshot);
    assert_eq!(dao.state(&id), ProposalState::Active);

    dao.vote(holder(), id, VoteSupport::For).unwrap();
    dao.chain
        .transact(
            holder(),
            dao.d.token,
            0,
            TokenCall::TransferFrom {
                from: holder(),
                to: addr(3),
                token_id: 0,
            },
        )
        .unwrap();
    dao.mint(addr(4), 1);
    dao.vote(addr(3), id, VoteSupport::For).unwrap();

    let governor = dao.chain.governor(&dao.d.governor).unwrap();
    assert_eq!(governor.proposal_votes(&id), Some((0, 1, 0)));
    assert_eq!(dao.chain.get_past_votes(&dao.d.token, &holder(), snapshot).unwrap(), 1);
    assert_eq!(dao.chain.get_past_votes(&dao.d.token, &addr(3), snapshot).unwrap(), 0);
    assert_eq!(dao.chain.get_past_total_supply(&dao.d.token, snapshot).unwrap(), 1);

    // The transfer and the mint count from the next block
    dao.chain.mine(1);
    assert_eq!(dao.chain.get_past_votes(&dao.d.token, &addr(3), snapshot + 1).unwrap(), 1);
    assert_eq!(dao.chain.get_past_total_supply(&dao.d.token, snapshot + 1).unwrap(), 2);
}

#[test_log::test]
fn test_quorum_change_leaves_queued_proposal_executable() {
    let mut dao = Dao::new();
    // 25 units in total, the holder's single vote meets a 4% quorum
    for token_id in 1..=24 {
        dao.mint(addr(3), token_id);
    }
    dao.chain.mine(1);

    let release = ProposalBatch::release(&dao, ONE / 2, "Release before the quorum rises");
    let raise = ProposalBatch::single(
        dao.d.governor,
        GovernorCall::UpdateQuorumNumerator { new_numerator: 50 },
        "Raise quorum to half the supply",
    );
    let release_id = dao.pass(&release);
    dao.pass(&raise);
    dao.queue(&release).unwrap();
    dao.queue(&raise).unwrap();
    dao.chain.increase_time(60);

    dao.execute(&raise).unwrap();
    assert_eq!(dao.chain.governor(&dao.d.governor).unwrap().quorum_numerator(), 50);
    assert_eq!(dao.state(&release_id), ProposalState::Queued);

    dao.execute(&release).unwrap();
    assert_eq!(dao.state(&release_id), ProposalState::Executed);
    assert_eq!(dao.treasury_funds(), ONE / 2);

    // New proposals are held to the raised quorum
    let later = ProposalBatch::release(&dao, 1, "After the quorum rose");
    let later_id = dao.propose(&later).unwrap();
    dao.chain.mine(1);
    dao.vote(holder(), later_id, VoteSupport::For).unwrap();
    dao.chain.mine(100);
    assert_eq!(dao.state(&later_id), ProposalState::Defeated);
}

#[test_log::test]
fn test_state_survives_restart() {
    let mut dao = Dao::new();
    let p = ProposalBatch::release(&dao, ONE / 2, "Persisted");
    let id = dao.pass(&p);
    dao.queue(&p).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain").join("state.json");
    dao.chain.save_state(&path).unwrap();

    let mut restored = Dao {
        chain: Chain::load_state(&path).unwrap(),
        d: dao.d,
    };
    assert_eq!(restored.chain.env(), dao.chain.env());
    assert_eq!(restored.state(&id), ProposalState::Queued);
    assert_eq!(restored.chain.logs().len(), dao.chain.logs().len());

    restored.chain.increase_time(60);
    restored.execute(&p).unwrap();
    assert!(restored.is_released());
    assert_eq!(restored.state(&id), ProposalState::Executed);

    // The first chain is untouched
    assert!(!dao.is_released());
}

#[test_log::test]
fn test_load_missing_state_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Chain::load_state(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
}
