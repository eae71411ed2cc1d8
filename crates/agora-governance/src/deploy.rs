//! Initial wiring of a governance deployment.

use agora_types::Address;

use crate::access::Role;
use crate::calldata::{TimelockCall, TreasuryCall};
use crate::chain::Chain;
use crate::config::GovernanceConfig;
use crate::error::GovernanceError;

/// Addresses of a wired governance system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub token: Address,
    pub timelock: Address,
    pub governor: Address,
    pub treasury: Address,
}

impl Deployment {
    /// Deploy and wire token, timelock, governor and treasury from `deployer`.
    ///
    /// The governor becomes the timelock's only proposer, execution is open
    /// to anyone, and the treasury ends up owned by the timelock. The
    /// deployer must hold at least `treasury.initial_funds`. Nothing is
    /// deployed if any step fails.
    pub fn deploy(
        chain: &mut Chain,
        deployer: Address,
        config: &GovernanceConfig,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;

        let (token, timelock, governor, treasury) = chain.atomically(|chain| {
            let token = chain.deploy_voting_token(deployer, &config.token.name, &config.token.symbol);
            let timelock = chain.deploy_timelock(
                deployer,
                config.timelock.min_delay,
                &[],
                &[],
                Some(deployer),
            );
            let governor = chain.deploy_governor(
                deployer,
                &config.governor.name,
                token,
                timelock,
                config.governor.settings(),
            )?;

            chain.transact(
                deployer,
                timelock,
                0,
                TimelockCall::GrantRole {
                    role: Role::Proposer,
                    account: governor,
                },
            )?;
            chain.transact(
                deployer,
                timelock,
                0,
                TimelockCall::GrantRole {
                    role: Role::Executor,
                    account: Address::ZERO,
                },
            )?;

            let treasury = chain.deploy_treasury(deployer, u128::from(config.treasury.initial_funds))?;
            chain.transact(
                deployer,
                treasury,
                0,
                TreasuryCall::TransferOwnership { new_owner: timelock },
            )?;

            if config.wiring.revoke_deployer_admin {
                chain.transact(
                    deployer,
                    timelock,
                    0,
                    TimelockCall::RevokeRole {
                        role: Role::Admin,
                        account: deployer,
                    },
                )?;
            }
            Ok((token, timelock, governor, treasury))
        })?;

        tracing::info!(
            "Governance deployed: token {}, timelock {}, governor {}, treasury {}",
            token,
            timelock,
            governor,
            treasury
        );
        Ok(Self {
            token,
            timelock,
            governor,
            treasury,
        })
    }
}
