//! Role-based access control.
//!
//! A role maps to a set of holder addresses. Each role has an admin role
//! whose holders may grant and revoke it; any holder may renounce a role
//! for itself. Gated entry points call the explicit guards below.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use agora_types::Address;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Roles understood by the timelock controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum Role {
    /// Manages membership of every role
    Admin,
    /// May schedule operations
    Proposer,
    /// May execute ready operations
    Executor,
    /// May cancel pending operations
    Canceller,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "TIMELOCK_ADMIN_ROLE",
            Role::Proposer => "PROPOSER_ROLE",
            Role::Executor => "EXECUTOR_ROLE",
            Role::Canceller => "CANCELLER_ROLE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role membership table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Address>>,
    admins: BTreeMap<Role, Role>,
}

impl AccessControl {
    /// Create an empty table where every role is administered by `Admin`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|holders| holders.contains(account))
            .unwrap_or(false)
    }

    /// Admin role of `role`. Defaults to `Admin`.
    pub fn role_admin(&self, role: Role) -> Role {
        self.admins.get(&role).copied().unwrap_or(Role::Admin)
    }

    pub fn set_role_admin(&mut self, role: Role, admin: Role) {
        self.admins.insert(role, admin);
    }

    /// Holders of `role`, in address order.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fail unless `account` holds `role`.
    pub fn check_role(&self, role: Role, account: &Address) -> Result<(), GovernanceError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(GovernanceError::MissingRole {
                account: *account,
                role,
            })
        }
    }

    /// Like `check_role`, but passes everyone when the zero address holds `role`.
    pub fn check_role_or_open(&self, role: Role, account: &Address) -> Result<(), GovernanceError> {
        if self.has_role(role, &Address::ZERO) {
            return Ok(());
        }
        self.check_role(role, account)
    }

    /// Grant without an authorization check. Used during construction.
    /// Returns whether membership changed.
    pub fn setup_role(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Grant `role` to `account`; `caller` must hold the role's admin role.
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<bool, GovernanceError> {
        self.check_role(self.role_admin(role), caller)?;
        Ok(self.setup_role(role, account))
    }

    /// Revoke `role` from `account`; `caller` must hold the role's admin role.
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<bool, GovernanceError> {
        self.check_role(self.role_admin(role), caller)?;
        Ok(self.remove(role, account))
    }

    /// Give up `role`. Only ever allowed for the caller's own membership.
    pub fn renounce_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<bool, GovernanceError> {
        if caller != account {
            return Err(GovernanceError::Unauthorized(format!(
                "{} can only renounce {} for itself, not for {}",
                caller, role, account
            )));
        }
        Ok(self.remove(role, account))
    }

    fn remove(&mut self, role: Role, account: &Address) -> bool {
        match self.members.get_mut(&role) {
            Some(holders) => holders.remove(account),
            None => false,
        }
    }
}
