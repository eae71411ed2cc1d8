//! Treasury: fund custody with a single owner-gated withdrawal.
//!
//! `total_funds` is an accounting ledger kept next to the native balance the
//! chain holds for the treasury address. The chain moves the native value;
//! the treasury only authorizes and books it.

use agora_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasury {
    address: Address,
    owner: Address,
    total_funds: u128,
    /// Set by the first successful release and never cleared
    is_released: bool,
}

impl Treasury {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            total_funds: 0,
            is_released: false,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_funds(&self) -> u128 {
        self.total_funds
    }

    pub fn is_released(&self) -> bool {
        self.is_released
    }

    /// Book an inbound transfer. Accepted from anyone.
    pub fn receive(&mut self, from: &Address, amount: u128) -> Result<(), GovernanceError> {
        self.total_funds = self.total_funds.checked_add(amount).ok_or_else(|| {
            GovernanceError::InvalidInput(format!("deposit of {} from {} overflows", amount, from))
        })?;
        tracing::debug!("Treasury received {} from {}", amount, from);
        Ok(())
    }

    /// Authorize and book a withdrawal of `amount` to `to`.
    ///
    /// # Errors
    /// - caller is not the owner
    /// - `amount` exceeds `total_funds`
    pub fn release_funds(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), GovernanceError> {
        self.only_owner(caller)?;

        self.total_funds = self.total_funds.checked_sub(amount).ok_or(
            GovernanceError::InsufficientFunds {
                account: self.address,
                requested: amount,
                available: self.total_funds,
            },
        )?;
        self.is_released = true;

        tracing::info!("Treasury released {} to {}", amount, to);
        Ok(())
    }

    /// Hand the treasury to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, GovernanceError> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(GovernanceError::InvalidInput("new owner is the zero address".into()));
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        tracing::info!("Treasury ownership transferred from {} to {}", previous, new_owner);
        Ok(previous)
    }

    fn only_owner(&self, caller: &Address) -> Result<(), GovernanceError> {
        if caller != &self.owner {
            return Err(GovernanceError::Unauthorized(format!(
                "caller {} is not the treasury owner {}",
                caller, self.owner
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn funded() -> Treasury {
        let mut treasury = Treasury::new(addr(80), addr(1));
        treasury.receive(&addr(1), ONE).unwrap();
        treasury
    }

    #[test]
    fn test_owner_releases() {
        let mut treasury = funded();
        assert!(!treasury.is_released());

        treasury.release_funds(&addr(1), &addr(2), ONE / 2).unwrap();
        assert_eq!(treasury.total_funds(), ONE / 2);
        assert!(treasury.is_released());
    }

    #[test]
    fn test_non_owner_release_leaves_state_unchanged() {
        let mut treasury = funded();
        let err = treasury.release_funds(&addr(2), &addr(2), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(treasury.total_funds(), ONE);
        assert!(!treasury.is_released());
    }

    #[test]
    fn test_overdraw() {
        let mut treasury = funded();
        let err = treasury.release_funds(&addr(1), &addr(2), ONE + 1).unwrap_err();
        assert_eq!(
            err,
            GovernanceError::InsufficientFunds {
                account: addr(80),
                requested: ONE + 1,
                available: ONE,
            }
        );
        assert!(!treasury.is_released());
    }

    #[test]
    fn test_released_marker_is_sticky() {
        let mut treasury = funded();
        treasury.release_funds(&addr(1), &addr(2), 0).unwrap();
        assert!(treasury.is_released());
        treasury.receive(&addr(3), 5).unwrap();
        assert!(treasury.is_released());
    }

    #[test]
    fn test_transfer_ownership() {
        let mut treasury = funded();
        assert!(treasury.transfer_ownership(&addr(2), addr(3)).is_err());
        assert!(treasury.transfer_ownership(&addr(1), Address::ZERO).is_err());

        assert_eq!(treasury.transfer_ownership(&addr(1), addr(50)).unwrap(), addr(1));
        assert_eq!(treasury.owner(), addr(50));
        // The old owner lost its rights
        assert!(treasury.release_funds(&addr(1), &addr(1), 1).is_err());
    }
}
