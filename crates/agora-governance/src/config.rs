//! Deployment configuration.
//!
//! Loaded from TOML. Every section and key is optional and falls back to
//! the default deployment values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::governor::{GovernorSettings, QUORUM_DENOMINATOR};

/// Full governance deployment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub token: TokenConfig,
    pub governor: GovernorConfig,
    pub timelock: TimelockConfig,
    pub treasury: TreasuryConfig,
    pub wiring: WiringConfig,
}

/// Voting token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "DAOTOKEN".to_string(),
            symbol: "DAOT".to_string(),
        }
    }
}

/// Governor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub name: String,
    /// Blocks
    pub voting_delay: u64,
    /// Blocks
    pub voting_period: u64,
    pub proposal_threshold: u64,
    /// Percent of total supply
    pub quorum_numerator: u64,
    /// Seconds; absent means queued proposals never expire
    pub queue_grace_period: Option<u64>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        let settings = GovernorSettings::default();
        Self {
            name: "MyGovernor".to_string(),
            voting_delay: settings.voting_delay,
            voting_period: settings.voting_period,
            proposal_threshold: settings.proposal_threshold,
            quorum_numerator: settings.quorum_numerator,
            queue_grace_period: settings.queue_grace_period,
        }
    }
}

impl GovernorConfig {
    pub fn settings(&self) -> GovernorSettings {
        GovernorSettings {
            voting_delay: self.voting_delay,
            voting_period: self.voting_period,
            proposal_threshold: self.proposal_threshold,
            quorum_numerator: self.quorum_numerator,
            queue_grace_period: self.queue_grace_period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelockConfig {
    /// Seconds
    pub min_delay: u64,
}

impl Default for TimelockConfig {
    fn default() -> Self {
        Self { min_delay: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryConfig {
    /// Base units moved from the deployer into the treasury
    pub initial_funds: u64,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            initial_funds: 1_000_000_000_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Drop the deployer's timelock admin role once wiring is done
    pub revoke_deployer_admin: bool,
}

impl GovernanceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, GovernanceError> {
        let config: GovernanceConfig =
            toml::from_str(contents).map_err(|e| GovernanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GovernanceError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.governor.voting_period == 0 {
            return Err(GovernanceError::Config("governor.voting_period must be non-zero".into()));
        }
        if self.governor.quorum_numerator > QUORUM_DENOMINATOR {
            return Err(GovernanceError::Config(format!(
                "governor.quorum_numerator {} exceeds {}",
                self.governor.quorum_numerator, QUORUM_DENOMINATOR
            )));
        }
        if self.token.symbol.is_empty() {
            return Err(GovernanceError::Config("token.symbol must not be empty".into()));
        }
        Ok(())
    }
}
