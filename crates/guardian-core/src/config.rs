//! # Engine Configuration
//!
//! Chain binding, time lock and capacity limits for a [`GuardEngine`].
//!
//! [`GuardEngine`]: crate::service::GuardEngine

use crate::domain::{Address, GuardError, StoreLimits, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};

/// Guard engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain id envelopes must be bound to.
    pub chain_id: u64,
    /// The engine's own identity. Self-targeted calls run engine operations.
    pub contract_address: Address,
    /// Delay between a time-delay request and its approval, in seconds.
    pub time_lock_period_secs: u64,
    /// Maximum actions per configuration batch.
    pub max_batch_size: usize,
    /// Maximum number of roles, protected roles included.
    pub max_roles: usize,
    /// Maximum number of function schemas, engine schemas included.
    pub max_functions: usize,
    /// Member capacity of the owner, broadcaster and recovery roles.
    pub protected_role_max_wallets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            contract_address: [0x6a; 20],
            time_lock_period_secs: 86_400, // 1 day
            max_batch_size: 64,
            max_roles: 1000,
            max_functions: 1000,
            protected_role_max_wallets: 1,
        }
    }
}

impl EngineConfig {
    /// Creates a minimal config for testing.
    pub fn for_testing() -> Self {
        Self {
            chain_id: 31337,
            time_lock_period_secs: 3600, // 1 hour
            max_batch_size: 16,
            max_roles: 32,
            max_functions: 64,
            ..Default::default()
        }
    }

    /// Load a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GuardError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GuardError::InvalidArgument(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GuardError> {
        if self.contract_address == ZERO_ADDRESS {
            return Err(GuardError::ZeroAddress);
        }
        let zero_fields = [
            ("chain_id", self.chain_id == 0),
            ("time_lock_period_secs", self.time_lock_period_secs == 0),
            ("max_batch_size", self.max_batch_size == 0),
            ("max_roles", self.max_roles == 0),
            ("max_functions", self.max_functions == 0),
            ("protected_role_max_wallets", self.protected_role_max_wallets == 0),
        ];
        if let Some((name, _)) = zero_fields.iter().find(|(_, is_zero)| *is_zero) {
            return Err(GuardError::InvalidArgument(format!("{name} must be non-zero")));
        }
        Ok(())
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_roles: self.max_roles,
            max_functions: self.max_functions,
            protected_role_max_wallets: self.protected_role_max_wallets,
        }
    }
}
