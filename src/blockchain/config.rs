use std::env;

use thiserror::Error;

/// Environment variable overriding the proof-of-work difficulty
pub const DIFFICULTY_ENV: &str = "LEDGER_DIFFICULTY";

/// Environment variable overriding the mining reward
pub const MINING_REWARD_ENV: &str = "LEDGER_MINING_REWARD";

pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_MINING_REWARD: f64 = 100.0;

/// Length of a hex-encoded SHA-256 digest; no hash can have more leading zeros
pub const MAX_DIFFICULTY: usize = 64;

/// Errors raised by an unusable chain configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Difficulty must be between 1 and {}, got {}", MAX_DIFFICULTY, .0)]
    InvalidDifficulty(usize),

    #[error("Mining reward must be a finite, non-negative number, got {0}")]
    InvalidMiningReward(f64),

    #[error("Cannot parse {name}={value}")]
    Unparsable { name: &'static str, value: String },
}

/// Parameters fixed for the lifetime of a chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainConfig {
    /// Number of leading zero characters a block hash must have
    pub difficulty: usize,

    /// Amount credited to the miner of each block
    pub mining_reward: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
        }
    }
}

impl ChainConfig {
    pub fn new(difficulty: usize, mining_reward: f64) -> Self {
        ChainConfig {
            difficulty,
            mining_reward,
        }
    }

    /// Builds a configuration from the defaults, overridden by
    /// `LEDGER_DIFFICULTY` and `LEDGER_MINING_REWARD` when set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = ChainConfig::default();

        if let Some(value) = lookup(DIFFICULTY_ENV) {
            config.difficulty = value.trim().parse().map_err(|_| ConfigError::Unparsable {
                name: DIFFICULTY_ENV,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(MINING_REWARD_ENV) {
            config.mining_reward = value.trim().parse().map_err(|_| ConfigError::Unparsable {
                name: MINING_REWARD_ENV,
                value: value.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects difficulties that could never be met and unusable rewards
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty(self.difficulty));
        }

        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ConfigError::InvalidMiningReward(self.mining_reward));
        }

        Ok(())
    }
}
