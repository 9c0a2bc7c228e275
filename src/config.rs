/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Mixer configuration.
//!
//! Configuration is TOML, and every field is optional:
//!
//!```toml
//!pool_ttl_secs = 86400
//!cleanup_interval_secs = 60
//!closed_pool_retention_secs = 86400
//!fee_basis_points = 10
//!min_ring_size = 2
//!max_outputs = 16
//!
//![default_delay_range]
//!min_ms = 1000
//!max_ms = 30000
//!```

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::pool::DelayRange;

///One day, the lifetime of a pool unless configured otherwise.
pub const DEFAULT_POOL_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CLOSED_POOL_RETENTION_SECS: u64 = 24 * 60 * 60;
///0.1%
pub const DEFAULT_FEE_BASIS_POINTS: u16 = 10;
pub const DEFAULT_MIN_RING_SIZE: usize = 2;
pub const DEFAULT_MAX_OUTPUTS: usize = 16;

///Settings shared by every pool a manager creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    ///How long a pool stays open before the sweep expires it.
    pub pool_ttl_secs: u64,
    ///How often the background sweep runs.
    pub cleanup_interval_secs: u64,
    ///How long completed and expired pools stay queryable before the sweep forgets them.
    pub closed_pool_retention_secs: u64,
    ///Fee kept by the pool, in hundredths of a percent of each mixed amount.
    pub fee_basis_points: u16,
    ///Smallest ring a pool accepts, never less than 2.
    pub min_ring_size: usize,
    ///Largest number of output addresses per request.
    pub max_outputs: usize,
    ///Delay range used by requests which do not bring their own.
    pub default_delay_range: DelayRange

} impl Default for MixerConfig {
    fn default() -> Self {
        return Self{
            pool_ttl_secs: DEFAULT_POOL_TTL_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            closed_pool_retention_secs: DEFAULT_CLOSED_POOL_RETENTION_SECS,
            fee_basis_points: DEFAULT_FEE_BASIS_POINTS,
            min_ring_size: DEFAULT_MIN_RING_SIZE,
            max_outputs: DEFAULT_MAX_OUTPUTS,
            default_delay_range: DelayRange::default()
        }
    }

} impl MixerConfig {
    ///Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        return Ok(config)
    }

    ///Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded mixer configuration from {}", path.display());
        return Ok(config)
    }

    ///Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        return toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    ///Reject settings no pool could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_ttl_secs == 0 {
            return Err(ConfigError::Invalid("pool_ttl_secs must be positive".into()))
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid("cleanup_interval_secs must be positive".into()))
        }
        if self.fee_basis_points >= 10_000 {
            return Err(ConfigError::Invalid("fee_basis_points must be below 10000".into()))
        }
        if self.min_ring_size < 2 {
            return Err(ConfigError::Invalid("min_ring_size must be at least 2".into()))
        }
        if self.max_outputs == 0 {
            return Err(ConfigError::Invalid("max_outputs must be positive".into()))
        }
        if !self.default_delay_range.is_valid() {
            return Err(ConfigError::Invalid("default_delay_range must have min_ms <= max_ms".into()))
        }
        return Ok(())
    }

    ///Pool lifetime in milliseconds.
    pub fn pool_ttl_ms(&self) -> u64 {
        return self.pool_ttl_secs.saturating_mul(1000)
    }

    pub fn closed_pool_retention_ms(&self) -> u64 {
        return self.closed_pool_retention_secs.saturating_mul(1000)
    }

    pub fn cleanup_interval(&self) -> Duration {
        return Duration::from_secs(self.cleanup_interval_secs)
    }
}
