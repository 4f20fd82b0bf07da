//! Device configuration
//!
//! Every field has a default, so a configuration file only needs to list the
//! values it changes:
//!
//! ```json
//! { "poll_timeout_ms": 500, "nfcid1": [8, 1, 2, 3] }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wait for a poll response, in milliseconds
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1000;

/// Default delay between two poll attempts, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;

/// Default wait for a select response, in milliseconds
pub const DEFAULT_SELECT_TIMEOUT_MS: u64 = 1000;

/// Timing and identity of an emulated T4AT device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// How long the poller waits for an NFC-A poll response
    pub poll_timeout_ms: u64,
    /// Pause between poll attempts
    pub poll_interval_ms: u64,
    /// How long the poller waits for the select response
    pub select_timeout_ms: u64,
    /// ATS returned by the listener when selected
    pub rats_response: Vec<u8>,
    /// Fixed tag identifier; a random one is generated when absent
    pub nfcid1: Option<Vec<u8>>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            select_timeout_ms: DEFAULT_SELECT_TIMEOUT_MS,
            rats_response: vec![0x02, 0x00],
            nfcid1: None,
        }
    }
}

impl DeviceConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn select_timeout(&self) -> Duration {
        Duration::from_millis(self.select_timeout_ms)
    }
}
