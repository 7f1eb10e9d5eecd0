//! Interface timing and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and retry parameters of the send state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Retransmissions allowed before a message is abandoned (the budget
    /// counts down through zero, so the total is one more than this value)
    pub retry_budget: i32,
    /// Bus speed in bits per second
    pub bit_rate: u32,
    /// Bits on the wire per byte (start, eight data, stop)
    pub bits_per_byte: u32,
    /// Multiplier applied to the nominal wire time
    pub safety_margin: f64,
    /// Length of the acknowledgment frame awaited after an echo
    pub ack_wait_bytes: usize,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            retry_budget: 10,
            bit_rate: 16_660,
            bits_per_byte: 10,
            safety_margin: 3.0,
            ack_wait_bytes: 4,
        }
    }
}

impl InterfaceConfig {
    /// Deadline for `bytes` to cross the bus.
    pub fn timeout_for(&self, bytes: usize) -> Duration {
        let bits = (bytes as u64 * self.bits_per_byte as u64) as f64;
        let seconds = bits / self.bit_rate.max(1) as f64 * self.safety_margin;
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        let config = InterfaceConfig::default();
        let timeout = config.timeout_for(4);
        let expected = 40.0 / 16660.0 * 3.0;
        assert!((timeout.as_secs_f64() - expected).abs() < 1e-9);
        assert!(config.timeout_for(14) > timeout);
        assert_eq!(config.timeout_for(0), Duration::ZERO);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: InterfaceConfig = serde_json::from_str(r#"{"retry_budget": 3}"#).unwrap();
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.bit_rate, 16_660);
        assert_eq!(config.ack_wait_bytes, 4);
    }
}
