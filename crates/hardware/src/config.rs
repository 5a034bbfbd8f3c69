//! Host-supplied configuration, layered over the reset-state defaults.
//!
//! The CLI builds a `Config` from its own flags, or deserializes one from a
//! `--config <path>` JSON file with `serde_json`. Everything this struct
//! doesn't cover keeps the architectural reset values `Cpu::new` applies.

use serde::Deserialize;

use crate::common::constants::{DRAM_BASE, DRAM_SIZE};

/// Simulator configuration: the handful of knobs that sit outside the
/// architectural state itself.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Route UART transmit (`THR` writes) to stderr instead of stdout.
    ///
    /// Tests that want stdout reserved for program output under test set this.
    pub uart_to_stderr: bool,
    /// Size of main memory in bytes.
    pub dram_size: u64,
    /// Program counter at reset.
    pub initial_pc: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uart_to_stderr: false,
            dram_size: DRAM_SIZE,
            initial_pc: DRAM_BASE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reset_state_assumptions() {
        let config = Config::default();
        assert!(!config.uart_to_stderr);
        assert_eq!(config.dram_size, DRAM_SIZE);
        assert_eq!(config.initial_pc, DRAM_BASE);
    }

    #[test]
    fn json_overrides_individual_fields() {
        let config: Config = serde_json::from_str(r#"{"uart_to_stderr": true}"#).unwrap();
        assert!(config.uart_to_stderr);
        assert_eq!(config.dram_size, DRAM_SIZE);
    }

    #[test]
    fn json_can_shrink_dram_for_a_tight_test_image() {
        let config: Config = serde_json::from_str(r#"{"dram_size": 4096}"#).unwrap();
        assert_eq!(config.dram_size, 4096);
        assert!(!config.uart_to_stderr);
    }
}
