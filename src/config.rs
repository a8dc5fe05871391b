//! Responder configuration.
//!
//! Read from a JSON file; every field is optional.
//!
//! ```
//! use taolst::config::ResponderConfig;
//! use taolst::reply::UnknownOpcodePolicy;
//!
//! let config = ResponderConfig::from_json(
//!     r#"{ "device": { "boot_mode": true }, "unknown_opcode": "nack" }"#,
//! )
//! .unwrap();
//! assert!(config.device.boot_mode);
//! assert_eq!(config.max_reboot_delay, 1000);
//! assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Nack);
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::reply::{DeviceState, ReplyGenerator, UnknownOpcodePolicy, DEFAULT_MAX_REBOOT_DELAY};

/// Settings for a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Device flags.
    pub device: DeviceState,
    /// Largest reboot delay acknowledged.
    pub max_reboot_delay: u32,
    /// Handling of opcodes without a reply handler.
    pub unknown_opcode: UnknownOpcodePolicy,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            device: DeviceState::default(),
            max_reboot_delay: DEFAULT_MAX_REBOOT_DELAY,
            unknown_opcode: UnknownOpcodePolicy::default(),
        }
    }
}

impl ResponderConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reply generator with these limits and policies.
    pub fn generator(&self) -> ReplyGenerator {
        ReplyGenerator::new()
            .with_max_reboot_delay(self.max_reboot_delay)
            .with_unknown_opcode(self.unknown_opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaolstError;

    #[test]
    fn test_defaults() {
        let config = ResponderConfig::from_json("{}").unwrap();
        assert_eq!(config, ResponderConfig::default());
        assert_eq!(config.max_reboot_delay, 1000);
        assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Silent);
        assert!(!config.device.boot_mode);
    }

    #[test]
    fn test_full_config() {
        let config = ResponderConfig::from_json(
            r#"{
                "device": { "boot_mode": true, "flash_write_ok": true, "time_set": true },
                "max_reboot_delay": 250,
                "unknown_opcode": "nack"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.device,
            DeviceState::new()
                .with_boot_mode(true)
                .with_flash_write_ok(true)
                .with_time_set(true)
        );
        assert_eq!(config.max_reboot_delay, 250);

        let generator = config.generator();
        assert_eq!(generator.max_reboot_delay(), 250);
        assert_eq!(generator.unknown_opcode(), UnknownOpcodePolicy::Nack);
    }

    #[test]
    fn test_invalid_json() {
        let result = ResponderConfig::from_json(r#"{ "unknown_opcode": "shout" }"#);
        assert!(matches!(result, Err(TaolstError::Json(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let config = ResponderConfig::load("/nonexistent/taolst/config.json").unwrap();
        assert_eq!(config, ResponderConfig::default());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("taolst-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "max_reboot_delay": 5 }"#).unwrap();

        let config = ResponderConfig::load(&path).unwrap();
        assert_eq!(config.max_reboot_delay, 5);

        std::fs::remove_file(&path).unwrap();
    }
}
