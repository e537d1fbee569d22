//! Configuration for Selkie
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for the Selkie runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Mailbox configuration
    #[serde(default)]
    pub mailbox: MailboxConfig,

    /// Supervisor configuration
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

impl RuntimeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.mailbox.validate()?;
        self.supervisor.validate()?;
        Ok(())
    }
}

/// Mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Depth of the user lane
    #[serde(default = "default_user_depth")]
    pub user_depth: usize,

    /// Depth of the system lane
    #[serde(default = "default_system_depth")]
    pub system_depth: usize,
}

fn default_user_depth() -> usize {
    MAILBOX_USER_DEPTH_MAX
}

fn default_system_depth() -> usize {
    MAILBOX_SYSTEM_DEPTH_MAX
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            user_depth: default_user_depth(),
            system_depth: default_system_depth(),
        }
    }
}

impl MailboxConfig {
    fn validate(&self) -> Result<()> {
        if self.user_depth == 0 {
            return Err(Error::InvalidConfiguration {
                field: "mailbox.user_depth".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.user_depth > MAILBOX_USER_DEPTH_MAX {
            return Err(Error::InvalidConfiguration {
                field: "mailbox.user_depth".into(),
                reason: format!("{} exceeds limit {}", self.user_depth, MAILBOX_USER_DEPTH_MAX),
            });
        }

        if self.system_depth == 0 {
            return Err(Error::InvalidConfiguration {
                field: "mailbox.system_depth".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.system_depth > MAILBOX_SYSTEM_DEPTH_MAX {
            return Err(Error::InvalidConfiguration {
                field: "mailbox.system_depth".into(),
                reason: format!(
                    "{} exceeds limit {}",
                    self.system_depth, MAILBOX_SYSTEM_DEPTH_MAX
                ),
            });
        }

        Ok(())
    }
}

/// Supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Timeout for supervisor calls (milliseconds)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Grace period before a child is force-killed on shutdown (milliseconds)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_call_timeout_ms() -> u64 {
    SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT
}

fn default_shutdown_grace_ms() -> u64 {
    CHILD_SHUTDOWN_GRACE_MS_DEFAULT
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl SupervisorConfig {
    fn validate(&self) -> Result<()> {
        if self.call_timeout_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "supervisor.call_timeout_ms".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_depth_mailbox_rejected() {
        let mut config = RuntimeConfig::default();
        config.mailbox.user_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_mailbox_rejected() {
        let mut config = RuntimeConfig::default();
        config.mailbox.system_depth = MAILBOX_SYSTEM_DEPTH_MAX + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"mailbox": {"user_depth": 64}}"#).unwrap();
        assert_eq!(config.mailbox.user_depth, 64);
        assert_eq!(config.mailbox.system_depth, MAILBOX_SYSTEM_DEPTH_MAX);
        assert_eq!(
            config.supervisor.call_timeout_ms,
            SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT
        );
        assert!(config.validate().is_ok());
    }
}
