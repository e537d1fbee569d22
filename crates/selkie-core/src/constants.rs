//! TigerStyle constants for Selkie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Mailbox Limits
// =============================================================================

/// Maximum depth of the user lane of a mailbox
pub const MAILBOX_USER_DEPTH_MAX: usize = 1024;

/// Maximum depth of the system lane of a mailbox
///
/// The system lane carries link, monitor, exit, and shutdown traffic only.
/// It is kept shallow so a flooded user lane cannot starve supervision.
pub const MAILBOX_SYSTEM_DEPTH_MAX: usize = 64;

// =============================================================================
// Supervisor Limits
// =============================================================================

/// Maximum length of a child spec ID in bytes
pub const CHILD_ID_LENGTH_BYTES_MAX: usize = 256;

/// Maximum number of child specs per supervisor
pub const SUPERVISOR_CHILDREN_COUNT_MAX: usize = 1024;

/// Default restart intensity: restarts tolerated within the period
pub const SUPERVISOR_MAX_RESTARTS_DEFAULT: u32 = 3;

/// Default restart intensity window in milliseconds (5 sec)
pub const SUPERVISOR_RESTART_PERIOD_MS_DEFAULT: u64 = 5 * 1000;

/// Default timeout for a supervisor call in milliseconds (5 sec)
pub const SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT: u64 = 5 * 1000;

/// Timeout for a supervisor to finish starting its children in milliseconds (10 sec)
pub const SUPERVISOR_START_TIMEOUT_MS: u64 = 10 * 1000;

/// Default grace period before a child is force-killed on shutdown (5 sec)
pub const CHILD_SHUTDOWN_GRACE_MS_DEFAULT: u64 = 5 * 1000;

// Compile-time assertions for constant validity
const _: () = {
    assert!(MAILBOX_USER_DEPTH_MAX >= 16);
    assert!(MAILBOX_SYSTEM_DEPTH_MAX >= 8);
    assert!(MAILBOX_SYSTEM_DEPTH_MAX <= MAILBOX_USER_DEPTH_MAX);
    assert!(CHILD_ID_LENGTH_BYTES_MAX >= 64);
    assert!(SUPERVISOR_MAX_RESTARTS_DEFAULT >= 1);
    assert!(SUPERVISOR_RESTART_PERIOD_MS_DEFAULT >= 1000);
    assert!(SUPERVISOR_START_TIMEOUT_MS >= SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_lane_shallower_than_user_lane() {
        assert!(MAILBOX_SYSTEM_DEPTH_MAX <= MAILBOX_USER_DEPTH_MAX);
    }

    #[test]
    fn test_limits_have_units_in_names() {
        // This test documents the naming convention
        // All byte limits end in _BYTES_
        // All time limits end in _MS_
        // All count limits end in _COUNT_
        let _: usize = CHILD_ID_LENGTH_BYTES_MAX;
        let _: u64 = SUPERVISOR_RESTART_PERIOD_MS_DEFAULT;
        let _: usize = SUPERVISOR_CHILDREN_COUNT_MAX;
    }
}
