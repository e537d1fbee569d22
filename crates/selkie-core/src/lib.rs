//! Selkie Core
//!
//! Core errors, constants, and configuration for the Selkie actor runtime.
//!
//! # Overview
//!
//! Selkie is a single-node actor runtime in the OTP tradition: actors own a
//! mailbox, talk through asynchronous message passing, and are organized into
//! supervision trees that restart them when they fault.
//!
//! # TigerStyle
//!
//! This crate follows [TigerStyle](https://github.com/tigerbeetle/tigerbeetle/blob/main/docs/TIGER_STYLE.md)
//! engineering principles:
//! - Safety > Performance > Developer Experience
//! - Explicit limits with big-endian naming (e.g., `MAILBOX_USER_DEPTH_MAX`)
//! - Compile-time checks on limit relationships

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;

pub use config::{MailboxConfig, RuntimeConfig, SupervisorConfig};
pub use constants::*;
pub use error::{Error, Result};
pub use telemetry::{init_telemetry, TelemetryConfig};
