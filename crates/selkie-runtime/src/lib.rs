//! Selkie Runtime
//!
//! Single-node actor runtime: tokio-task actors with two-lane mailboxes,
//! links, monitors, exit propagation, and OTP-style supervision trees.
//!
//! # Overview
//!
//! An actor is an async function given an [`ActorContext`]. It receives
//! [`Message`]s from its mailbox and is addressed through a cheap, cloneable
//! [`Pid`]. Actors relate to each other through links (symmetric fate sharing)
//! and monitors (one-way observation), and supervisors restart faulted
//! children according to a declared strategy.
//!
//! ```rust,ignore
//! use selkie_runtime::{spawn, send, Message};
//!
//! let pid = spawn(|mut ctx| async move {
//!     while let Some(message) = ctx.receive().await {
//!         if let Message::User(payload) = message {
//!             if let Ok(n) = payload.downcast::<u64>() {
//!                 tracing::info!(n = *n, "got number");
//!             }
//!         }
//!     }
//! });
//! send(&pid, 42u64).await;
//! ```

mod context;
mod future;
mod mailbox;
mod pid;
mod spawn;
mod sysmsg;

pub mod supervisor;

pub use context::ActorContext;
pub use future::ReplyFuture;
pub use mailbox::AnyMessage;
pub use pid::{ActorRole, Pid};
pub use spawn::{send, spawn, spawn_with_config, try_send};
pub use sysmsg::{Exit, ExitReason, Message, Relation};
