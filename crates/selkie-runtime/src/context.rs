//! Actor context and the system-message interceptor
//!
//! The context is handed to an actor's body and is its whole window onto the
//! runtime: receiving, linking, monitoring, and spawning related actors.
//! System messages never reach user code raw; `receive` intercepts each one
//! and either mutates bookkeeping, forwards a [`Message`], or terminates the
//! actor on the spot.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use selkie_core::config::RuntimeConfig;

use crate::mailbox::{Mailbox, Received};
use crate::pid::{ActorRole, Pid};
use crate::spawn::{self, SpawnOptions};
use crate::sysmsg::{Exit, ExitReason, Message, Relation, SystemMessage};

/// Shared per-actor bookkeeping
///
/// One cell per actor, shared between the context (owned by the actor's
/// body) and the termination wrapper that outlives it.
pub(crate) struct ActorCell {
    pid: Pid,
    trap_exit: AtomicBool,
    links: Mutex<HashSet<Pid>>,
    monitors: Mutex<HashSet<Pid>>,
    // Written by the interceptor or `exit` before cancelling the task, read
    // once by the termination wrapper to classify the death.
    pending_exit: Mutex<Option<Exit>>,
}

impl ActorCell {
    pub(crate) fn new(pid: Pid, trap_exit: bool) -> Self {
        Self {
            pid,
            trap_exit: AtomicBool::new(trap_exit),
            links: Mutex::new(HashSet::new()),
            monitors: Mutex::new(HashSet::new()),
            pending_exit: Mutex::new(None),
        }
    }

    pub(crate) fn pid(&self) -> &Pid {
        &self.pid
    }

    pub(crate) fn is_trapping(&self) -> bool {
        self.trap_exit.load(Ordering::Acquire)
    }

    pub(crate) fn set_trap_exit(&self, trap: bool) {
        self.trap_exit.store(trap, Ordering::Release);
    }

    pub(crate) fn add_link(&self, peer: Pid) {
        self.links.lock().unwrap().insert(peer);
    }

    pub(crate) fn remove_link(&self, peer: &Pid) {
        self.links.lock().unwrap().remove(peer);
    }

    pub(crate) fn add_monitor(&self, watcher: Pid) {
        self.monitors.lock().unwrap().insert(watcher);
    }

    pub(crate) fn remove_monitor(&self, watcher: &Pid) {
        self.monitors.lock().unwrap().remove(watcher);
    }

    pub(crate) fn snapshot_links(&self) -> Vec<Pid> {
        self.links.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn snapshot_monitors(&self) -> Vec<Pid> {
        self.monitors.lock().unwrap().iter().cloned().collect()
    }

    pub(crate) fn set_pending_exit(&self, exit: Exit) {
        let mut pending = self.pending_exit.lock().unwrap();
        if pending.is_none() {
            *pending = Some(exit);
        }
    }

    pub(crate) fn take_pending_exit(&self) -> Option<Exit> {
        self.pending_exit.lock().unwrap().take()
    }
}

/// What the interceptor decided to do with one system message
enum Verdict {
    /// Surface this to user code
    Forward(Message),
    /// Bookkeeping only, keep receiving
    Handled,
    /// The actor dies now with this exit record
    Terminate(Exit),
}

/// An actor's window onto the runtime, owned by its body
pub struct ActorContext {
    cell: Arc<ActorCell>,
    mailbox: Mailbox,
    config: RuntimeConfig,
}

impl ActorContext {
    pub(crate) fn new(cell: Arc<ActorCell>, mailbox: Mailbox, config: RuntimeConfig) -> Self {
        Self {
            cell,
            mailbox,
            config,
        }
    }

    /// This actor's own pid
    pub fn pid(&self) -> &Pid {
        self.cell.pid()
    }

    /// Token cancelled when this actor is asked to stop
    ///
    /// Long computations that do not go through `receive` can select on
    /// this to stay responsive to shutdown.
    pub fn cancellation(&self) -> CancellationToken {
        self.cell.pid().cancellation()
    }

    /// Turn exit trapping on or off
    ///
    /// A trapping actor observes linked-peer deaths and shutdown requests
    /// as ordinary [`Message::Exit`] / [`Message::Shutdown`] messages
    /// instead of dying with them.
    pub fn trap_exit(&self, trap: bool) {
        self.cell.set_trap_exit(trap);
    }

    pub fn is_trapping(&self) -> bool {
        self.cell.is_trapping()
    }

    /// Link this actor with `target`, symmetrically
    ///
    /// Linking to an already-dead pid is a silent no-op on the peer side;
    /// no exit signal will ever arrive from it.
    pub async fn link(&self, target: &Pid) {
        target
            .send_system(SystemMessage::Link {
                to: self.pid().clone(),
                revert: false,
            })
            .await;
        self.cell.add_link(target.clone());
    }

    /// Dissolve a link with `target`, symmetrically
    pub async fn unlink(&self, target: &Pid) {
        target
            .send_system(SystemMessage::Link {
                to: self.pid().clone(),
                revert: true,
            })
            .await;
        self.cell.remove_link(target);
    }

    /// Start monitoring `target`; its exit will arrive as [`Message::Exit`]
    /// with [`Relation::Monitored`]
    pub async fn monitor(&self, target: &Pid) {
        target
            .send_system(SystemMessage::Monitor {
                parent: self.pid().clone(),
                revert: false,
            })
            .await;
    }

    /// Stop monitoring `target`
    pub async fn demonitor(&self, target: &Pid) {
        target
            .send_system(SystemMessage::Monitor {
                parent: self.pid().clone(),
                revert: true,
            })
            .await;
    }

    /// Spawn a new actor already linked to this one
    ///
    /// The link exists before the child runs its first instruction, so no
    /// death can slip through unobserved.
    pub fn spawn_link<F, Fut>(&self, body: F) -> Pid
    where
        F: FnOnce(ActorContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let child = spawn::spawn_inner(
            SpawnOptions {
                role: ActorRole::Worker,
                trap_exit: false,
                link_with: Some(self.pid().clone()),
                monitored_by: None,
                config: self.config.clone(),
            },
            body,
        );
        self.cell.add_link(child.clone());
        child
    }

    /// Spawn a new actor already monitored by this one
    pub fn spawn_monitor<F, Fut>(&self, body: F) -> Pid
    where
        F: FnOnce(ActorContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        spawn::spawn_inner(
            SpawnOptions {
                role: ActorRole::Worker,
                trap_exit: false,
                link_with: None,
                monitored_by: Some(self.pid().clone()),
                config: self.config.clone(),
            },
            body,
        )
    }

    /// Dequeue the next message addressed to user code
    ///
    /// System messages are intercepted here: link/monitor requests mutate
    /// bookkeeping silently, and lethal exit signals terminate the actor
    /// without returning. Returns None once the mailbox is disposed or
    /// every `Pid` clone is gone.
    pub async fn receive(&mut self) -> Option<Message> {
        loop {
            let received = self.mailbox.next().await?;
            match received {
                Received::User(payload) => return Some(Message::User(payload)),
                Received::System(system) => match self.intercept(system) {
                    Verdict::Forward(message) => return Some(message),
                    Verdict::Handled => continue,
                    Verdict::Terminate(exit) => self.terminate_now(exit).await,
                },
            }
        }
    }

    /// Like [`receive`](Self::receive), but yields [`Message::Timeout`] if
    /// nothing arrives within `duration`
    ///
    /// The timer covers this call only; it resets on every invocation. A
    /// zero duration degrades to a plain `receive`.
    pub async fn receive_timeout(&mut self, duration: Duration) -> Option<Message> {
        if duration.is_zero() {
            return self.receive().await;
        }
        loop {
            let received = match tokio::time::timeout(duration, self.mailbox.next()).await {
                Err(_elapsed) => return Some(Message::Timeout),
                Ok(None) => return None,
                Ok(Some(received)) => received,
            };
            match received {
                Received::User(payload) => return Some(Message::User(payload)),
                Received::System(system) => match self.intercept(system) {
                    Verdict::Forward(message) => return Some(message),
                    Verdict::Handled => continue,
                    Verdict::Terminate(exit) => self.terminate_now(exit).await,
                },
            }
        }
    }

    /// Abruptly stop this actor with an explicit exit record
    ///
    /// Never returns to the caller's code.
    pub(crate) async fn exit(&self, reason: ExitReason, parent: Option<Pid>) {
        let exit = Exit {
            who: self.pid().clone(),
            parent,
            reason,
            relation: Relation::Linked,
        };
        self.terminate_now(exit).await;
    }

    /// Record the exit, cancel the task, and park forever
    ///
    /// The spawn wrapper owns the task handle; once the token fires it
    /// aborts the body, so the future here is never polled to completion.
    async fn terminate_now(&self, exit: Exit) {
        self.cell.set_pending_exit(exit);
        self.pid().shutdown();
        std::future::pending::<()>().await;
    }

    /// Decide what one system message means for this actor
    fn intercept(&self, message: SystemMessage) -> Verdict {
        match message {
            SystemMessage::Monitor { parent, revert } => {
                if revert {
                    self.cell.remove_monitor(&parent);
                } else {
                    self.cell.add_monitor(parent);
                }
                Verdict::Handled
            }
            SystemMessage::Link { to, revert } => {
                if revert {
                    self.cell.remove_link(&to);
                } else {
                    self.cell.add_link(to);
                }
                Verdict::Handled
            }
            SystemMessage::Exit(exit) => match exit.relation {
                // Monitoring is observation only, always forwarded.
                Relation::Monitored => Verdict::Forward(Message::Exit(exit)),
                Relation::Linked => {
                    if self.cell.is_trapping() || !exit.reason.is_lethal() {
                        return Verdict::Forward(Message::Exit(exit));
                    }
                    // Untrapped lethal exit: die with the same reason,
                    // attributing the cascade to the peer.
                    Verdict::Terminate(Exit {
                        who: self.pid().clone(),
                        parent: Some(exit.who),
                        reason: exit.reason,
                        relation: Relation::Linked,
                    })
                }
            },
            SystemMessage::Shutdown { parent } => {
                if self.cell.is_trapping() {
                    return Verdict::Forward(Message::Shutdown { parent });
                }
                Verdict::Terminate(Exit {
                    who: self.pid().clone(),
                    parent: Some(parent),
                    reason: ExitReason::Killed,
                    relation: Relation::Linked,
                })
            }
        }
    }
}
