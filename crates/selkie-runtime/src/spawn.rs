//! Spawning actors and the termination wrapper
//!
//! Every actor is a pair of tokio tasks: an inner task running the user
//! body, and an outer wrapper that supervises it. The wrapper is the only
//! place deaths are observed, so panics, cancellations, and voluntary
//! returns all funnel into one classification point before exit signals
//! fan out to links and monitors.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use selkie_core::config::RuntimeConfig;

use crate::context::{ActorCell, ActorContext};
use crate::mailbox;
use crate::pid::{ActorRole, Pid};
use crate::sysmsg::{Exit, ExitReason, Relation, SystemMessage};

/// Spawn a free-standing actor with default configuration
pub fn spawn<F, Fut>(body: F) -> Pid
where
    F: FnOnce(ActorContext) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    spawn_with_config(&RuntimeConfig::default(), body)
}

/// Spawn a free-standing actor with explicit configuration
pub fn spawn_with_config<F, Fut>(config: &RuntimeConfig, body: F) -> Pid
where
    F: FnOnce(ActorContext) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    spawn_inner(
        SpawnOptions {
            role: ActorRole::Worker,
            trap_exit: false,
            link_with: None,
            monitored_by: None,
            config: config.clone(),
        },
        body,
    )
}

/// Send a user payload to an actor, waiting while its mailbox is full
///
/// Sends to a terminated actor vanish silently.
pub async fn send(target: &Pid, message: impl Any + Send) {
    target.sender().send_user(Box::new(message)).await;
}

/// Send a user payload without waiting; false means the mailbox was full
pub fn try_send(target: &Pid, message: impl Any + Send) -> bool {
    target.sender().try_send_user(Box::new(message))
}

pub(crate) struct SpawnOptions {
    pub(crate) role: ActorRole,
    pub(crate) trap_exit: bool,
    pub(crate) link_with: Option<Pid>,
    pub(crate) monitored_by: Option<Pid>,
    pub(crate) config: RuntimeConfig,
}

/// The one spawn path all public variants go through
pub(crate) fn spawn_inner<F, Fut>(options: SpawnOptions, body: F) -> Pid
where
    F: FnOnce(ActorContext) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (sender, mailbox) = mailbox::channel(
        options.config.mailbox.user_depth,
        options.config.mailbox.system_depth,
    );
    let pid = Pid::new(sender, options.role);
    let cell = Arc::new(ActorCell::new(pid.clone(), options.trap_exit));

    // Relationships requested at spawn time exist before the body runs,
    // so no death can slip through unobserved.
    if let Some(peer) = options.link_with {
        cell.add_link(peer);
    }
    if let Some(watcher) = options.monitored_by {
        cell.add_monitor(watcher);
    }

    let context = ActorContext::new(cell.clone(), mailbox, options.config);
    let future = body(context);
    tokio::spawn(run_actor(cell, future));
    pid
}

/// How the inner task ended, before exit classification
enum Outcome {
    /// The body returned on its own
    Completed,
    /// The body returned, but the cancellation token had already fired
    CompletedWhileCancelled,
    /// The body was aborted at an await point
    Aborted,
    /// The body panicked
    Faulted(String),
}

/// Outer wrapper: run the body, observe its death, fan out exit signals
async fn run_actor(cell: Arc<ActorCell>, future: impl Future<Output = ()> + Send + 'static) {
    let token = cell.pid().cancellation();
    let mut task = tokio::spawn(future);

    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            task.abort();
            match (&mut task).await {
                Ok(()) => Outcome::CompletedWhileCancelled,
                Err(join_error) if join_error.is_panic() => {
                    Outcome::Faulted(panic_details(join_error.into_panic()))
                }
                Err(_cancelled) => Outcome::Aborted,
            }
        }
        result = &mut task => match result {
            Ok(()) => Outcome::Completed,
            Err(join_error) if join_error.is_panic() => {
                Outcome::Faulted(panic_details(join_error.into_panic()))
            }
            Err(_cancelled) => Outcome::Aborted,
        }
    };

    handle_termination(cell, outcome).await;
}

/// Classify a death and notify everyone who cares
///
/// The mailbox is disposed before any signal is sent, so nothing is ever
/// delivered to a dead actor.
async fn handle_termination(cell: Arc<ActorCell>, outcome: Outcome) {
    cell.pid().sender().mark_disposed();

    let exit = match cell.take_pending_exit() {
        Some(exit) => exit,
        None => {
            let reason = match outcome {
                Outcome::Completed => ExitReason::Normal,
                // The body won the race against its own kill. A trapping
                // actor draining after a shutdown request still counts as
                // a voluntary return; an untrapped one was killed.
                Outcome::CompletedWhileCancelled => {
                    if cell.is_trapping() {
                        ExitReason::Normal
                    } else {
                        ExitReason::Killed
                    }
                }
                Outcome::Aborted => ExitReason::Killed,
                Outcome::Faulted(details) => ExitReason::Panicked { details },
            };
            Exit {
                who: cell.pid().clone(),
                parent: None,
                reason,
                relation: Relation::Linked,
            }
        }
    };

    if matches!(exit.reason, ExitReason::Panicked { .. }) {
        warn!(pid = %cell.pid(), reason = %exit.reason, "actor faulted");
    } else {
        debug!(pid = %cell.pid(), reason = %exit.reason, "actor terminated");
    }

    // A faulted supervisor takes its remaining children with it so no
    // orphan subtree keeps running unsupervised.
    if cell.pid().is_supervisor() && matches!(exit.reason, ExitReason::Panicked { .. }) {
        for linked in cell.snapshot_links() {
            if cell.pid().supervisor() == Some(&linked) {
                continue;
            }
            if exit.parent.as_ref() == Some(&linked) {
                continue;
            }
            linked
                .send_system(SystemMessage::Shutdown {
                    parent: cell.pid().clone(),
                })
                .await;
            linked.shutdown();
        }
    }

    for watcher in cell.snapshot_monitors() {
        watcher
            .send_system(SystemMessage::Exit(Exit {
                relation: Relation::Monitored,
                ..exit.clone()
            }))
            .await;
    }

    for linked in cell.snapshot_links() {
        // The peer whose death caused ours already knows; skip it to
        // stop the cascade from echoing.
        if exit.parent.as_ref() == Some(&linked) {
            continue;
        }
        linked
            .send_system(SystemMessage::Exit(Exit {
                relation: Relation::Linked,
                ..exit.clone()
            }))
            .await;
    }
}

fn panic_details(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
