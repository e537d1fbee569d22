//! Supervision trees
//!
//! A supervisor is itself an actor: it traps exits, links to every child it
//! starts, and turns the exit signals it observes into restarts according
//! to its [`Strategy`]. Management commands travel through the supervisor's
//! own mailbox as calls, so they serialize naturally with restart handling
//! and there is no shared mutable state to lock.

mod handle;
mod options;
mod registry;
mod spec;

pub use handle::SupervisorRef;
pub use options::{Options, Strategy};
pub use spec::{
    ActorFuture, ChildKind, ChildSpec, Restart, Shutdown, SupervisorStart, WorkerStart,
};

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use selkie_core::config::RuntimeConfig;
use selkie_core::constants::SUPERVISOR_START_TIMEOUT_MS;
use selkie_core::error::{Error, Result};

use crate::context::ActorContext;
use crate::future::ReplyFuture;
use crate::pid::{ActorRole, Pid};
use crate::spawn::{self, send, SpawnOptions};
use crate::sysmsg::{Exit, ExitReason, Message, Relation, SystemMessage};

use registry::ChildRegistry;
use spec::{SpecTable, StartKind};

// =============================================================================
// Call protocol
// =============================================================================

/// First message a new supervisor receives; carries the reply-to address
/// for the start handshake
struct Init {
    reply: Pid,
}

/// A management command plus where to send its reply
struct Call {
    reply: Pid,
    request: Request,
}

enum Request {
    CountChildren,
    WhichChildren,
    StartChild(ChildSpec),
    TerminateChild(String),
    RestartChild(String),
    DeleteChild(String),
    Stop,
}

enum Reply {
    Done,
    Counts(ChildCounts),
    Children(Vec<ChildInfo>),
    Failed(Error),
}

/// Snapshot of a supervisor's child population
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildCounts {
    /// Child specs known, running or not
    pub specs: usize,
    /// Children currently running
    pub active: usize,
    /// Specs describing workers
    pub workers: usize,
    /// Specs describing nested supervisors
    pub supervisors: usize,
}

/// One child as seen by [`SupervisorRef::which_children`]
#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub id: String,
    /// The running child's pid, or None while it is down
    pub pid: Option<Pid>,
    pub kind: ChildKind,
}

// =============================================================================
// Starting a supervisor
// =============================================================================

/// Start a supervision tree with default runtime configuration
///
/// Children start synchronously in declaration order; this returns only
/// once every child is running, or with the first start failure after the
/// already-started children were stopped again.
pub async fn start(options: Options, specs: Vec<ChildSpec>) -> Result<SupervisorRef> {
    start_with_config(&RuntimeConfig::default(), options, specs).await
}

/// Start a supervision tree with explicit runtime configuration
pub async fn start_with_config(
    config: &RuntimeConfig,
    options: Options,
    specs: Vec<ChildSpec>,
) -> Result<SupervisorRef> {
    config.validate()?;
    options.validate()?;
    let table = SpecTable::new(specs)?;

    let name = options.name.clone();
    let call_timeout = Duration::from_millis(config.supervisor.call_timeout_ms);

    let pid = spawn::spawn_inner(
        SpawnOptions {
            role: ActorRole::Supervisor,
            trap_exit: true,
            link_with: None,
            monitored_by: None,
            config: config.clone(),
        },
        move |ctx| supervisor_loop(ctx, options, table),
    );

    let mut ready = ReplyFuture::new();
    ready.monitor(&pid).await;
    send(&pid, Init { reply: ready.pid() }).await;

    let start_timeout = Duration::from_millis(SUPERVISOR_START_TIMEOUT_MS);
    match ready.recv_typed::<Reply>(start_timeout).await? {
        Reply::Done => {
            debug!(supervisor = %name, pid = %pid, "supervisor started");
            Ok(SupervisorRef::new(pid, call_timeout))
        }
        Reply::Failed(error) => Err(error),
        _other => Err(Error::invalid_call_response("unexpected reply to init")),
    }
}

// =============================================================================
// Supervisor actor
// =============================================================================

struct SupervisorState {
    options: Options,
    specs: SpecTable,
    registry: ChildRegistry,
}

async fn supervisor_loop(mut ctx: ActorContext, options: Options, specs: SpecTable) {
    let registry = ChildRegistry::new(options.max_restarts, options.period);
    let mut state = SupervisorState {
        options,
        specs,
        registry,
    };

    // Init handshake: nothing happens until the starter tells us where to
    // report readiness.
    loop {
        let Some(message) = ctx.receive().await else {
            return;
        };
        let Message::User(payload) = message else {
            continue;
        };
        match payload.downcast::<Init>() {
            Ok(init) => {
                match state.start_children(&ctx).await {
                    Ok(()) => {
                        send(&init.reply, Reply::Done).await;
                        break;
                    }
                    Err(error) => {
                        warn!(
                            supervisor = %state.options.name,
                            %error,
                            "supervisor failed to start"
                        );
                        send(&init.reply, Reply::Failed(error)).await;
                        state.shutdown_children(&ctx).await;
                        return;
                    }
                }
            }
            Err(_other) => {
                warn!(supervisor = %state.options.name, "message before init, dropped");
            }
        }
    }

    while let Some(message) = ctx.receive().await {
        match message {
            Message::Exit(exit) => state.handle_exit(&ctx, exit).await,
            Message::Shutdown { parent } => {
                state.shutdown_children(&ctx).await;
                ctx.exit(ExitReason::Killed, Some(parent)).await;
                return;
            }
            Message::User(payload) => match payload.downcast::<Call>() {
                Ok(call) => {
                    if !state.handle_call(&ctx, *call).await {
                        return;
                    }
                }
                Err(_other) => {
                    warn!(supervisor = %state.options.name, "unrecognized message, dropped");
                }
            },
            Message::Timeout => {}
        }
    }
}

impl SupervisorState {
    /// Start every child in declaration order, stopping on the first error
    async fn start_children(&mut self, ctx: &ActorContext) -> Result<()> {
        let ids: Vec<String> = self.specs.iter().map(|spec| spec.id().to_string()).collect();
        for id in ids {
            self.spawn_child(ctx, &id).await?;
        }
        Ok(())
    }

    /// Start (or restart) the child described by `id`
    async fn spawn_child(&mut self, ctx: &ActorContext, id: &str) -> Result<()> {
        let spec = self
            .specs
            .get(id)
            .ok_or_else(|| Error::child_not_found(id))?;

        let pid = match spec.start() {
            StartKind::Worker(start) => {
                let start = start.clone();
                ctx.spawn_link(move |child_ctx| start(child_ctx))
            }
            StartKind::Supervisor(start_link) => {
                let start_link = start_link.clone();
                let nested = start_link().await?;
                let pid = nested.pid().clone();
                ctx.link(&pid).await;
                pid
            }
        };

        pid.set_supervisor(ctx.pid().clone());
        debug!(
            supervisor = %self.options.name,
            child = %id,
            pid = %pid,
            "child started"
        );
        self.registry.put(pid, id.to_string());
        Ok(())
    }

    /// React to one child's termination
    async fn handle_exit(&mut self, ctx: &ActorContext, exit: Exit) {
        let Some(id) = self.registry.mark_dead(&exit.who) else {
            // Exits from pids we already replaced or stopped are expected
            // stragglers; anything else is noise from outside the tree.
            if self.registry.dead_id(&exit.who).is_some() {
                debug!(
                    supervisor = %self.options.name,
                    pid = %exit.who,
                    "late exit from replaced child"
                );
            } else if exit.relation == Relation::Linked && exit.reason.is_lethal() {
                // A lethal exit from outside the child set can only come
                // through an inherited link, typically a dying parent.
                // Trapping does not exempt the supervisor from sharing
                // that fate; it only buys time to stop its children.
                warn!(
                    supervisor = %self.options.name,
                    pid = %exit.who,
                    reason = %exit.reason,
                    "lethal exit from outside the tree, shutting down"
                );
                self.shutdown_children(ctx).await;
                ctx.exit(exit.reason, Some(exit.who)).await;
            } else {
                debug!(
                    supervisor = %self.options.name,
                    pid = %exit.who,
                    relation = ?exit.relation,
                    "exit from unmanaged pid"
                );
            }
            return;
        };

        ctx.unlink(&exit.who).await;
        debug!(
            supervisor = %self.options.name,
            child = %id,
            reason = %exit.reason,
            "child terminated"
        );

        let Some(restart) = self.specs.get(&id).map(ChildSpec::restart) else {
            return;
        };
        let should_restart = match restart {
            Restart::Never => false,
            Restart::Always => true,
            Restart::Transient => !exit.reason.is_normal(),
        };
        if !should_restart {
            debug!(supervisor = %self.options.name, child = %id, "not restarting");
            return;
        }

        match self.options.strategy {
            Strategy::OneForOne => self.restart_one(ctx, &id).await,
            Strategy::OneForAll => self.restart_all(ctx, &id).await,
            Strategy::RestForOne => self.restart_rest(ctx, &id).await,
        }
    }

    async fn restart_one(&mut self, ctx: &ActorContext, id: &str) {
        if self.registry.record_restart(id) {
            self.escalate(ctx).await;
            return;
        }
        if let Err(error) = self.spawn_child(ctx, id).await {
            warn!(
                supervisor = %self.options.name,
                child = %id,
                %error,
                "restart failed"
            );
        }
    }

    async fn restart_all(&mut self, ctx: &ActorContext, failed_id: &str) {
        if self.registry.record_restart(failed_id) {
            self.escalate(ctx).await;
            return;
        }

        let alive = self.registry.alive_snapshot();
        let alive_ids: HashSet<String> = alive.iter().map(|(_, id)| id.clone()).collect();
        for (pid, id) in &alive {
            self.stop_child(ctx, id, pid).await;
        }

        // Respawn in declaration order: the failed child plus everyone who
        // was running when it died.
        let cohort: Vec<String> = self
            .specs
            .iter()
            .map(|spec| spec.id().to_string())
            .filter(|id| id == failed_id || alive_ids.contains(id))
            .collect();
        for id in &cohort {
            if let Err(error) = self.spawn_child(ctx, id).await {
                warn!(
                    supervisor = %self.options.name,
                    child = %id,
                    %error,
                    "restart failed"
                );
            }
        }
    }

    async fn restart_rest(&mut self, ctx: &ActorContext, failed_id: &str) {
        if self.registry.record_restart(failed_id) {
            self.escalate(ctx).await;
            return;
        }

        let Some(position) = self.specs.position(failed_id) else {
            return;
        };
        let rest: Vec<String> = self
            .specs
            .iter()
            .skip(position)
            .map(|spec| spec.id().to_string())
            .collect();

        let alive_ids: HashSet<String> = self
            .registry
            .alive_snapshot()
            .into_iter()
            .map(|(_, id)| id)
            .collect();

        for id in &rest {
            if id != failed_id {
                if let Some(pid) = self.registry.alive_pid(id) {
                    self.stop_child(ctx, id, &pid).await;
                }
            }
        }
        for id in &rest {
            if id == failed_id || alive_ids.contains(id) {
                if let Err(error) = self.spawn_child(ctx, id).await {
                    warn!(
                        supervisor = %self.options.name,
                        child = %id,
                        %error,
                        "restart failed"
                    );
                }
            }
        }
    }

    /// Restart budget blown: tear everything down and die reporting it
    async fn escalate(&mut self, ctx: &ActorContext) {
        warn!(
            supervisor = %self.options.name,
            max_restarts = self.options.max_restarts,
            period_ms = self.options.period.as_millis() as u64,
            "restart budget exhausted, giving up"
        );
        self.shutdown_children(ctx).await;
        ctx.exit(ExitReason::MaxRestartsReached, None).await;
    }

    /// Stop one running child according to its shutdown policy
    ///
    /// The child is marked dead and unlinked before the shutdown request is
    /// sent, so its exit signal is attributed as an expected straggler and
    /// never triggers a restart.
    async fn stop_child(&mut self, ctx: &ActorContext, id: &str, pid: &Pid) {
        self.registry.mark_dead(pid);
        ctx.unlink(pid).await;
        pid.send_system(SystemMessage::Shutdown {
            parent: ctx.pid().clone(),
        })
        .await;

        let policy = self
            .specs
            .get(id)
            .map(ChildSpec::shutdown)
            .unwrap_or(Shutdown::Kill);
        match policy {
            Shutdown::Kill => pid.shutdown(),
            Shutdown::Infinity => {}
            Shutdown::Timeout(grace) => {
                let pid = pid.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    pid.shutdown();
                });
            }
        }
        debug!(supervisor = %self.options.name, child = %id, "child stopped");
    }

    /// Stop every running child, in reverse declaration order
    async fn shutdown_children(&mut self, ctx: &ActorContext) {
        let ids: Vec<String> = self
            .specs
            .iter()
            .map(|spec| spec.id().to_string())
            .rev()
            .collect();
        for id in ids {
            if let Some(pid) = self.registry.alive_pid(&id) {
                self.stop_child(ctx, &id, &pid).await;
            }
        }
    }

    /// Execute one management call; false means the supervisor stops
    async fn handle_call(&mut self, ctx: &ActorContext, call: Call) -> bool {
        let Call { reply, request } = call;
        match request {
            Request::CountChildren => {
                send(&reply, Reply::Counts(self.count_children())).await;
            }
            Request::WhichChildren => {
                send(&reply, Reply::Children(self.which_children())).await;
            }
            Request::StartChild(spec) => {
                let outcome = self.start_child(ctx, spec).await;
                send(&reply, Reply::from_outcome(outcome)).await;
            }
            Request::TerminateChild(id) => {
                let outcome = self.terminate_child(ctx, &id).await;
                send(&reply, Reply::from_outcome(outcome)).await;
            }
            Request::RestartChild(id) => {
                let outcome = self.restart_child(ctx, &id).await;
                send(&reply, Reply::from_outcome(outcome)).await;
            }
            Request::DeleteChild(id) => {
                let outcome = self.delete_child(&id);
                send(&reply, Reply::from_outcome(outcome)).await;
            }
            Request::Stop => {
                self.shutdown_children(ctx).await;
                send(&reply, Reply::Done).await;
                debug!(supervisor = %self.options.name, "supervisor stopped");
                return false;
            }
        }
        true
    }

    /// Add a new child spec at runtime and start it
    async fn start_child(&mut self, ctx: &ActorContext, spec: ChildSpec) -> Result<()> {
        spec.validate()?;
        let id = spec.id().to_string();
        self.specs.insert(spec)?;
        self.spawn_child(ctx, &id).await
    }

    /// Stop a running child, keeping its spec for a later restart
    async fn terminate_child(&mut self, ctx: &ActorContext, id: &str) -> Result<()> {
        if !self.specs.contains(id) {
            return Err(Error::child_not_found(id));
        }
        let Some(pid) = self.registry.alive_pid(id) else {
            return Err(Error::ChildNotRunning { id: id.to_string() });
        };
        self.stop_child(ctx, id, &pid).await;
        Ok(())
    }

    /// Start a child that was previously terminated
    async fn restart_child(&mut self, ctx: &ActorContext, id: &str) -> Result<()> {
        if !self.specs.contains(id) {
            return Err(Error::child_not_found(id));
        }
        if self.registry.alive_pid(id).is_some() {
            return Err(Error::ChildAlreadyRunning { id: id.to_string() });
        }
        self.spawn_child(ctx, id).await
    }

    /// Remove a non-running child's spec entirely
    fn delete_child(&mut self, id: &str) -> Result<()> {
        if !self.specs.contains(id) {
            return Err(Error::child_not_found(id));
        }
        if self.registry.alive_pid(id).is_some() {
            return Err(Error::ChildAlreadyRunning { id: id.to_string() });
        }
        self.specs.remove(id);
        self.registry.forget(id);
        Ok(())
    }

    fn count_children(&self) -> ChildCounts {
        let workers = self
            .specs
            .iter()
            .filter(|spec| spec.kind() == ChildKind::Worker)
            .count();
        ChildCounts {
            specs: self.specs.len(),
            active: self.registry.alive_count(),
            workers,
            supervisors: self.specs.len() - workers,
        }
    }

    fn which_children(&self) -> Vec<ChildInfo> {
        self.specs
            .iter()
            .map(|spec| ChildInfo {
                id: spec.id().to_string(),
                pid: self.registry.alive_pid(spec.id()),
                kind: spec.kind(),
            })
            .collect()
    }
}

impl Reply {
    fn from_outcome(outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => Reply::Done,
            Err(error) => Reply::Failed(error),
        }
    }
}
