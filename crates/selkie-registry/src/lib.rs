//! Selkie Name Registry
//!
//! Maps stable names to pids so collaborators can address an actor that is
//! restarted (and so changes pid) without holding a stale handle. The
//! registry is itself an actor: the name table lives inside its mailbox
//! loop, so registrations serialize without locks.
//!
//! Registration is explicit. The registry monitors registered pids and
//! drops a name when its actor dies, so lookups never return a pid that is
//! already known dead.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use selkie_core::config::RuntimeConfig;
use selkie_core::constants::SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT;
use selkie_core::error::{Error, Result};

use selkie_runtime::{send, spawn_with_config, ActorContext, Message, Pid, ReplyFuture};

enum Command {
    Register { name: String, pid: Pid },
    Unregister { name: String },
    WhereIs { name: String, reply: Pid },
}

/// Reply payload for a lookup
struct Found(Option<Pid>);

/// Handle to a running name registry
#[derive(Debug, Clone)]
pub struct NameRegistry {
    pid: Pid,
    lookup_timeout: Duration,
}

impl NameRegistry {
    /// Start a registry actor with default configuration
    pub fn start() -> Self {
        Self::start_with_config(&RuntimeConfig::default())
    }

    /// Start a registry actor with explicit configuration
    pub fn start_with_config(config: &RuntimeConfig) -> Self {
        let pid = spawn_with_config(config, registry_actor);
        Self {
            pid,
            lookup_timeout: Duration::from_millis(SUPERVISOR_CALL_TIMEOUT_MS_DEFAULT),
        }
    }

    /// Override the lookup timeout
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The registry actor's own pid
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Bind `name` to `pid`, replacing any previous binding
    pub async fn register(&self, name: impl Into<String>, pid: Pid) {
        send(
            &self.pid,
            Command::Register {
                name: name.into(),
                pid,
            },
        )
        .await;
    }

    /// Remove a binding; unknown names are a no-op
    pub async fn unregister(&self, name: impl Into<String>) {
        send(&self.pid, Command::Unregister { name: name.into() }).await;
    }

    /// Look up the pid currently bound to `name`
    pub async fn where_is(&self, name: impl Into<String>) -> Result<Option<Pid>> {
        let mut future = ReplyFuture::new();
        future.monitor(&self.pid).await;
        send(
            &self.pid,
            Command::WhereIs {
                name: name.into(),
                reply: future.pid(),
            },
        )
        .await;
        let Found(pid) = future.recv_typed::<Found>(self.lookup_timeout).await?;
        Ok(pid)
    }

    /// Send a user payload to the actor bound to `name`
    pub async fn send_named(
        &self,
        name: impl Into<String>,
        message: impl std::any::Any + Send,
    ) -> Result<()> {
        let name = name.into();
        match self.where_is(name.clone()).await? {
            Some(pid) => {
                send(&pid, message).await;
                Ok(())
            }
            None => Err(Error::NameNotRegistered { name }),
        }
    }

    /// Stop the registry actor; bindings are lost
    pub fn stop(&self) {
        self.pid.shutdown();
    }
}

async fn registry_actor(mut ctx: ActorContext) {
    let mut names: HashMap<String, Pid> = HashMap::new();

    while let Some(message) = ctx.receive().await {
        match message {
            Message::User(payload) => {
                let Ok(command) = payload.downcast::<Command>() else {
                    debug!("unrecognized message, dropped");
                    continue;
                };
                match *command {
                    Command::Register { name, pid } => {
                        ctx.monitor(&pid).await;
                        debug!(name = %name, pid = %pid, "name registered");
                        names.insert(name, pid);
                    }
                    Command::Unregister { name } => {
                        names.remove(&name);
                        debug!(name = %name, "name unregistered");
                    }
                    Command::WhereIs { name, reply } => {
                        send(&reply, Found(names.get(&name).cloned())).await;
                    }
                }
            }
            Message::Exit(exit) => {
                // A registered actor died; drop every name bound to it.
                names.retain(|name, pid| {
                    if *pid == exit.who {
                        debug!(name = %name, pid = %exit.who, "name dropped, actor terminated");
                        false
                    } else {
                        true
                    }
                });
            }
            _other => {}
        }
    }
}
