//! Child specifications
//!
//! A child spec is the durable description of one supervised actor: a
//! stable ID, a restartable entry point, and policies for when to restart
//! it and how to stop it. The supervisor keeps specs for the lifetime of
//! the tree; running children come and go.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use selkie_core::constants::CHILD_ID_LENGTH_BYTES_MAX;
use selkie_core::error::{Error, Result};

use crate::context::ActorContext;
use crate::supervisor::handle::SupervisorRef;

/// A boxed actor body future
pub type ActorFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Restartable entry point for a worker child
pub type WorkerStart = Arc<dyn Fn(ActorContext) -> ActorFuture + Send + Sync>;

/// Restartable entry point for a nested supervisor child
pub type SupervisorStart =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<SupervisorRef>> + Send>> + Send + Sync>;

/// When a supervisor restarts this child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    /// Restart on any termination, voluntary or not
    Always,
    /// Restart only on abnormal termination
    Transient,
    /// Never restart
    Never,
}

/// How a supervisor stops this child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Send the shutdown request and wait for the child indefinitely
    Infinity,
    /// Send the shutdown request and cancel the child's task at once
    Kill,
    /// Send the shutdown request, then force-kill after the grace period
    Timeout(Duration),
}

/// Whether a spec describes a worker or a nested supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Worker,
    Supervisor,
}

#[derive(Clone)]
pub(crate) enum StartKind {
    Worker(WorkerStart),
    Supervisor(SupervisorStart),
}

/// Description of one supervised child
#[derive(Clone)]
pub struct ChildSpec {
    id: String,
    start: StartKind,
    restart: Restart,
    shutdown: Shutdown,
}

impl ChildSpec {
    /// Describe a worker child
    ///
    /// The entry function is called for the initial start and for every
    /// restart, so it must capture its own starting state.
    pub fn worker<F, Fut>(id: impl Into<String>, entry: F) -> Self
    where
        F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: id.into(),
            start: StartKind::Worker(Arc::new(move |ctx| Box::pin(entry(ctx)))),
            restart: Restart::Always,
            shutdown: Shutdown::Kill,
        }
    }

    /// Describe a nested supervisor child
    ///
    /// `start_link` runs the nested supervisor's full start, including its
    /// own children, on every (re)start.
    pub fn supervisor<F, Fut>(id: impl Into<String>, start_link: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SupervisorRef>> + Send + 'static,
    {
        Self {
            id: id.into(),
            start: StartKind::Supervisor(Arc::new(move || Box::pin(start_link()))),
            restart: Restart::Transient,
            shutdown: Shutdown::Kill,
        }
    }

    pub fn with_restart(mut self, restart: Restart) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ChildKind {
        match self.start {
            StartKind::Worker(_) => ChildKind::Worker,
            StartKind::Supervisor(_) => ChildKind::Supervisor,
        }
    }

    pub fn restart(&self) -> Restart {
        self.restart
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown
    }

    pub(crate) fn start(&self) -> &StartKind {
        &self.start
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::invalid_child_spec(&self.id, "ID must not be empty"));
        }
        if self.id.len() > CHILD_ID_LENGTH_BYTES_MAX {
            return Err(Error::invalid_child_spec(
                &self.id,
                format!(
                    "ID length {} exceeds limit {}",
                    self.id.len(),
                    CHILD_ID_LENGTH_BYTES_MAX
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("restart", &self.restart)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// The supervisor's ordered table of child specs
///
/// Declaration order is load-bearing: it is the start order, the restart
/// order, and the boundary RestForOne reasons about.
pub(crate) struct SpecTable {
    specs: Vec<ChildSpec>,
}

impl SpecTable {
    pub(crate) fn new(specs: Vec<ChildSpec>) -> Result<Self> {
        use selkie_core::constants::SUPERVISOR_CHILDREN_COUNT_MAX;

        if specs.is_empty() {
            return Err(Error::EmptyChildSpecs);
        }
        if specs.len() > SUPERVISOR_CHILDREN_COUNT_MAX {
            return Err(Error::internal(format!(
                "{} child specs exceeds limit {}",
                specs.len(),
                SUPERVISOR_CHILDREN_COUNT_MAX
            )));
        }
        let mut table = Self { specs: Vec::new() };
        for spec in specs {
            spec.validate()?;
            table.insert(spec)?;
        }
        Ok(table)
    }

    pub(crate) fn insert(&mut self, spec: ChildSpec) -> Result<()> {
        if self.contains(spec.id()) {
            return Err(Error::DuplicateChildId {
                id: spec.id().to_string(),
            });
        }
        self.specs.push(spec);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.specs.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ChildSpec> {
        self.specs.iter().find(|spec| spec.id() == id)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.id() == id)
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &ChildSpec> {
        self.specs.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.specs.len()
    }
}
