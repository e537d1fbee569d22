//! Client handle for a running supervisor

use std::fmt;
use std::time::Duration;

use selkie_core::error::{Error, Result};

use crate::future::ReplyFuture;
use crate::pid::Pid;
use crate::spawn::send;

use super::{Call, ChildCounts, ChildInfo, ChildSpec, Reply, Request};

/// Cheap, cloneable handle to a running supervisor
///
/// Every method is a call: a request travels through the supervisor's
/// mailbox and the reply comes back through a [`ReplyFuture`], so commands
/// serialize with the supervisor's own restart handling.
#[derive(Clone)]
pub struct SupervisorRef {
    pid: Pid,
    call_timeout: Duration,
}

impl SupervisorRef {
    pub(crate) fn new(pid: Pid, call_timeout: Duration) -> Self {
        Self { pid, call_timeout }
    }

    /// The supervisor's own pid
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Override the per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Count known specs and running children
    pub async fn count_children(&self) -> Result<ChildCounts> {
        match self.call(Request::CountChildren).await? {
            Reply::Counts(counts) => Ok(counts),
            Reply::Failed(error) => Err(error),
            _other => Err(Error::invalid_call_response("expected child counts")),
        }
    }

    /// List every child spec with its current pid, if running
    pub async fn which_children(&self) -> Result<Vec<ChildInfo>> {
        match self.call(Request::WhichChildren).await? {
            Reply::Children(children) => Ok(children),
            Reply::Failed(error) => Err(error),
            _other => Err(Error::invalid_call_response("expected child list")),
        }
    }

    /// Add a new child spec and start it
    pub async fn start_child(&self, spec: ChildSpec) -> Result<()> {
        Self::expect_done(self.call(Request::StartChild(spec)).await?)
    }

    /// Stop a running child, keeping its spec
    pub async fn terminate_child(&self, id: impl Into<String>) -> Result<()> {
        Self::expect_done(self.call(Request::TerminateChild(id.into())).await?)
    }

    /// Start a previously terminated child again
    pub async fn restart_child(&self, id: impl Into<String>) -> Result<()> {
        Self::expect_done(self.call(Request::RestartChild(id.into())).await?)
    }

    /// Remove a non-running child's spec
    pub async fn delete_child(&self, id: impl Into<String>) -> Result<()> {
        Self::expect_done(self.call(Request::DeleteChild(id.into())).await?)
    }

    /// Stop every child, then the supervisor itself
    pub async fn stop(&self) -> Result<()> {
        Self::expect_done(self.call(Request::Stop).await?)
    }

    async fn call(&self, request: Request) -> Result<Reply> {
        if self.pid.is_terminated() {
            return Err(Error::target_terminated("supervisor already terminated"));
        }
        let mut future = ReplyFuture::new();
        future.monitor(&self.pid).await;
        send(
            &self.pid,
            Call {
                reply: future.pid(),
                request,
            },
        )
        .await;
        future.recv_typed::<Reply>(self.call_timeout).await
    }

    fn expect_done(reply: Reply) -> Result<()> {
        match reply {
            Reply::Done => Ok(()),
            Reply::Failed(error) => Err(error),
            _other => Err(Error::invalid_call_response("expected ack")),
        }
    }
}

impl fmt::Debug for SupervisorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorRef")
            .field("pid", &self.pid)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
