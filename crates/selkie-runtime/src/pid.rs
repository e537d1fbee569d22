//! Actor identity
//!
//! A `Pid` is the only way to address an actor: a cheap, cloneable handle
//! carrying the mailbox sender, the cancellation token for its task, and a
//! process-unique numeric ID. Equality and hashing go through the ID alone.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::mailbox::MailboxSender;
use crate::sysmsg::SystemMessage;

static NEXT_PID_ID: AtomicU64 = AtomicU64::new(1);

/// What kind of actor a `Pid` addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Worker,
    Supervisor,
}

/// Handle to a running (or terminated) actor
#[derive(Clone)]
pub struct Pid {
    inner: Arc<PidInner>,
}

struct PidInner {
    id: u64,
    sender: MailboxSender,
    cancel: CancellationToken,
    role: ActorRole,
    // Set once when a supervisor adopts this actor as a child.
    supervisor: OnceLock<Pid>,
}

impl Pid {
    pub(crate) fn new(sender: MailboxSender, role: ActorRole) -> Self {
        Self {
            inner: Arc::new(PidInner {
                id: NEXT_PID_ID.fetch_add(1, Ordering::Relaxed),
                sender,
                cancel: CancellationToken::new(),
                role,
                supervisor: OnceLock::new(),
            }),
        }
    }

    /// Process-unique numeric identity
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn role(&self) -> ActorRole {
        self.inner.role
    }

    pub fn is_supervisor(&self) -> bool {
        self.inner.role == ActorRole::Supervisor
    }

    /// Whether the actor behind this handle has terminated
    pub fn is_terminated(&self) -> bool {
        self.inner.sender.is_disposed()
    }

    /// Request immediate cancellation of the actor's task
    ///
    /// Idempotent. The actor is aborted at its next await point; its
    /// termination signals still fan out to links and monitors.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub(crate) fn sender(&self) -> &MailboxSender {
        &self.inner.sender
    }

    pub(crate) async fn send_system(&self, message: SystemMessage) {
        self.inner.sender.send_system(message).await;
    }

    /// Record the supervisor that owns this actor; first caller wins
    pub(crate) fn set_supervisor(&self, supervisor: Pid) {
        let _ = self.inner.supervisor.set(supervisor);
    }

    pub(crate) fn supervisor(&self) -> Option<&Pid> {
        self.inner.supervisor.get()
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pid")
            .field("id", &self.inner.id)
            .field("role", &self.inner.role)
            .finish()
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.inner.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox;

    fn make_pid(role: ActorRole) -> Pid {
        let (sender, _mailbox) = mailbox::channel(8, 8);
        Pid::new(sender, role)
    }

    #[test]
    fn test_pid_identity_by_id() {
        let a = make_pid(ActorRole::Worker);
        let b = make_pid(ActorRole::Worker);
        let a2 = a.clone();

        assert_ne!(a, b);
        assert_eq!(a, a2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_supervisor_backref_set_once() {
        let child = make_pid(ActorRole::Worker);
        let sup_a = make_pid(ActorRole::Supervisor);
        let sup_b = make_pid(ActorRole::Supervisor);

        child.set_supervisor(sup_a.clone());
        child.set_supervisor(sup_b);

        assert_eq!(child.supervisor(), Some(&sup_a));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pid = make_pid(ActorRole::Worker);
        pid.shutdown();
        pid.shutdown();
        assert!(pid.cancellation().is_cancelled());
    }
}
