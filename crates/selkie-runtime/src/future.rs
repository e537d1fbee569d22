//! Reply futures
//!
//! A `ReplyFuture` is a mailbox without an actor behind it: a one-shot
//! address a request can carry so the handler knows where to reply. It can
//! monitor its target, so a caller waiting on a reply learns about the
//! target's death instead of hanging until the timeout.

use std::time::Duration;

use selkie_core::config::RuntimeConfig;
use selkie_core::error::{Error, Result};

use crate::mailbox::{self, AnyMessage, Mailbox, Received};
use crate::pid::{ActorRole, Pid};
use crate::sysmsg::SystemMessage;

/// A task-less mailbox for receiving one reply
pub struct ReplyFuture {
    pid: Pid,
    mailbox: Mailbox,
}

impl ReplyFuture {
    pub fn new() -> Self {
        let config = RuntimeConfig::default();
        let (sender, mailbox) = mailbox::channel(
            config.mailbox.user_depth,
            config.mailbox.system_depth,
        );
        let pid = Pid::new(sender, ActorRole::Worker);
        Self { pid, mailbox }
    }

    /// The address to embed in a request as the reply-to
    pub fn pid(&self) -> Pid {
        self.pid.clone()
    }

    /// Monitor `target` so its death shows up as an error from `recv`
    pub async fn monitor(&self, target: &Pid) {
        target
            .send_system(SystemMessage::Monitor {
                parent: self.pid.clone(),
                revert: false,
            })
            .await;
    }

    /// Wait for the next user payload
    ///
    /// If a monitored target dies first, returns
    /// [`Error::TargetTerminated`] with the target's exit reason.
    pub async fn recv(&mut self) -> Result<AnyMessage> {
        loop {
            match self.mailbox.next().await {
                None => return Err(Error::MailboxDisposed),
                Some(Received::User(payload)) => return Ok(payload),
                Some(Received::System(SystemMessage::Exit(exit))) => {
                    return Err(Error::target_terminated(exit.reason.to_string()));
                }
                // Link and monitor requests mean nothing to a mailbox
                // with no actor behind it.
                Some(Received::System(_)) => continue,
            }
        }
    }

    /// Wait for the next user payload, up to `duration`
    pub async fn recv_timeout(&mut self, duration: Duration) -> Result<AnyMessage> {
        match tokio::time::timeout(duration, self.recv()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::CallTimedOut {
                timeout_ms: duration.as_millis() as u64,
            }),
        }
    }

    /// Wait for a reply of a known type, up to `duration`
    pub async fn recv_typed<T: 'static>(&mut self, duration: Duration) -> Result<T> {
        let payload = self.recv_timeout(duration).await?;
        payload
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::invalid_call_response("unexpected reply payload type"))
    }
}

impl Default for ReplyFuture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::{send, spawn};
    use crate::sysmsg::Message;

    #[tokio::test]
    async fn test_reply_round_trip() {
        let echo = spawn(|mut ctx| async move {
            while let Some(Message::User(payload)) = ctx.receive().await {
                if let Ok(reply_to) = payload.downcast::<Pid>() {
                    send(&reply_to, "pong".to_string()).await;
                }
            }
        });

        let mut future = ReplyFuture::new();
        send(&echo, future.pid()).await;

        let reply: String = future
            .recv_typed(Duration::from_secs(1))
            .await
            .expect("echo did not reply");
        assert_eq!(reply, "pong");
    }

    #[tokio::test]
    async fn test_recv_surfaces_target_death() {
        let doomed = spawn(|mut ctx| async move {
            // Panics on the first user message, after the monitor is set.
            let _ = ctx.receive().await;
            panic!("dead on arrival");
        });

        let mut future = ReplyFuture::new();
        future.monitor(&doomed).await;
        send(&doomed, ()).await;

        match future.recv_timeout(Duration::from_secs(1)).await {
            Err(Error::TargetTerminated { reason }) => {
                assert!(reason.contains("dead on arrival"));
            }
            other => panic!("expected TargetTerminated, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_recv_timeout_elapses() {
        let mut future = ReplyFuture::new();
        match future.recv_timeout(Duration::from_millis(20)).await {
            Err(Error::CallTimedOut { timeout_ms }) => assert_eq!(timeout_ms, 20),
            other => panic!("expected CallTimedOut, got {:?}", other.map(|_| ())),
        }
    }
}
