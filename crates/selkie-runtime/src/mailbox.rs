//! Two-lane actor mailbox
//!
//! Every actor owns one mailbox with two bounded FIFO lanes: a user lane for
//! application payloads and a shallow system lane for supervision traffic.
//! The system lane always wins when both have messages pending, so exit and
//! shutdown signals overtake a backlog of user work.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TrySendError, TryRecvError};

use crate::sysmsg::SystemMessage;

/// A dynamically typed user payload
pub type AnyMessage = Box<dyn Any + Send>;

/// One message pulled from a mailbox, tagged with its lane
pub(crate) enum Received {
    User(AnyMessage),
    System(SystemMessage),
}

/// Sending half of a mailbox, cloned into every `Pid`
#[derive(Clone)]
pub(crate) struct MailboxSender {
    user_tx: mpsc::Sender<AnyMessage>,
    system_tx: mpsc::Sender<SystemMessage>,
    disposed: Arc<AtomicBool>,
}

impl MailboxSender {
    /// Enqueue a user payload, waiting if the lane is full
    ///
    /// Sends to a disposed mailbox vanish silently.
    pub(crate) async fn send_user(&self, message: AnyMessage) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.user_tx.send(message).await;
    }

    /// Enqueue a user payload without waiting
    ///
    /// Returns false if the lane is full. Sends to a disposed mailbox
    /// vanish silently and report success.
    pub(crate) fn try_send_user(&self, message: AnyMessage) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return true;
        }
        match self.user_tx.try_send(message) {
            Ok(()) | Err(TrySendError::Closed(_)) => true,
            Err(TrySendError::Full(_)) => false,
        }
    }

    /// Enqueue a system message, waiting if the lane is full
    pub(crate) async fn send_system(&self, message: SystemMessage) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.system_tx.send(message).await;
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Flip the disposed flag so no further message is delivered
    ///
    /// Messages already buffered in the lanes are dropped, not drained:
    /// the receiving side checks the flag before every dequeue.
    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

/// Receiving half of a mailbox, owned by the actor's context
pub(crate) struct Mailbox {
    user_rx: mpsc::Receiver<AnyMessage>,
    system_rx: mpsc::Receiver<SystemMessage>,
    disposed: Arc<AtomicBool>,
}

/// Create a connected sender/mailbox pair
pub(crate) fn channel(user_depth: usize, system_depth: usize) -> (MailboxSender, Mailbox) {
    assert!(user_depth >= 1);
    assert!(system_depth >= 1);

    let (user_tx, user_rx) = mpsc::channel(user_depth);
    let (system_tx, system_rx) = mpsc::channel(system_depth);
    let disposed = Arc::new(AtomicBool::new(false));

    let sender = MailboxSender {
        user_tx,
        system_tx,
        disposed: disposed.clone(),
    };
    let mailbox = Mailbox {
        user_rx,
        system_rx,
        disposed,
    };
    (sender, mailbox)
}

impl Mailbox {
    /// Dequeue the next message, system lane first
    ///
    /// Returns None once the mailbox is disposed or every sender is gone.
    pub(crate) async fn next(&mut self) -> Option<Received> {
        if self.disposed.load(Ordering::Acquire) {
            return None;
        }

        // Drain the system lane before even looking at user traffic.
        match self.system_rx.try_recv() {
            Ok(message) => return Some(Received::System(message)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        tokio::select! {
            biased;
            message = self.system_rx.recv() => message.map(Received::System),
            message = self.user_rx.recv() => message.map(Received::User),
        }
    }

    /// Stop all delivery, dropping anything still buffered
    #[cfg(test)]
    pub(crate) fn dispose(&mut self) {
        self.disposed.store(true, Ordering::Release);
        self.user_rx.close();
        self.system_rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::{ActorRole, Pid};

    fn test_pid() -> Pid {
        let (sender, _mailbox) = channel(8, 8);
        Pid::new(sender, ActorRole::Worker)
    }

    #[tokio::test]
    async fn test_user_messages_are_fifo() {
        let (sender, mut mailbox) = channel(8, 8);

        for n in 0u64..3 {
            sender.send_user(Box::new(n)).await;
        }

        for expected in 0u64..3 {
            match mailbox.next().await {
                Some(Received::User(payload)) => {
                    assert_eq!(*payload.downcast::<u64>().unwrap(), expected);
                }
                other => panic!("expected user message, got {}", kind_of(&other)),
            }
        }
    }

    #[tokio::test]
    async fn test_system_lane_overtakes_user_lane() {
        let (sender, mut mailbox) = channel(8, 8);

        sender.send_user(Box::new(1u64)).await;
        sender
            .send_system(SystemMessage::Shutdown { parent: test_pid() })
            .await;

        assert!(matches!(
            mailbox.next().await,
            Some(Received::System(SystemMessage::Shutdown { .. }))
        ));
        assert!(matches!(mailbox.next().await, Some(Received::User(_))));
    }

    #[tokio::test]
    async fn test_disposed_mailbox_drops_buffered_messages() {
        let (sender, mut mailbox) = channel(8, 8);

        sender.send_user(Box::new(1u64)).await;
        mailbox.dispose();

        assert!(mailbox.next().await.is_none());
        assert!(sender.is_disposed());
    }

    #[tokio::test]
    async fn test_send_after_dispose_is_silent() {
        let (sender, mut mailbox) = channel(8, 8);

        sender.mark_disposed();
        sender.send_user(Box::new(1u64)).await;
        assert!(sender.try_send_user(Box::new(2u64)));

        assert!(mailbox.next().await.is_none());
    }

    #[tokio::test]
    async fn test_try_send_reports_full_lane() {
        let (sender, _mailbox) = channel(1, 1);

        assert!(sender.try_send_user(Box::new(1u64)));
        assert!(!sender.try_send_user(Box::new(2u64)));
    }

    fn kind_of(received: &Option<Received>) -> &'static str {
        match received {
            None => "none",
            Some(Received::User(_)) => "user",
            Some(Received::System(_)) => "system",
        }
    }
}
