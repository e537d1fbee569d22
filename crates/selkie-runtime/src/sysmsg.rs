//! Message and exit-signal types
//!
//! TigerStyle: closed sums instead of open-ended dynamic dispatch. User
//! payloads stay dynamically typed, but everything the runtime itself acts
//! on is an explicit enum variant.

use std::fmt;

use crate::mailbox::AnyMessage;
use crate::pid::Pid;

/// How a terminated actor was related to the recipient of its exit signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The recipient was linked to the terminated actor
    Linked,
    /// The recipient was monitoring the terminated actor
    Monitored,
}

/// Why an actor terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The actor's body returned
    Normal,
    /// The actor's body panicked
    Panicked { details: String },
    /// The actor was killed by a shutdown request or an exit cascade
    Killed,
    /// A supervisor exhausted its restart budget
    MaxRestartsReached,
}

impl ExitReason {
    /// Whether this reason counts as a voluntary, non-fault termination
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Whether an untrapped linked peer must die on receiving this reason
    pub(crate) fn is_lethal(&self) -> bool {
        matches!(self, Self::Panicked { .. } | Self::Killed)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Panicked { details } => write!(f, "panicked: {}", details),
            Self::Killed => write!(f, "killed"),
            Self::MaxRestartsReached => write!(f, "max restarts reached"),
        }
    }
}

/// An exit signal describing one actor's termination
#[derive(Debug, Clone)]
pub struct Exit {
    /// The actor that terminated
    pub who: Pid,
    /// The actor whose termination caused this one, for cascades
    pub parent: Option<Pid>,
    /// Why it terminated
    pub reason: ExitReason,
    /// How `who` relates to the recipient
    pub relation: Relation,
}

/// Messages carried on the system lane of a mailbox
///
/// These never surface to user code directly; the receive loop intercepts
/// them and either mutates actor bookkeeping, forwards a [`Message`], or
/// terminates the actor.
#[derive(Debug)]
pub(crate) enum SystemMessage {
    /// A linked or monitored peer terminated
    Exit(Exit),
    /// A supervisor (or peer) asks this actor to stop
    Shutdown { parent: Pid },
    /// `parent` starts (or, with `revert`, stops) monitoring this actor
    Monitor { parent: Pid, revert: bool },
    /// Establish (or, with `revert`, dissolve) a link with `to`
    Link { to: Pid, revert: bool },
}

/// What an actor's receive loop hands to user code
pub enum Message {
    /// An application payload, downcast it to the expected type
    User(AnyMessage),
    /// A linked (trap_exit) or monitored peer terminated
    Exit(Exit),
    /// A shutdown request observed because trap_exit is set
    Shutdown { parent: Pid },
    /// No message arrived within the receive_timeout window
    Timeout,
}

impl Message {
    /// Downcast a user payload, handing the message back on mismatch
    pub fn into_user<T: 'static>(self) -> std::result::Result<Box<T>, Message> {
        match self {
            Message::User(payload) => payload.downcast::<T>().map_err(Message::User),
            other => Err(other),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::User(_) => f.write_str("User(..)"),
            Message::Exit(exit) => f.debug_tuple("Exit").field(exit).finish(),
            Message::Shutdown { parent } => {
                f.debug_struct("Shutdown").field("parent", parent).finish()
            }
            Message::Timeout => f.write_str("Timeout"),
        }
    }
}
