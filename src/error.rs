use std::sync::Arc;

use tokio::sync::{mpsc::error::SendError, oneshot::error::RecvError};

use crate::{Actor, envelope::Ingress};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction or `on_activated` failed. The dispatcher stays inactive;
    /// the next message retries activation from scratch.
    #[error("Actor activation failed: {0}")]
    ActivationFailed(Arc<str>),

    #[error("No actor factory registered for '{0}'")]
    FactoryMissing(&'static str),

    #[error("The mailbox has been closed.")]
    MailboxClosed,

    #[error("The ask was dropped before a response was produced.")]
    AskDropped,

    #[error("The actor system has been shut down.")]
    SystemUnavailable,

    #[error("Expected stream version {expected}, found {actual}.")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Error external to Geiko occured: {0}")]
    External(Arc<str>),
}

impl Error {
    /// Wrap an application-level failure so it can flow through handler
    /// results and ask replies.
    pub fn external(message: impl Into<Arc<str>>) -> Self {
        Error::External(message.into())
    }
}

impl<A: Actor> From<SendError<Ingress<A>>> for Error {
    fn from(_: SendError<Ingress<A>>) -> Self {
        Error::MailboxClosed
    }
}

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Error::AskDropped
    }
}
