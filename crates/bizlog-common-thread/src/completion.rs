//! One-shot completion handles for work handed to the pool.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Create a linked completer/completion pair.
pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (Completer { sender }, Completion { receiver })
}

/// Producing side; consumed when the value is delivered.
#[derive(Debug)]
pub struct Completer<T> {
    sender: Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the value. Ignored if the [`Completion`] was dropped.
    pub fn complete(self, value: T) {
        let _ = self.sender.send(value);
    }
}

/// Waiting side of a completion.
#[derive(Debug)]
pub struct Completion<T> {
    receiver: Receiver<T>,
}

/// Why a completion produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The task was dropped before it completed.
    #[error("task was abandoned before completion")]
    Abandoned,

    /// The wait timed out.
    #[error("timed out waiting for completion")]
    Timeout,
}

impl<T> Completion<T> {
    /// Block until the value arrives.
    pub fn wait(self) -> Result<T, CompletionError> {
        self.receiver.recv().map_err(|_| CompletionError::Abandoned)
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, CompletionError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => CompletionError::Timeout,
            RecvTimeoutError::Disconnected => CompletionError::Abandoned,
        })
    }

    /// Take the value if it is already available.
    pub fn try_get(&self) -> Option<Result<T, CompletionError>> {
        match self.receiver.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CompletionError::Abandoned)),
        }
    }
}
