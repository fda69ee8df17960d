//! Deferred - Single-assignment result handle
//!
//! A [`Completer`] resolves its [`Deferred`] at most once: `complete` takes
//! the completer by value, so a second resolution cannot be written.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use lite_domain::{RepositoryError, RepositoryResult};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Create a linked completer/deferred pair
pub fn deferred<T>() -> (Completer<T>, Deferred<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completer { tx },
        Deferred {
            state: State::Pending(rx),
        },
    )
}

/// The write side of a deferred result
#[derive(Debug)]
pub struct Completer<T> {
    tx: oneshot::Sender<RepositoryResult<T>>,
}

impl<T> Completer<T> {
    /// Resolve the deferred result.
    ///
    /// Returns `false` when the [`Deferred`] was already dropped; the
    /// outcome is discarded in that case.
    pub fn complete(self, outcome: RepositoryResult<T>) -> bool {
        match self.tx.send(outcome) {
            Ok(()) => true,
            Err(_) => {
                debug!("Deferred result dropped before completion, outcome discarded");
                false
            }
        }
    }

    /// True if nobody is waiting for the result anymore
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The read side of a deferred result.
///
/// Resolves to [`RepositoryError::Abandoned`] if its completer is dropped
/// without completing (for example because the task driving it panicked).
#[derive(Debug)]
pub struct Deferred<T> {
    state: State<T>,
}

#[derive(Debug)]
enum State<T> {
    Pending(oneshot::Receiver<RepositoryResult<T>>),
    Ready(Option<RepositoryResult<T>>),
}

// No structural pinning: the outcome is only ever moved out.
impl<T> Unpin for Deferred<T> {}

impl<T> Deferred<T> {
    /// An already-resolved deferred
    pub fn ready(outcome: RepositoryResult<T>) -> Self {
        Self {
            state: State::Ready(Some(outcome)),
        }
    }

    /// Run `operation` on the current Tokio runtime and defer its outcome.
    ///
    /// The operation runs to completion even if the returned handle is
    /// dropped. Outside a runtime the handle resolves to a transport error.
    pub fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = RepositoryResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                return Self::ready(Err(RepositoryError::Transport {
                    message: format!("no Tokio runtime to drive the operation: {}", err),
                }));
            }
        };

        let (completer, deferred) = deferred();
        handle.spawn(async move {
            completer.complete(operation.await);
        });
        deferred
    }
}

impl<T> Future for Deferred<T> {
    type Output = RepositoryResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let received = match &mut this.state {
            State::Ready(outcome) => {
                return Poll::Ready(outcome.take().unwrap_or(Err(RepositoryError::Abandoned)));
            }
            State::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(received) => received,
                Poll::Pending => return Poll::Pending,
            },
        };

        this.state = State::Ready(None);
        match received {
            Ok(outcome) => Poll::Ready(outcome),
            Err(_) => {
                warn!("Deferred completer dropped without a result");
                Poll::Ready(Err(RepositoryError::Abandoned))
            }
        }
    }
}
