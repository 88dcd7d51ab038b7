//! Per-call cancellation token bound to a hard deadline.
//!
//! A [`Deadline`] is created right before an outbound call and owns a fresh
//! child [`CancellationToken`]. The token is cancelled when the deadline expires and,
//! through a drop guard, whenever the `Deadline` goes out of scope, so every
//! exit path of the caller releases the call. Cancelling the parent token
//! cancels every deadline started under it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Why a guarded future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    #[error("deadline of {0:?} exceeded")]
    Exceeded(Duration),
    #[error("call cancelled")]
    Cancelled,
}

pub struct Deadline {
    limit: Duration,
    expires_at: Instant,
    token: CancellationToken,
    _guard: DropGuard,
}

impl Deadline {
    /// Starts the clock now under `parent`.
    pub fn start_within(parent: &CancellationToken, limit: Duration) -> Self {
        let token = parent.child_token();
        let guard = token.clone().drop_guard();
        Self {
            limit,
            expires_at: Instant::now() + limit,
            token,
            _guard: guard,
        }
    }

    /// Handle that observes (or triggers) cancellation of this call.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drives `fut` until it completes, the deadline passes, or the token is
    /// cancelled. On expiry the token is cancelled and `fut` is dropped.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DeadlineError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DeadlineError::Cancelled),
            out = tokio::time::timeout_at(self.expires_at, fut) => match out {
                Ok(value) => Ok(value),
                Err(_) => {
                    self.token.cancel();
                    Err(DeadlineError::Exceeded(self.limit))
                }
            },
        }
    }
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("limit", &self.limit)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
