use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ScopeError;

/// Hierarchical cancellation handle with an optional deadline.
///
/// A child inherits its parent's cancellation and deadline, and may only
/// tighten the deadline.
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Scope {
    /// A scope with no deadline; it ends only when cancelled.
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child that fires on the parent's cancellation or after `timeout`.
    pub fn child(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => Some(parent.min(own)),
            None => Some(own),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Why this scope is finished, or `None` while it is still live.
    pub fn check(&self) -> Result<(), ScopeError> {
        if self.is_cancelled() {
            Err(ScopeError::Cancelled)
        } else if self.is_expired() {
            Err(ScopeError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the scope is cancelled or its deadline passes.
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ScopeError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ScopeError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ScopeError::Cancelled
            }
        }
    }

    /// Run `fut` until it completes or the scope ends, whichever comes first.
    /// A scope that has already ended never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ScopeError> {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            out = fut => Ok(out),
        }
    }
}
