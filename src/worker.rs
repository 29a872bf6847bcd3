use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{PlatformError, ScopeError};
use crate::platform::{IncomingMessage, Platform, ReplyRequest};
use crate::resolver::Resolver;
use crate::scope::Scope;

/// How one message ended. Failures are already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Sent,
    SendFailed,
    Cancelled,
    DeadlineExceeded,
}

impl From<ScopeError> for WorkerOutcome {
    fn from(reason: ScopeError) -> Self {
        match reason {
            ScopeError::Cancelled => WorkerOutcome::Cancelled,
            ScopeError::DeadlineExceeded => WorkerOutcome::DeadlineExceeded,
        }
    }
}

/// Resolves and answers a single message within its own deadline.
pub struct Worker {
    platform: Arc<dyn Platform>,
    resolver: Arc<Resolver>,
    deadline: Duration,
}

impl Worker {
    pub fn new(platform: Arc<dyn Platform>, resolver: Arc<Resolver>, deadline: Duration) -> Self {
        Self {
            platform,
            resolver,
            deadline,
        }
    }

    /// Never fails: every error is logged with the sender id and swallowed.
    pub async fn handle_message(&self, root: &Scope, msg: IncomingMessage) -> WorkerOutcome {
        let scope = root.child(self.deadline);
        let sender = msg.sender_id;
        info!("Message from user {}: {}", sender, msg.text);

        let reply = match scope.run(self.resolver.resolve(&msg.text)).await {
            Ok(reply) => reply,
            Err(reason) => {
                warn!("Dropped message from user {} before reply was ready: {}", sender, reason);
                return reason.into();
            }
        };

        let request = ReplyRequest {
            chat_id: msg.chat_id,
            text: reply,
        };

        match scope.run(self.platform.send(&scope, &request)).await {
            Ok(Ok(())) => {
                info!("Reply sent to user {}", sender);
                WorkerOutcome::Sent
            }
            Err(reason) | Ok(Err(PlatformError::Scope(reason))) => {
                warn!("Reply to user {} abandoned: {}", sender, reason);
                reason.into()
            }
            Ok(Err(e)) => {
                error!("Failed to reply to user {}: {}", sender, e);
                WorkerOutcome::SendFailed
            }
        }
    }
}
