pub mod max;

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::error::PlatformError;
use crate::scope::Scope;

/// A text message received from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender_id: i64,
    pub chat_id: i64,
    /// May be empty (attachments without a caption)
    pub text: String,
}

/// Platform event, narrowed to the one variant the bot acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    MessageCreated(IncomingMessage),
    /// Any other update, carrying the platform's type tag
    Other(String),
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub user_id: i64,
    pub name: String,
    pub username: Option<String>,
}

/// Result of one long poll.
#[derive(Debug, Default)]
pub struct UpdateBatch {
    pub updates: Vec<Update>,
    /// Cursor for the next poll; `None` keeps the previous one.
    pub marker: Option<i64>,
}

/// Narrow façade over a messaging platform's bot API.
///
/// Implementations must be safe for concurrent `send` calls; workers share
/// one handle.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn fetch_identity(&self, scope: &Scope) -> Result<BotIdentity, PlatformError>;

    async fn poll_updates(
        &self,
        scope: &Scope,
        marker: Option<i64>,
    ) -> Result<UpdateBatch, PlatformError>;

    async fn send(&self, scope: &Scope, reply: &ReplyRequest) -> Result<(), PlatformError>;
}

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Why an update stream ended. Unset when it stopped for shutdown.
#[derive(Debug, Clone, Default)]
pub struct StreamEnd(Arc<OnceLock<PlatformError>>);

impl StreamEnd {
    /// The platform error that closed the stream, if any.
    pub fn reason(&self) -> Option<&PlatformError> {
        self.0.get()
    }
}

struct PollState {
    platform: Arc<dyn Platform>,
    scope: Scope,
    marker: Option<i64>,
    buffered: VecDeque<Update>,
    backoff: Duration,
    end: StreamEnd,
}

/// Lazily long-poll `platform` until `scope` is cancelled or the platform
/// rejects the credential. Transient failures are retried with backoff.
///
/// The returned [`StreamEnd`] records the rejection so callers can tell it
/// apart from a shutdown.
pub fn update_stream(
    platform: Arc<dyn Platform>,
    scope: Scope,
) -> (BoxStream<'static, Update>, StreamEnd) {
    let end = StreamEnd::default();
    let state = PollState {
        platform,
        scope,
        marker: None,
        buffered: VecDeque::new(),
        backoff: INITIAL_BACKOFF,
        end: end.clone(),
    };

    let updates = stream::unfold(state, |mut st| async move {
        loop {
            if let Some(update) = st.buffered.pop_front() {
                return Some((update, st));
            }

            let polled = st
                .scope
                .run(st.platform.poll_updates(&st.scope, st.marker))
                .await;

            match polled {
                Err(_) | Ok(Err(PlatformError::Scope(_))) => {
                    info!("Update stream stopped: shutdown requested");
                    return None;
                }
                Ok(Ok(batch)) => {
                    debug!("Received {} update(s)", batch.updates.len());
                    st.backoff = INITIAL_BACKOFF;
                    if batch.marker.is_some() {
                        st.marker = batch.marker;
                    }
                    st.buffered.extend(batch.updates);
                }
                Ok(Err(e)) if e.is_auth() => {
                    error!("Update stream closed: {}", e);
                    let _ = st.end.0.set(e);
                    return None;
                }
                Ok(Err(e)) => {
                    warn!("Polling failed: {}. Retrying in {:?}", e, st.backoff);
                    if st.scope.run(tokio::time::sleep(st.backoff)).await.is_err() {
                        return None;
                    }
                    st.backoff = next_backoff(st.backoff);
                }
            }
        }
    })
    .boxed();

    (updates, end)
}
