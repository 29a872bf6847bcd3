//! Fakes shared by the pipeline tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PlatformError, ResponderError};
use crate::platform::{BotIdentity, IncomingMessage, Platform, ReplyRequest, Update, UpdateBatch};
use crate::responder::Responder;
use crate::scope::Scope;

type Outcome = Box<dyn Fn(&str) -> Result<String, ResponderError> + Send + Sync>;

pub struct FakeResponder {
    outcome: Outcome,
    delay: Duration,
    queries: Mutex<Vec<String>>,
}

impl FakeResponder {
    fn build(outcome: Outcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Arc::new(Self::build(Box::new(move |_| Ok(reply.clone()))))
    }

    pub fn echoing() -> Arc<Self> {
        Arc::new(Self::build(Box::new(|q| Ok(format!("echo: {}", q)))))
    }

    pub fn failing<F>(error: F) -> Arc<Self>
    where
        F: Fn() -> ResponderError + Send + Sync + 'static,
    {
        Arc::new(Self::build(Box::new(move |_| Err(error()))))
    }

    /// Fails for `bad` queries and echoes everything else.
    pub fn failing_on(bad: &[&str]) -> Arc<Self> {
        let bad: HashSet<String> = bad.iter().map(|s| s.to_string()).collect();
        Arc::new(Self::build(Box::new(move |q| {
            if bad.contains(q) {
                Err(ResponderError::Exit {
                    code: Some(1),
                    stderr: "crash".to_string(),
                })
            } else {
                Ok(format!("echo: {}", q))
            }
        })))
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        let reply = reply.to_string();
        let mut responder = Self::build(Box::new(move |_| Ok(reply.clone())));
        responder.delay = delay;
        Arc::new(responder)
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for FakeResponder {
    async fn respond(&self, query: &str) -> Result<String, ResponderError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)(query)
    }
}

/// Records every reply that reached `send`.
#[derive(Default)]
pub struct FakePlatform {
    pub sent: Mutex<Vec<ReplyRequest>>,
    pub send_attempts: AtomicUsize,
    pub send_delay: Duration,
    pub failing_chats: HashSet<i64>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_send_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            send_delay: delay,
            ..Self::default()
        })
    }

    pub fn failing_for(chats: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            failing_chats: chats.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<ReplyRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn fetch_identity(&self, _scope: &Scope) -> Result<BotIdentity, PlatformError> {
        Ok(BotIdentity {
            user_id: 1,
            name: "fake".to_string(),
            username: None,
        })
    }

    async fn poll_updates(
        &self,
        scope: &Scope,
        _marker: Option<i64>,
    ) -> Result<UpdateBatch, PlatformError> {
        Err(scope.done().await.into())
    }

    async fn send(&self, scope: &Scope, reply: &ReplyRequest) -> Result<(), PlatformError> {
        scope.check()?;
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.send_delay.is_zero() {
            scope.run(tokio::time::sleep(self.send_delay)).await?;
        }
        if self.failing_chats.contains(&reply.chat_id) {
            return Err(PlatformError::Send("chat not found".to_string()));
        }
        self.sent.lock().unwrap().push(reply.clone());
        Ok(())
    }
}

pub fn message(sender_id: i64, chat_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        sender_id,
        chat_id,
        text: text.to_string(),
    }
}

pub fn created(sender_id: i64, chat_id: i64, text: &str) -> Update {
    Update::MessageCreated(message(sender_id, chat_id, text))
}
