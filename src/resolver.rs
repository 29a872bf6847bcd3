use std::sync::Arc;

use tracing::{debug, warn};

use crate::replies;
use crate::responder::Responder;

/// Built-in commands answered without the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stats,
}

impl Command {
    /// Case-insensitive match on already trimmed text.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "/start" | "start" | "начать" => Some(Command::Start),
            "/help" | "help" | "помощь" => Some(Command::Help),
            "/stats" | "статистика" => Some(Command::Stats),
            _ => None,
        }
    }

    pub fn reply(self) -> &'static str {
        match self {
            Command::Start => replies::welcome(),
            Command::Help => replies::help(),
            Command::Stats => replies::stats(),
        }
    }
}

/// Produces a reply for any input text. Never fails.
pub struct Resolver {
    responder: Arc<dyn Responder>,
}

impl Resolver {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self { responder }
    }

    pub async fn resolve(&self, text: &str) -> String {
        let query = text.trim();
        if query.is_empty() {
            return replies::greeting().to_string();
        }

        if let Some(command) = Command::parse(query) {
            debug!("Matched built-in command {:?}", command);
            return command.reply().to_string();
        }

        match self.responder.respond(query).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                warn!("Responder returned a blank reply for '{}'", query);
                replies::fallback().to_string()
            }
            Err(e) => {
                warn!("Responder failed for '{}': {}", query, e);
                replies::fallback().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResponderError;
    use crate::test_support::FakeResponder;

    fn resolver(responder: &Arc<FakeResponder>) -> Resolver {
        Resolver::new(responder.clone())
    }

    #[tokio::test]
    async fn test_empty_text_gets_greeting() {
        let responder = FakeResponder::replying("unused");
        let resolver = resolver(&responder);

        assert_eq!(resolver.resolve("").await, replies::greeting());
        assert_eq!(resolver.resolve(" \n\t").await, replies::greeting());
        assert_eq!(responder.calls(), 0);
    }

    #[tokio::test]
    async fn test_commands_skip_responder() {
        let responder = FakeResponder::replying("unused");
        let resolver = resolver(&responder);

        assert_eq!(resolver.resolve("  /Help  ").await, replies::help());
        assert_eq!(resolver.resolve("Начать").await, replies::welcome());
        assert_eq!(resolver.resolve("START").await, replies::welcome());
        assert_eq!(resolver.resolve("ПОМОЩЬ").await, replies::help());
        assert_eq!(resolver.resolve("/stats").await, replies::stats());
        assert_eq!(resolver.resolve("Статистика").await, replies::stats());
        assert_eq!(responder.calls(), 0);
    }

    #[tokio::test]
    async fn test_responder_gets_trimmed_user_text() {
        let responder = FakeResponder::replying("Ответ X");
        let resolver = resolver(&responder);

        let reply = resolver.resolve("  Льготы для инвалидов 2 группы ").await;

        assert_eq!(reply, "Ответ X");
        assert_eq!(
            responder.queries(),
            vec!["Льготы для инвалидов 2 группы".to_string()]
        );
    }

    #[tokio::test]
    async fn test_responder_failure_becomes_fallback() {
        let responder = FakeResponder::failing(|| ResponderError::Exit {
            code: Some(1),
            stderr: "Traceback".to_string(),
        });
        let resolver = resolver(&responder);

        assert_eq!(resolver.resolve("foo").await, replies::fallback());
        assert_eq!(resolver.resolve("bar").await, replies::fallback());
    }

    #[tokio::test]
    async fn test_blank_responder_reply_becomes_fallback() {
        let responder = FakeResponder::replying("   ");
        assert_eq!(resolver(&responder).resolve("foo").await, replies::fallback());
    }

    #[tokio::test]
    async fn test_resolve_is_stable_under_trim() {
        let responder = FakeResponder::echoing();
        let resolver = resolver(&responder);

        for input in ["", "   ", " /HELP ", "\tстатистика\n", "  парковка  ", "foo"] {
            assert_eq!(
                resolver.resolve(input.trim()).await,
                resolver.resolve(input).await,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/START"), Some(Command::Start));
        assert_eq!(Command::parse("help me"), None);
        assert_eq!(Command::parse("stats"), None);
    }
}
