//! # siren-assist
//!
//! The emergency Q&A service, entirely independent of the request
//! lifecycle: a keyword lookup against a static knowledge base builds a
//! context string prepended to the user's message, which is then forwarded
//! to a hosted chat-completion API with a fixed system prompt and token
//! budget. Any upstream failure produces a static apology reply; assist
//! never fails a caller.

pub mod client;
pub mod knowledge;

pub use client::{ChatMessage, CompletionClient, CompletionConfig};
pub use knowledge::KnowledgeBase;

/// System prompt sent when no prior conversation is supplied.
pub const SYSTEM_PROMPT: &str = "You are an emergency response chatbot. Provide concise and \
    helpful responses in plain language. Avoid repeating emergency advice unless absolutely \
    necessary. If the user is in India or mentions India, advise to dial 112 instead of 911 \
    only when needed.";

/// Reply used whenever the upstream cannot produce one.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process your request.";

/// Errors internal to the assist crate.
///
/// These never reach an end user: the service layer converts every failure
/// into [`FALLBACK_REPLY`].
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// Knowledge base file could not be read.
    #[error("knowledge base unreadable: {0}")]
    Io(#[from] std::io::Error),
    /// Knowledge base JSON did not parse.
    #[error("knowledge base malformed: {0}")]
    Parse(#[from] serde_json::Error),
    /// HTTP client construction failed.
    #[error("client error: {0}")]
    Client(String),
    /// The completion endpoint failed or answered unusably.
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// The assist service: knowledge lookup plus completion, with a fallback.
pub struct AssistService {
    knowledge: KnowledgeBase,
    client: CompletionClient,
}

impl AssistService {
    /// Wires the service from a loaded knowledge base and a client.
    #[must_use]
    pub fn new(knowledge: KnowledgeBase, client: CompletionClient) -> Self {
        Self { knowledge, client }
    }

    /// Answers an emergency question.
    ///
    /// `conversation` carries prior turns when the console maintains
    /// context; without it, the fixed system prompt frames the exchange.
    /// This method always returns a reply.
    pub async fn answer(&self, message: &str, conversation: Option<&[ChatMessage]>) -> String {
        let context = self.knowledge.context_for(message);
        let messages = build_messages(message, context, conversation);

        match self.client.complete(&messages).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "assist upstream failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

/// Builds the outgoing message list.
///
/// The knowledge context, when present, is prepended to the user message;
/// a supplied conversation replaces the fixed system prompt.
#[must_use]
pub fn build_messages(
    message: &str,
    context: Option<&str>,
    conversation: Option<&[ChatMessage]>,
) -> Vec<ChatMessage> {
    let full_prompt = match context {
        Some(context) => format!("{context}\nUser: {message}"),
        None => message.to_string(),
    };

    match conversation {
        Some(history) => {
            let mut messages = history.to_vec();
            messages.push(ChatMessage::user(full_prompt));
            messages
        }
        None => vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(full_prompt),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_conversations_start_with_the_system_prompt() {
        let messages = build_messages("is 911 the right number", None, None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].content, "is 911 the right number");
    }

    #[test]
    fn knowledge_context_prefixes_the_user_message() {
        let messages = build_messages("how to stop bleeding", Some("Apply pressure."), None);
        assert_eq!(
            messages[1].content,
            "Apply pressure.\nUser: how to stop bleeding"
        );
    }

    #[test]
    fn prior_conversation_is_extended_not_reframed() {
        let history = vec![
            ChatMessage::system("earlier prompt"),
            ChatMessage::user("earlier question"),
        ];
        let messages = build_messages("follow up", None, Some(&history));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "earlier prompt");
        assert_eq!(messages[2].content, "follow up");
    }

    #[tokio::test]
    async fn unreachable_upstream_degrades_to_the_fallback_reply() {
        let client = CompletionClient::new(CompletionConfig {
            // Nothing listens here; the request fails fast.
            api_url: "http://127.0.0.1:1/chat/completions".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            max_tokens: 16,
            timeout: Duration::from_millis(500),
        })
        .expect("client");
        let service = AssistService::new(KnowledgeBase::default(), client);

        let reply = service.answer("anyone there?", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }
}
