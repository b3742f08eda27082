use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound side of the chat interface.
///
/// Implementations report failures as `Error::ChatDelivery` and never retry.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Plain text, no markup interpretation.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Telegram HTML subset (`<b>`, `<i>`, `<a href>`, `<code>`).
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
}
