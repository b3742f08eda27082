//! Telegram adapter (teloxide).
//!
//! This crate implements the `leadflow-core` MessagingPort over Telegram Bot API
//! and feeds inbound messages to `ChatService`.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

pub mod router;

use leadflow_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    // Single attempt: a RetryAfter from Telegram surfaces as a delivery error.
    fn map_err(e: teloxide::RequestError) -> Error {
        Error::ChatDelivery(format!("telegram error: {e}"))
    }

    fn msg_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await
            .map_err(Self::map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_map_to_chat_delivery() {
        let e = TelegramMessenger::map_err(teloxide::RequestError::RetryAfter(
            std::time::Duration::from_secs(3),
        ));
        assert_eq!(e.kind(), "chat");
        assert!(e.to_string().contains("telegram error"));
    }

    #[test]
    fn capabilities_match_bot_api_limits() {
        let m = TelegramMessenger::new(Bot::new("123:abc"));
        let caps = m.capabilities();
        assert_eq!(caps.max_message_len, 4096);
    }
}
