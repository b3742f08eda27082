use crate::domain::ChatId;

/// Inbound update, already stripped of provider-specific fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
}

impl IncomingUpdate {
    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(c) => c.chat_id,
            IncomingUpdate::Text(t) => t.chat_id,
        }
    }

    /// Classify raw message text: `/cmd@bot args` becomes a command.
    pub fn from_text(chat_id: ChatId, username: Option<String>, text: &str) -> Self {
        if text.trim_start().starts_with('/') {
            let (name, args) = parse_command(text);
            return IncomingUpdate::Command(Command {
                chat_id,
                username,
                name,
                args,
            });
        }
        IncomingUpdate::Text(TextMessage {
            chat_id,
            username,
            text: text.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub chat_id: ChatId,
    pub username: Option<String>,
    /// Lowercased, without the leading slash or `@botname` suffix.
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub text: String,
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// In characters, after markup is parsed.
    pub max_message_len: usize,
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_bot_suffix_and_args() {
        let u = IncomingUpdate::from_text(ChatId(1), None, "/GetLeads@lead_bot cto, founder");
        let IncomingUpdate::Command(c) = u else {
            panic!("expected command");
        };
        assert_eq!(c.name, "getleads");
        assert_eq!(c.args, "cto, founder");
    }

    #[test]
    fn plain_text_is_not_a_command() {
        let u = IncomingUpdate::from_text(ChatId(7), None, "alpha, beta");
        assert_eq!(u.chat_id(), ChatId(7));
        assert!(matches!(u, IncomingUpdate::Text(t) if t.text == "alpha, beta"));
    }
}
