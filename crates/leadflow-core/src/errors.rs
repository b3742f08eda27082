/// Core error type for the bot.
///
/// Adapter crates map their provider-specific failures into one of these
/// variants. Only `Config` is fatal; every other variant is logged and
/// swallowed at the call site that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("lead search failed: {0}")]
    LeadSearch(String),

    #[error("chat delivery failed: {0}")]
    ChatDelivery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short label used in operator logs and flow summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::MailDelivery(_) => "mail",
            Error::Calendar(_) => "calendar",
            Error::LeadSearch(_) => "lead_search",
            Error::ChatDelivery(_) => "chat",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
