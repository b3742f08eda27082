use std::{env, path::Path, time::Duration};

use chrono_tz::Tz;

use crate::{domain::ChatId, errors::Error, Result};

/// Required for the bot process. Checked together so the operator sees every
/// missing name in one error.
const REQUIRED_VARS: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "GOOGLE_CLIENT_ID",
    "GOOGLE_CLIENT_SECRET",
    "GOOGLE_REDIRECT_URI",
    "GOOGLE_REFRESH_TOKEN",
    "GMAIL_SENDER",
    "APOLLO_API_KEY",
];

/// Google OAuth2 client identity plus the long-lived refresh token.
#[derive(Clone, Debug)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: String,
}

/// How outbound mail leaves the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailTransport {
    /// Gmail REST API, authorized by the Google refresh token.
    GmailApi,
    /// SMTP submission as `GMAIL_SENDER` with an app password.
    Smtp { host: String, password: String },
}

/// Typed configuration for the bot. Read once at startup, never reloaded.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub notify_chat_id: Option<ChatId>,

    // Google
    pub google: GoogleCredentials,
    pub gmail_sender: String,
    pub mail_transport: MailTransport,
    pub mail_to: String,
    pub calendar_id: String,
    pub calendar_attendees: Vec<String>,

    // Apollo
    pub apollo_api_key: String,

    // Schedule
    /// Raw "HH:mm"; validated by the daily scheduler at startup.
    pub daily_time: String,
    pub timezone: Tz,

    // Chat sessions
    pub pending_step_ttl: Duration,
}

impl Config {
    /// Load from the process environment, after an optional `.env` file.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|k| get(k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let notify_chat_id = match get("TELEGRAM_NOTIFY_CHAT_ID") {
            Some(raw) => Some(ChatId(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("TELEGRAM_NOTIFY_CHAT_ID is not a chat id: {raw}"))
            })?)),
            None => None,
        };

        let tz_name = get("TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let timezone = tz_name
            .trim()
            .parse::<Tz>()
            .map_err(|_| Error::Config(format!("TIMEZONE is not a known time zone: {tz_name}")))?;

        let gmail_sender = required("GMAIL_SENDER").trim().to_string();
        // An app password selects SMTP over the Gmail API.
        let mail_transport = match get("GMAIL_PASS") {
            Some(password) => MailTransport::Smtp {
                host: get("SMTP_HOST")
                    .map(|h| h.trim().to_string())
                    .unwrap_or_else(|| "smtp.gmail.com".to_string()),
                password,
            },
            None => MailTransport::GmailApi,
        };
        let mail_to = get("MAIL_TO")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| gmail_sender.clone());

        let pending_step_ttl = match get("PENDING_STEP_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("PENDING_STEP_TTL_SECS is not a number: {raw}"))
            })?),
            None => Duration::from_secs(600),
        };

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN").trim().to_string(),
            notify_chat_id,
            google: GoogleCredentials {
                client_id: required("GOOGLE_CLIENT_ID").trim().to_string(),
                client_secret: required("GOOGLE_CLIENT_SECRET").trim().to_string(),
                redirect_uri: required("GOOGLE_REDIRECT_URI").trim().to_string(),
                refresh_token: required("GOOGLE_REFRESH_TOKEN").trim().to_string(),
            },
            gmail_sender,
            mail_transport,
            mail_to,
            calendar_id: get("GOOGLE_CALENDAR_ID")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "primary".to_string()),
            calendar_attendees: parse_csv(get("CALENDAR_ATTENDEES")),
            apollo_api_key: required("APOLLO_API_KEY").trim().to_string(),
            daily_time: get("DEFAULT_DAILY_TIME").unwrap_or_else(|| "09:00".to_string()),
            timezone,
            pending_step_ttl,
        })
    }
}

/// Settings for the one-time OAuth bootstrap tool.
#[derive(Clone, Debug)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub port: u16,
}

impl OAuthAppConfig {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let (Some(client_id), Some(client_secret), Some(redirect_uri)) = (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_REDIRECT_URI"),
        ) else {
            return Err(Error::Config(
                "Set GOOGLE_CLIENT_ID/SECRET/REDIRECT_URI in .env first.".to_string(),
            ));
        };

        let port = match get("OAUTH_HELPER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("OAUTH_HELPER_PORT is not a port: {raw}")))?,
            None => 3000,
        };

        Ok(Self {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
            redirect_uri: redirect_uri.trim().to_string(),
            port,
        })
    }
}

/// Existing environment variables always win over `.env` entries.
fn load_dotenv_if_present(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable .env"),
    }
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
