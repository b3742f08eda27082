use std::fmt;

use serde::Serialize;

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// What started a daily flow run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Schedule,
    Manual,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Schedule => "schedule",
            TriggerKind::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search-phase record: identifies a person but does not reveal contact fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadCandidate {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub organization_name: String,
}

/// Flattened, partially enriched view of a person returned by search + enrich.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadSummary {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub organization_name: String,
    pub external_id: String,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
}

impl LeadSummary {
    /// Best display name: the provider's full name, else first + last.
    pub fn display_name(&self) -> String {
        if !self.full_name.trim().is_empty() {
            return self.full_name.trim().to_string();
        }
        let joined = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        joined.trim().to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Success,
    Failed,
}

/// Summary produced by the business-logic step and embedded in notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyFlowResult {
    pub status: FlowStatus,
    /// RFC 3339 instant (UTC).
    pub timestamp: String,
    pub trigger: TriggerKind,
    pub message: String,
}
