//! Hexagonal ports. Google, Apollo and Telegram live behind these traits in
//! adapter crates; the flows in this crate only see the traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{DailyFlowResult, LeadCandidate, LeadSummary, TriggerKind},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// One outbound email per call, single attempt.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Returns the provider message id.
    async fn send_mail(&self, mail: OutgoingMail) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Email addresses, possibly empty.
    pub attendees: Vec<String>,
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Returns the provider event id.
    async fn create_event(&self, event: NewEvent) -> Result<String>;
}

/// What the chat interface calls for `/getleads`.
#[async_trait]
pub trait LeadSearch: Send + Sync {
    async fn find_leads(&self, titles: &[String]) -> Result<Vec<LeadSummary>>;
}

/// The two raw calls of a people-search provider.
#[async_trait]
pub trait LeadSearchBackend: Send + Sync {
    async fn search(&self, titles: &[String], per_page: usize) -> Result<Vec<LeadCandidate>>;

    /// Reveal contact fields for candidates. Output order is provider-defined.
    async fn bulk_enrich(&self, candidates: &[LeadCandidate]) -> Result<Vec<LeadSummary>>;
}

/// The business-logic step of the daily flow.
#[async_trait]
pub trait DailyTask: Send + Sync {
    async fn run(&self, trigger: TriggerKind) -> Result<DailyFlowResult>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
