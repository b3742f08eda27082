//! Inbound update dispatcher for the chat interface.
//!
//! Routes commands by name and freeform text by the chat's pending step.
//! Updates for one chat are handled one at a time (`ChatLocks`); different
//! chats proceed concurrently.

use std::sync::Arc;

use crate::{
    domain::{ChatId, TriggerKind},
    formatting::{format_lead_list, truncate_chars},
    leads::parse_titles,
    messaging::{
        port::MessagingPort,
        types::{Command, IncomingUpdate, TextMessage},
    },
    orchestrator::DailyFlow,
    ports::{Clock, LeadSearch},
    session::{ChatLocks, ChatSessions, PendingStep},
    Result,
};

pub const WELCOME_TEXT: &str = "Welcome! I can find leads and run the daily automation.\n\n\
/getleads - search leads by job title\n\
/ping - check that I'm alive\n\
/schedule_demo - run the daily automation now\n\
/cancel - cancel a pending question";
pub const ASK_TITLES_TEXT: &str =
    "Please enter job titles separated by commas, e.g., business, product";
pub const NO_LEADS_TEXT: &str = "No leads found.";
pub const LEADS_ERROR_TEXT: &str = "Error fetching leads. Check logs for details.";
pub const NO_TITLES_TEXT: &str = "No job titles given. Send /getleads to try again.";

pub struct ChatService {
    messenger: Arc<dyn MessagingPort>,
    leads: Arc<dyn LeadSearch>,
    flow: Arc<DailyFlow>,
    sessions: ChatSessions,
    locks: ChatLocks,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        leads: Arc<dyn LeadSearch>,
        flow: Arc<DailyFlow>,
        sessions: ChatSessions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messenger,
            leads,
            flow,
            sessions,
            locks: ChatLocks::default(),
            clock,
        }
    }

    /// Handle one update. Never fails: delivery errors are logged and dropped.
    pub async fn handle(&self, update: IncomingUpdate) {
        let chat_id = update.chat_id();
        let _guard = self.locks.lock_chat(chat_id).await;

        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd).await,
            IncomingUpdate::Text(msg) => self.handle_text(msg).await,
        }
    }

    async fn handle_command(&self, cmd: Command) {
        let chat_id = cmd.chat_id;
        tracing::info!(chat_id = %chat_id, command = %cmd.name, user = ?cmd.username, "command");

        // Any command abandons a half-finished exchange.
        let had_pending = self.sessions.clear(chat_id, self.clock.now()).await;

        match cmd.name.as_str() {
            "start" | "help" => self.reply(chat_id, WELCOME_TEXT).await,
            "ping" => self.reply(chat_id, "pong").await,
            "getleads" => {
                let titles = parse_titles(&cmd.args);
                if titles.is_empty() {
                    self.sessions
                        .begin(chat_id, PendingStep::AwaitingTitles, self.clock.now())
                        .await;
                    self.reply(chat_id, ASK_TITLES_TEXT).await;
                } else {
                    self.search_and_reply(chat_id, titles).await;
                }
            }
            "schedule_demo" => {
                // The flow's own notification to this chat is the outcome reply.
                let report = self.flow.run(TriggerKind::Manual, Some(chat_id)).await;
                tracing::info!(
                    chat_id = %chat_id,
                    success = report.is_success(),
                    "manual daily flow finished"
                );
            }
            "cancel" => {
                let text = if had_pending {
                    "Cancelled."
                } else {
                    "Nothing to cancel."
                };
                self.reply(chat_id, text).await;
            }
            other => {
                tracing::debug!(chat_id = %chat_id, command = %other, "unknown command");
                self.reply(chat_id, "Unknown command. Try /start for the list.")
                    .await;
            }
        }
    }

    async fn handle_text(&self, msg: TextMessage) {
        let chat_id = msg.chat_id;
        match self.sessions.take_pending(chat_id, self.clock.now()).await {
            Some(PendingStep::AwaitingTitles) => {
                let titles = parse_titles(&msg.text);
                if titles.is_empty() {
                    self.reply(chat_id, NO_TITLES_TEXT).await;
                    return;
                }
                self.search_and_reply(chat_id, titles).await;
            }
            None => {
                tracing::debug!(chat_id = %chat_id, "ignoring text with no pending step");
            }
        }
    }

    async fn search_and_reply(&self, chat_id: ChatId, titles: Vec<String>) {
        let max_len = self.messenger.capabilities().max_message_len;
        let echo = format!("Searching leads for: {}", titles.join(", "));
        // Leave room for the "..." marker.
        self.reply(chat_id, &truncate_chars(&echo, max_len.saturating_sub(3)))
            .await;

        match self.leads.find_leads(&titles).await {
            Ok(leads) if leads.is_empty() => self.reply(chat_id, NO_LEADS_TEXT).await,
            Ok(leads) => {
                let html = format_lead_list(&leads, max_len);
                if let Err(e) = self.messenger.send_html(chat_id, &html).await {
                    tracing::error!(chat_id = %chat_id, kind = e.kind(), error = %e, "failed to send lead list");
                }
            }
            Err(e) => {
                tracing::error!(chat_id = %chat_id, titles = ?titles, kind = e.kind(), error = %e, "lead search failed");
                self.reply(chat_id, LEADS_ERROR_TEXT).await;
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.send(chat_id, text).await {
            tracing::error!(chat_id = %chat_id, kind = e.kind(), error = %e, "failed to send reply");
        }
    }

    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.messenger.send_text(chat_id, text).await.map(|_| ())
    }
}
