//! Daily automation flow: business step, then mail, calendar and chat
//! notification, each attempted independently.
//!
//! No step's failure aborts a later step and every run reaches the end. Runs
//! hold no shared mutable state, so a manual run may overlap a scheduled one
//! (duplicate side effects are accepted).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    domain::{ChatId, DailyFlowResult, FlowStatus, TriggerKind},
    formatting::escape_html,
    messaging::port::MessagingPort,
    ports::{CalendarClient, Clock, DailyTask, MailSender, NewEvent, OutgoingMail},
    Result,
};

pub const EVENT_DURATION_MINUTES: i64 = 30;
const EVENT_SUMMARY: &str = "Daily Automation Check-in";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Provider id or short detail of what happened.
    Done(String),
    Failed(String),
    Skipped,
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

#[derive(Clone, Debug)]
pub struct FlowReport {
    pub trigger: TriggerKind,
    pub result: DailyFlowResult,
    pub task: StepOutcome,
    pub mail: StepOutcome,
    pub calendar: StepOutcome,
    pub notify: StepOutcome,
}

impl FlowReport {
    pub fn failed_steps(&self) -> Vec<&'static str> {
        [
            ("task", &self.task),
            ("mail", &self.mail),
            ("calendar", &self.calendar),
            ("notify", &self.notify),
        ]
        .into_iter()
        .filter(|(_, o)| o.is_failed())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed_steps().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct DailyFlowSettings {
    pub mail_to: String,
    pub calendar_attendees: Vec<String>,
    pub timezone: Tz,
    /// Fallback when a run has no triggering chat.
    pub notify_chat_id: Option<ChatId>,
}

pub struct DailyFlow {
    task: Arc<dyn DailyTask>,
    mail: Arc<dyn MailSender>,
    calendar: Arc<dyn CalendarClient>,
    messenger: Arc<dyn MessagingPort>,
    clock: Arc<dyn Clock>,
    settings: DailyFlowSettings,
}

impl DailyFlow {
    pub fn new(
        task: Arc<dyn DailyTask>,
        mail: Arc<dyn MailSender>,
        calendar: Arc<dyn CalendarClient>,
        messenger: Arc<dyn MessagingPort>,
        clock: Arc<dyn Clock>,
        settings: DailyFlowSettings,
    ) -> Self {
        Self {
            task,
            mail,
            calendar,
            messenger,
            clock,
            settings,
        }
    }

    pub async fn run(&self, trigger: TriggerKind, chat_id: Option<ChatId>) -> FlowReport {
        tracing::info!(trigger = %trigger, chat_id = ?chat_id, "running daily automation");

        let (result, task) = self.run_task(trigger).await;
        let mail = self.send_mail(&result).await;
        let calendar = self.create_event(trigger).await;

        let mut report = FlowReport {
            trigger,
            result,
            task,
            mail,
            calendar,
            notify: StepOutcome::Skipped,
        };
        report.notify = self.notify(chat_id, &report).await;

        if report.is_success() {
            tracing::info!(trigger = %trigger, "daily automation finished");
        } else {
            tracing::warn!(
                trigger = %trigger,
                failed = ?report.failed_steps(),
                "daily automation finished with failures"
            );
        }
        report
    }

    async fn run_task(&self, trigger: TriggerKind) -> (DailyFlowResult, StepOutcome) {
        match self.task.run(trigger).await {
            Ok(result) => {
                let detail = result.message.clone();
                (result, StepOutcome::Done(detail))
            }
            Err(e) => {
                tracing::error!(step = "task", kind = e.kind(), error = %e, "business step failed");
                let result = DailyFlowResult {
                    status: FlowStatus::Failed,
                    timestamp: self.clock.now().to_rfc3339(),
                    trigger,
                    message: e.to_string(),
                };
                (result, StepOutcome::Failed(e.to_string()))
            }
        }
    }

    async fn send_mail(&self, result: &DailyFlowResult) -> StepOutcome {
        let local = self.local_time(self.clock.now());
        let json = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.message.clone());
        let mail = OutgoingMail {
            to: self.settings.mail_to.clone(),
            subject: format!("Daily Automation ({local})"),
            text: format!("Trigger: {}\nResult: {json}", result.trigger),
            html: Some(format!(
                "<p>Trigger: <b>{}</b></p><pre>{}</pre>",
                result.trigger,
                escape_html(&json)
            )),
        };

        match self.mail.send_mail(mail).await {
            Ok(id) => {
                tracing::info!(step = "mail", message_id = %id, "email sent");
                StepOutcome::Done(id)
            }
            Err(e) => {
                tracing::error!(step = "mail", kind = e.kind(), error = %e, "email failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn create_event(&self, trigger: TriggerKind) -> StepOutcome {
        let start = self.clock.now();
        let event = NewEvent {
            summary: EVENT_SUMMARY.to_string(),
            description: format!("Scheduled by Telegram bot ({trigger})"),
            start,
            end: start + chrono::Duration::minutes(EVENT_DURATION_MINUTES),
            attendees: self.settings.calendar_attendees.clone(),
        };

        match self.calendar.create_event(event).await {
            Ok(id) => {
                tracing::info!(step = "calendar", event_id = %id, "calendar event created");
                StepOutcome::Done(id)
            }
            Err(e) => {
                tracing::error!(step = "calendar", kind = e.kind(), error = %e, "calendar event failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn notify(&self, chat_id: Option<ChatId>, report: &FlowReport) -> StepOutcome {
        let Some(chat_id) = chat_id.or(self.settings.notify_chat_id) else {
            tracing::info!(step = "notify", "no chat to notify, skipping");
            return StepOutcome::Skipped;
        };

        let text = self.notification_text(report);
        match self.messenger.send_text(chat_id, &text).await {
            Ok(_) => StepOutcome::Done(chat_id.to_string()),
            Err(e) => {
                tracing::error!(step = "notify", kind = e.kind(), chat_id = %chat_id, error = %e, "chat notification failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    fn notification_text(&self, report: &FlowReport) -> String {
        let at = self.local_time(self.clock.now());
        let mut lines = Vec::new();
        if report.is_success() {
            lines.push("Daily job done ✅".to_string());
        } else {
            lines.push("Daily job finished with failures ⚠️".to_string());
        }
        lines.push(format!("Trigger: {}", report.trigger));
        lines.push(format!("At: {at}"));

        // Step names only; provider error bodies stay in the operator log.
        let failed = report.failed_steps();
        if !failed.is_empty() {
            lines.push(format!("Failed steps: {}", failed.join(", ")));
        }
        lines.join("\n")
    }

    fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.settings.timezone)
            .format("%Y-%m-%d %H:%M %Z")
            .to_string()
    }
}

/// Default business step: reports that the automation ran.
pub struct StatusTask {
    clock: Arc<dyn Clock>,
}

impl StatusTask {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl DailyTask for StatusTask {
    async fn run(&self, trigger: TriggerKind) -> Result<DailyFlowResult> {
        Ok(DailyFlowResult {
            status: FlowStatus::Success,
            timestamp: self.clock.now().to_rfc3339(),
            trigger,
            message: "Daily automation completed.".to_string(),
        })
    }
}
