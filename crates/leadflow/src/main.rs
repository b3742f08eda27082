use std::sync::Arc;

use leadflow_apollo::ApolloClient;
use leadflow_google::{GmailSender, GoogleCalendar, OAuthClient, SmtpMailer};
use leadflow_telegram::TelegramMessenger;

use leadflow_core::{
    chat::ChatService,
    config::{Config, MailTransport},
    domain::TriggerKind,
    leads::LeadFinder,
    messaging::port::MessagingPort,
    orchestrator::{DailyFlow, DailyFlowSettings, StatusTask},
    ports::{Clock, MailSender, SystemClock},
    scheduler::DailyScheduler,
    session::ChatSessions,
};

#[tokio::main]
async fn main() -> Result<(), leadflow_core::Error> {
    leadflow_core::logging::init("leadflow")?;

    // Configuration problems are fatal before any network I/O.
    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = match DailyScheduler::new(&cfg.daily_time, cfg.timezone, clock.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let oauth = OAuthClient::from_credentials(&cfg.google);
    let mail: Arc<dyn MailSender> = match &cfg.mail_transport {
        MailTransport::GmailApi => Arc::new(GmailSender::new(oauth.clone(), &cfg.gmail_sender)),
        MailTransport::Smtp { host, password } => {
            match SmtpMailer::new(host, &cfg.gmail_sender, password) {
                Ok(m) => Arc::new(m),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
    };
    let calendar = Arc::new(GoogleCalendar::new(oauth, &cfg.calendar_id, cfg.timezone));
    let leads = Arc::new(LeadFinder::new(ApolloClient::new(&cfg.apollo_api_key)));

    let telegram = TelegramMessenger::from_token(&cfg.telegram_bot_token);
    let bot = telegram.bot();
    let messenger: Arc<dyn MessagingPort> = Arc::new(telegram);

    let flow = Arc::new(DailyFlow::new(
        Arc::new(StatusTask::new(clock.clone())),
        mail,
        calendar,
        messenger.clone(),
        clock.clone(),
        DailyFlowSettings {
            mail_to: cfg.mail_to.clone(),
            calendar_attendees: cfg.calendar_attendees.clone(),
            timezone: cfg.timezone,
            notify_chat_id: cfg.notify_chat_id,
        },
    ));

    let job = {
        let flow = flow.clone();
        scheduler.start(move |at| {
            let flow = flow.clone();
            async move {
                tracing::info!(scheduled_for = %at, "daily trigger fired");
                flow.run(TriggerKind::Schedule, None).await;
            }
        })
    };
    tracing::info!(
        time = %cfg.daily_time,
        tz = %cfg.timezone.name(),
        notify_chat = ?cfg.notify_chat_id,
        mail = if cfg.mail_transport == MailTransport::GmailApi { "gmail_api" } else { "smtp" },
        "daily automation scheduled"
    );

    let service = Arc::new(ChatService::new(
        messenger,
        leads,
        flow,
        ChatSessions::new(cfg.pending_step_ttl),
        clock,
    ));

    let polled = leadflow_telegram::router::run_polling(bot, service).await;
    job.shutdown().await;

    polled.map_err(|e| leadflow_core::Error::ChatDelivery(format!("telegram bot failed: {e}")))
}
