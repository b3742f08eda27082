//! Mail over authenticated SMTP submission (Gmail app password).

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use leadflow_core::{
    errors::Error,
    ports::{MailSender, OutgoingMail},
    Result,
};

#[derive(Clone)]
pub struct SmtpMailer {
    sender: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Implicit TLS on the submissions port; the sender address is the SMTP user.
    pub fn new(host: &str, sender: impl Into<String>, password: &str) -> Result<Self> {
        let sender = sender.into();
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| Error::MailDelivery(format!("smtp relay {host}: {e}")))?
            .credentials(Credentials::new(sender.clone(), password.to_string()))
            .build();
        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<String> {
        let message = build_smtp_message(&self.sender, &mail)?;
        let resp = self
            .transport
            .send(message)
            .await
            .map_err(|e| Error::MailDelivery(format!("smtp send failed: {e}")))?;

        let reply = resp.message().collect::<Vec<_>>().join(" ");
        tracing::debug!(to = %mail.to, code = %resp.code(), "smtp accepted message");
        Ok(reply)
    }
}

/// `mail.to` may hold several comma-separated recipients.
fn build_smtp_message(from: &str, mail: &OutgoingMail) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(from)?)
        .subject(mail.subject.replace(['\r', '\n'], " "));
    for to in mail.to.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        builder = builder.to(parse_mailbox(to)?);
    }

    let built = match &mail.html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.text.clone()),
    };
    built.map_err(|e| Error::MailDelivery(format!("smtp message: {e}")))
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse()
        .map_err(|e| Error::MailDelivery(format!("bad address {addr:?}: {e}")))
}
