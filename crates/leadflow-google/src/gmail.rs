//! Gmail API v1: send a message as the configured sender.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use leadflow_core::{
    errors::Error,
    ports::{MailSender, OutgoingMail},
    Result,
};

use crate::oauth::OAuthClient;

const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    id: String,
}

#[derive(Clone, Debug)]
pub struct GmailSender {
    oauth: OAuthClient,
    sender: String,
    send_url: String,
    http: reqwest::Client,
}

impl GmailSender {
    pub fn new(oauth: OAuthClient, sender: impl Into<String>) -> Self {
        Self {
            oauth,
            sender: sender.into(),
            send_url: SEND_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_send_url(mut self, send_url: impl Into<String>) -> Self {
        self.send_url = send_url.into();
        self
    }
}

#[async_trait]
impl MailSender for GmailSender {
    async fn send_mail(&self, mail: OutgoingMail) -> Result<String> {
        // No token cache: every send pays one refresh round trip.
        let access_token = self
            .oauth
            .refresh_access_token()
            .await
            .map_err(|e| Error::MailDelivery(format!("access token: {e}")))?;

        let boundary = format!(
            "leadflow-{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let message = build_message(&self.sender, &mail, &boundary);
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes());

        let resp = self
            .http
            .post(&self.send_url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| Error::MailDelivery(format!("gmail request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::MailDelivery(format!("gmail send failed: {status} {body}")));
        }

        let sent: SentMessage = resp
            .json()
            .await
            .map_err(|e| Error::MailDelivery(format!("gmail json error: {e}")))?;
        tracing::debug!(to = %mail.to, id = %sent.id, "gmail accepted message");
        Ok(sent.id)
    }
}

/// RFC 5322 message with base64 bodies; `multipart/alternative` when HTML is present.
pub fn build_message(from: &str, mail: &OutgoingMail, boundary: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("From: {}\r\n", header_value(from)));
    out.push_str(&format!("To: {}\r\n", header_value(&mail.to)));
    out.push_str(&format!("Subject: {}\r\n", encode_subject(&mail.subject)));
    out.push_str("MIME-Version: 1.0\r\n");

    match &mail.html {
        None => {
            push_part(&mut out, "text/plain", &mail.text);
        }
        Some(html) => {
            out.push_str(&format!(
                "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
            ));
            out.push_str(&format!("--{boundary}\r\n"));
            push_part(&mut out, "text/plain", &mail.text);
            out.push_str(&format!("--{boundary}\r\n"));
            push_part(&mut out, "text/html", html);
            out.push_str(&format!("--{boundary}--\r\n"));
        }
    }
    out
}

fn push_part(out: &mut String, mime: &str, body: &str) {
    out.push_str(&format!("Content-Type: {mime}; charset=\"UTF-8\"\r\n"));
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    let encoded = base64::engine::general_purpose::STANDARD.encode(body.as_bytes());
    for line in encoded.as_bytes().chunks(76) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
}

/// Header values must stay on one line.
fn header_value(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}

/// Bytes of UTF-8 per encoded-word: 60 base64 chars plus the 12-char wrapper
/// stays within the 75-char limit of RFC 2047.
const ENCODED_WORD_BYTES: usize = 45;

/// RFC 2047 encoded-words for non-ASCII subjects, folded one word per line.
fn encode_subject(subject: &str) -> String {
    let subject = header_value(subject);
    if subject.is_ascii() {
        return subject;
    }
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in subject.chars() {
        // A character never straddles two words.
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join("\r\n ")
}

fn encoded_word(chunk: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(chunk.as_bytes());
    format!("=?UTF-8?B?{encoded}?=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub;

    fn mail(html: Option<&str>) -> OutgoingMail {
        OutgoingMail {
            to: "ops@example.com".to_string(),
            subject: "Daily Automation (2026-01-01 09:00 +06)".to_string(),
            text: "Trigger: schedule".to_string(),
            html: html.map(|s| s.to_string()),
        }
    }

    fn decode(b64: &str) -> String {
        let joined: String = b64.lines().collect();
        String::from_utf8(
            base64::engine::general_purpose::STANDARD
                .decode(joined)
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn plain_message_has_headers_and_base64_body() {
        let msg = build_message("bot@example.com", &mail(None), "b1");
        assert!(msg.starts_with("From: bot@example.com\r\nTo: ops@example.com\r\n"));
        assert!(msg.contains("Subject: Daily Automation (2026-01-01 09:00 +06)\r\n"));
        assert!(msg.contains("Content-Type: text/plain; charset=\"UTF-8\""));
        assert!(!msg.contains("multipart"));

        let body = msg.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(decode(body), "Trigger: schedule");
    }

    #[test]
    fn html_message_is_multipart_alternative() {
        let msg = build_message("bot@example.com", &mail(Some("<b>hi</b>")), "b1");
        assert!(msg.contains("Content-Type: multipart/alternative; boundary=\"b1\""));
        assert_eq!(msg.matches("--b1\r\n").count(), 2);
        assert!(msg.ends_with("--b1--\r\n"));
        assert!(msg.contains("Content-Type: text/html; charset=\"UTF-8\""));
    }

    #[test]
    fn non_ascii_subject_is_encoded_and_newlines_are_stripped() {
        let mut m = mail(None);
        m.subject = "Résumé\r\nBcc: evil@example.com".to_string();
        let msg = build_message("bot@example.com", &m, "b");
        let subject_line = msg.lines().find(|l| l.starts_with("Subject:")).unwrap();
        assert!(subject_line.starts_with("Subject: =?UTF-8?B?"));
        assert!(!msg.contains("\r\nBcc:"));
    }

    #[test]
    fn long_subject_is_split_into_short_encoded_words() {
        let subject = "Рассылка: ежедневный отчёт по лидам и встречам 🔥".repeat(3);
        let header = encode_subject(&subject);

        let words: Vec<&str> = header.split("\r\n ").collect();
        assert!(words.len() > 1);
        let mut decoded = String::new();
        for word in words {
            assert!(word.len() <= 75, "{word}");
            let b64 = word
                .strip_prefix("=?UTF-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.push_str(&decode(b64));
        }
        assert_eq!(decoded, subject);
    }

    #[test]
    fn short_non_ascii_subject_is_one_word() {
        let header = encode_subject("Résumé");
        assert!(!header.contains("\r\n"));
        assert_eq!(header, format!("=?UTF-8?B?{}?=", base64::engine::general_purpose::STANDARD.encode("Résumé")));
    }

    #[tokio::test]
    async fn rejected_send_is_a_mail_error_with_the_body() {
        let base = stub::serve(
            axum::Router::new()
                .route("/token", axum::routing::post(stub::token_ok))
                .route(
                    "/send",
                    axum::routing::post(|| async {
                        (
                            axum::http::StatusCode::UNAUTHORIZED,
                            r#"{"error":{"code":401,"message":"Request had invalid authentication credentials."}}"#,
                        )
                    }),
                ),
        )
        .await;
        let oauth = OAuthClient::new("c", "s", "r")
            .with_refresh_token("1//r")
            .with_token_uri(format!("{base}/token"));
        let gmail = GmailSender::new(oauth, "bot@example.com").with_send_url(format!("{base}/send"));

        let err = gmail.send_mail(mail(None)).await.unwrap_err();
        assert!(matches!(err, Error::MailDelivery(_)), "{err}");
        assert_eq!(err.kind(), "mail");
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid authentication credentials"));
    }

    #[tokio::test]
    async fn token_refusal_is_a_mail_error() {
        let base = stub::serve(
            axum::Router::new().route("/token", axum::routing::post(stub::token_rejected)),
        )
        .await;
        let oauth = OAuthClient::new("c", "s", "r")
            .with_refresh_token("1//r")
            .with_token_uri(format!("{base}/token"));
        let gmail = GmailSender::new(oauth, "bot@example.com").with_send_url(format!("{base}/send"));

        let err = gmail.send_mail(mail(None)).await.unwrap_err();
        assert!(matches!(err, Error::MailDelivery(_)), "{err}");
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn accepted_send_returns_the_message_id() {
        let base = stub::serve(
            axum::Router::new()
                .route("/token", axum::routing::post(stub::token_ok))
                .route(
                    "/send",
                    axum::routing::post(|| async { r#"{"id":"18c0ffee","threadId":"18c0ffee"}"# }),
                ),
        )
        .await;
        let oauth = OAuthClient::new("c", "s", "r")
            .with_refresh_token("1//r")
            .with_token_uri(format!("{base}/token"));
        let gmail = GmailSender::new(oauth, "bot@example.com").with_send_url(format!("{base}/send"));

        assert_eq!(gmail.send_mail(mail(None)).await.unwrap(), "18c0ffee");
    }
}
