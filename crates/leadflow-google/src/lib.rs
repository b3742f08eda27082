//! Google adapter (Gmail + Calendar over REST, OAuth2 refresh-token auth).
//!
//! Implements the `leadflow-core` `MailSender` and `CalendarClient` ports.
//! `SmtpMailer` is the app-password alternative to the Gmail API sender.
//! Every call fetches a fresh access token; nothing is cached between calls.

pub mod calendar;
pub mod gmail;
pub mod oauth;
pub mod smtp;

#[cfg(test)]
mod stub;

pub use calendar::GoogleCalendar;
pub use gmail::GmailSender;
pub use oauth::{OAuthClient, OAuthError, TokenSet, SCOPES};
pub use smtp::SmtpMailer;
