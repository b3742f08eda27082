//! Google Calendar API v3: event creation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use leadflow_core::{
    errors::Error,
    ports::{CalendarClient, NewEvent},
    Result,
};

use crate::oauth::OAuthClient;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Attendee {
    email: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct EventBody {
    summary: String,
    description: String,
    start: EventDateTime,
    end: EventDateTime,
    attendees: Vec<Attendee>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    #[serde(default)]
    id: String,
}

#[derive(Clone, Debug)]
pub struct GoogleCalendar {
    oauth: OAuthClient,
    calendar_id: String,
    tz: Tz,
    api_base: String,
    http: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(oauth: OAuthClient, calendar_id: impl Into<String>, tz: Tz) -> Self {
        Self {
            oauth,
            calendar_id: calendar_id.into(),
            tz,
            api_base: CALENDAR_API.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// The calendar id is one path segment, percent-encoded as such.
    fn events_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.api_base)
            .map_err(|e| Error::Calendar(format!("bad calendar api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Calendar(format!("bad calendar api base: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendar {
    async fn create_event(&self, event: NewEvent) -> Result<String> {
        let access_token = self
            .oauth
            .refresh_access_token()
            .await
            .map_err(|e| Error::Calendar(format!("access token: {e}")))?;

        // End before start is left for the API to reject.
        let body = event_body(&event, self.tz);
        let resp = self
            .http
            .post(self.events_url()?)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Calendar(format!("calendar request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Calendar(format!(
                "calendar insert failed: {status} {body}"
            )));
        }

        let created: CreatedEvent = resp
            .json()
            .await
            .map_err(|e| Error::Calendar(format!("calendar json error: {e}")))?;
        Ok(created.id)
    }
}

fn event_body(event: &NewEvent, tz: Tz) -> EventBody {
    EventBody {
        summary: event.summary.clone(),
        description: event.description.clone(),
        start: wire_time(event.start, tz),
        end: wire_time(event.end, tz),
        attendees: event
            .attendees
            .iter()
            .map(|email| Attendee {
                email: email.clone(),
            })
            .collect(),
    }
}

fn wire_time(at: DateTime<Utc>, tz: Tz) -> EventDateTime {
    EventDateTime {
        date_time: at.with_timezone(&tz).to_rfc3339(),
        time_zone: tz.name().to_string(),
    }
}
