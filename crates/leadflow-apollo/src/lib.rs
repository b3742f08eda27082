//! Apollo adapter (people search + bulk match).
//!
//! Implements the `leadflow-core` `LeadSearchBackend` port. The two-phase
//! orchestration (short-circuit, batch cap) lives in `leadflow_core::leads`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leadflow_core::{
    domain::{LeadCandidate, LeadSummary},
    errors::Error,
    ports::LeadSearchBackend,
    Result,
};

const DEFAULT_BASE_URL: &str = "https://api.apollo.io/api/v1";

#[derive(Clone, Debug)]
pub struct ApolloClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ApolloClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json")
            .header("Cache-Control", "no-cache")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::LeadSearch(format!("apollo request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::LeadSearch(format!(
                "apollo {path} failed: {status} {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::LeadSearch(format!("apollo json error: {e}")))
    }
}

#[async_trait]
impl LeadSearchBackend for ApolloClient {
    async fn search(&self, titles: &[String], per_page: usize) -> Result<Vec<LeadCandidate>> {
        let body = SearchRequest {
            person_titles: titles,
            per_page,
        };
        let v = self.post_json("mixed_people/search", &body).await?;
        parse_search_response(v)
    }

    async fn bulk_enrich(&self, candidates: &[LeadCandidate]) -> Result<Vec<LeadSummary>> {
        let body = BulkMatchRequest {
            details: candidates.iter().map(MatchDetail::from).collect(),
        };
        let v = self
            .post_json(
                "people/bulk_match?reveal_personal_emails=true&reveal_phone_number=false",
                &body,
            )
            .await?;
        parse_bulk_match_response(v)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    person_titles: &'a [String],
    per_page: usize,
}

#[derive(Debug, Serialize)]
struct BulkMatchRequest {
    details: Vec<MatchDetail>,
}

#[derive(Debug, Serialize)]
struct MatchDetail {
    first_name: String,
    last_name: String,
    name: String,
    organization_name: String,
    id: String,
}

impl From<&LeadCandidate> for MatchDetail {
    fn from(c: &LeadCandidate) -> Self {
        Self {
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            name: c.name.clone(),
            organization_name: c.organization_name.clone(),
            id: c.id.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Organization {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Person {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    organization: Option<Organization>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
}

impl Person {
    fn organization_name(&self) -> String {
        self.organization
            .as_ref()
            .and_then(|o| o.name.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    people: Vec<Person>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkMatchResponse {
    /// Unmatched entries come back as `null`.
    #[serde(default)]
    matches: Vec<Option<Person>>,
}

fn parse_search_response(v: serde_json::Value) -> Result<Vec<LeadCandidate>> {
    let resp: SearchResponse = serde_json::from_value(v)?;
    Ok(resp
        .people
        .into_iter()
        .map(|p| LeadCandidate {
            organization_name: p.organization_name(),
            id: p.id.unwrap_or_default(),
            first_name: p.first_name.unwrap_or_default(),
            last_name: p.last_name.unwrap_or_default(),
            name: p.name.unwrap_or_default(),
        })
        .collect())
}

fn parse_bulk_match_response(v: serde_json::Value) -> Result<Vec<LeadSummary>> {
    let resp: BulkMatchResponse = serde_json::from_value(v)?;
    let total = resp.matches.len();
    let leads: Vec<LeadSummary> = resp
        .matches
        .into_iter()
        .flatten()
        .map(|p| LeadSummary {
            organization_name: p.organization_name(),
            first_name: p.first_name.unwrap_or_default(),
            last_name: p.last_name.unwrap_or_default(),
            full_name: p.name.unwrap_or_default(),
            external_id: p.id.unwrap_or_default(),
            email: p.email.filter(|e| !e.trim().is_empty()),
            linkedin_url: p.linkedin_url.filter(|u| !u.trim().is_empty()),
        })
        .collect();
    if leads.len() < total {
        tracing::debug!(total, matched = leads.len(), "apollo bulk match had unmatched entries");
    }
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_shape() {
        let titles = vec!["cto".to_string(), "founder".to_string()];
        let v = serde_json::to_value(SearchRequest {
            person_titles: &titles,
            per_page: 10,
        })
        .unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "person_titles": ["cto", "founder"], "per_page": 10 })
        );
    }

    #[test]
    fn search_response_maps_candidates_with_missing_fields() {
        let v = serde_json::json!({
            "people": [
                { "id": "p1", "first_name": "Jane", "last_name": "Doe", "name": "Jane Doe",
                  "organization": { "name": "Acme" } },
                { "id": "p2", "name": "Solo", "organization": null }
            ],
            "pagination": { "page": 1 }
        });
        let out = parse_search_response(v).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].organization_name, "Acme");
        assert_eq!(out[1].id, "p2");
        assert_eq!(out[1].first_name, "");
        assert_eq!(out[1].organization_name, "");
    }

    #[test]
    fn empty_search_response_is_empty() {
        assert!(parse_search_response(serde_json::json!({})).unwrap().is_empty());
    }

    #[test]
    fn bulk_match_keeps_response_order_and_skips_nulls() {
        let v = serde_json::json!({
            "matches": [
                { "id": "p2", "name": "Second", "email": "s@x.com",
                  "linkedin_url": "http://www.linkedin.com/in/second",
                  "organization": { "name": "Beta" } },
                null,
                { "id": "p1", "name": "First", "email": "", "linkedin_url": null }
            ]
        });
        let out = parse_bulk_match_response(v).unwrap();
        let ids: Vec<_> = out.iter().map(|l| l.external_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert_eq!(out[0].email.as_deref(), Some("s@x.com"));
        assert_eq!(out[0].organization_name, "Beta");
        assert!(out[1].email.is_none());
        assert!(out[1].linkedin_url.is_none());
    }

    #[test]
    fn bulk_match_details_carry_candidate_fields() {
        let c = LeadCandidate {
            id: "p1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            name: "Jane Doe".to_string(),
            organization_name: "Acme".to_string(),
        };
        let v = serde_json::to_value(BulkMatchRequest {
            details: vec![MatchDetail::from(&c)],
        })
        .unwrap();
        assert_eq!(v["details"][0]["id"], "p1");
        assert_eq!(v["details"][0]["organization_name"], "Acme");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = ApolloClient::new("k").with_base_url("http://localhost:9999/api/v1/");
        assert_eq!(c.base_url, "http://localhost:9999/api/v1");
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    #[tokio::test]
    async fn unauthorized_search_is_a_lead_search_error_with_the_body() {
        let base = serve(axum::Router::new().route(
            "/api/v1/mixed_people/search",
            axum::routing::post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    r#"{"error":"Invalid access credentials."}"#,
                )
            }),
        ))
        .await;
        let client = ApolloClient::new("bad-key").with_base_url(base);

        let err = client.search(&["cto".to_string()], 10).await.unwrap_err();
        assert!(matches!(err, Error::LeadSearch(_)), "{err}");
        assert_eq!(err.kind(), "lead_search");
        assert!(err.to_string().contains("mixed_people/search"));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid access credentials."));
    }

    #[tokio::test]
    async fn rejected_bulk_match_is_a_lead_search_error_with_the_body() {
        let base = serve(axum::Router::new().route(
            "/api/v1/people/bulk_match",
            axum::routing::post(|| async {
                (
                    axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                    r#"{"error":"details must contain at most 10 entries"}"#,
                )
            }),
        ))
        .await;
        let client = ApolloClient::new("k").with_base_url(format!("{base}/"));
        let candidate = LeadCandidate {
            id: "p1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            name: "Jane Doe".to_string(),
            organization_name: "Acme".to_string(),
        };

        let err = client.bulk_enrich(&[candidate]).await.unwrap_err();
        assert!(matches!(err, Error::LeadSearch(_)), "{err}");
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("at most 10 entries"));
    }

    #[tokio::test]
    async fn search_against_local_server_parses_people() {
        let base = serve(axum::Router::new().route(
            "/api/v1/mixed_people/search",
            axum::routing::post(|| async {
                r#"{"people":[{"id":"p1","name":"Jane Doe","organization":{"name":"Acme"}}]}"#
            }),
        ))
        .await;
        let client = ApolloClient::new("k").with_base_url(base);

        let out = client.search(&["cto".to_string()], 5).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].organization_name, "Acme");
    }
}
