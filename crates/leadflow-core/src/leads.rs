//! Two-phase lead lookup: search by title, then bulk-enrich the candidates.

use async_trait::async_trait;

use crate::{
    domain::LeadSummary,
    ports::{LeadSearch, LeadSearchBackend},
    Result,
};

/// Cap for both phases (search page size and bulk-match batch).
pub const MAX_LEADS: usize = 10;

/// Split comma-separated user input into titles: trimmed, non-empty, order kept.
pub fn parse_titles(input: &str) -> Vec<String> {
    normalize_titles(input.split(','))
}

pub fn normalize_titles<I, S>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    titles
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub struct LeadFinder<B> {
    backend: B,
}

impl<B: LeadSearchBackend> LeadFinder<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: LeadSearchBackend> LeadSearch for LeadFinder<B> {
    async fn find_leads(&self, titles: &[String]) -> Result<Vec<LeadSummary>> {
        let titles = normalize_titles(titles);
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = self.backend.search(&titles, MAX_LEADS).await?;
        if candidates.is_empty() {
            tracing::info!(titles = ?titles, "lead search returned no candidates");
            return Ok(Vec::new());
        }
        candidates.truncate(MAX_LEADS);

        let leads = self.backend.bulk_enrich(&candidates).await?;
        tracing::info!(
            candidates = candidates.len(),
            matched = leads.len(),
            "lead search completed"
        );
        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{domain::LeadCandidate, errors::Error};

    #[derive(Default)]
    struct FakeBackend {
        candidates: Vec<LeadCandidate>,
        fail_enrich: bool,
        searched: Mutex<Vec<(Vec<String>, usize)>>,
        enriched: Mutex<Vec<Vec<LeadCandidate>>>,
    }

    #[async_trait]
    impl LeadSearchBackend for FakeBackend {
        async fn search(&self, titles: &[String], per_page: usize) -> Result<Vec<LeadCandidate>> {
            self.searched
                .lock()
                .unwrap()
                .push((titles.to_vec(), per_page));
            Ok(self.candidates.clone())
        }

        async fn bulk_enrich(&self, candidates: &[LeadCandidate]) -> Result<Vec<LeadSummary>> {
            self.enriched.lock().unwrap().push(candidates.to_vec());
            if self.fail_enrich {
                return Err(Error::LeadSearch("422 {\"error\":\"bad\"}".to_string()));
            }
            // Reverse to prove provider order is kept as-is.
            Ok(candidates
                .iter()
                .rev()
                .map(|c| LeadSummary {
                    external_id: c.id.clone(),
                    full_name: c.name.clone(),
                    ..Default::default()
                })
                .collect())
        }
    }

    fn candidate(id: &str) -> LeadCandidate {
        LeadCandidate {
            id: id.to_string(),
            name: format!("Person {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn titles_are_trimmed_and_order_preserved() {
        assert_eq!(parse_titles("alpha, beta , gamma"), vec!["alpha", "beta", "gamma"]);
        assert_eq!(parse_titles(" , ,"), Vec::<String>::new());
    }

    #[tokio::test]
    async fn zero_candidates_short_circuits_without_enrich() {
        let finder = LeadFinder::new(FakeBackend::default());
        let out = finder.find_leads(&["cto".to_string()]).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(finder.backend.searched.lock().unwrap().len(), 1);
        assert!(finder.backend.enriched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_receives_normalized_titles_and_page_cap() {
        let finder = LeadFinder::new(FakeBackend::default());
        let titles = vec![" cto ".to_string(), "".to_string(), "founder".to_string()];
        finder.find_leads(&titles).await.unwrap();
        let searched = finder.backend.searched.lock().unwrap();
        assert_eq!(searched[0], (vec!["cto".to_string(), "founder".to_string()], 10));
    }

    #[tokio::test]
    async fn blank_titles_make_no_calls() {
        let finder = LeadFinder::new(FakeBackend::default());
        let out = finder.find_leads(&["  ".to_string()]).await.unwrap();
        assert!(out.is_empty());
        assert!(finder.backend.searched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn enrich_order_is_kept_and_batch_is_capped() {
        let backend = FakeBackend {
            candidates: (0..12).map(|i| candidate(&i.to_string())).collect(),
            ..Default::default()
        };
        let finder = LeadFinder::new(backend);
        let out = finder.find_leads(&["cto".to_string()]).await.unwrap();

        assert_eq!(finder.backend.enriched.lock().unwrap()[0].len(), MAX_LEADS);
        let ids: Vec<_> = out.iter().map(|l| l.external_id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"9"));
        assert_eq!(ids.last(), Some(&"0"));
    }

    #[tokio::test]
    async fn enrich_failure_propagates_as_lead_search_error() {
        let backend = FakeBackend {
            candidates: vec![candidate("a")],
            fail_enrich: true,
            ..Default::default()
        };
        let err = LeadFinder::new(backend)
            .find_leads(&["cto".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LeadSearch(body) if body.contains("422")));
    }
}
