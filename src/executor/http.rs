//! Thin HTTP batch executor
//!
//! A minimal [`BatchExecutor`] over `reqwest`: search bodies are scanned
//! for place-link markers, detail endpoints are expected to serve JSON
//! place records. The heavyweight fetch mechanics (rendering, scrolling,
//! browser pools) live outside this crate; this implementation exists so
//! the binary works end-to-end against plain HTTP endpoints and so the
//! executor contract has an in-tree reference.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::executor::{
    BatchExecutor, DetailSlot, ExecutorResult, RejectReason, SearchOutcome,
};
use crate::model::{BusinessType, CandidateLink, EntityRecord, SearchQuery};

/// Matches absolute URLs carrying an embedded place-id marker
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^"'\s<>\\]*!1s0x[0-9a-f]+:0x[0-9a-f]+[^"'\s<>\\]*"#)
        .expect("link regex")
});

/// Cuisine labels that mark a result as not actually a place listing
const NON_PLACE_MARKERS: &[&str] = &["postal code", "zip code", "neighborhood", "city hall"];

/// Default HTTP-backed batch executor
pub struct HttpExecutor {
    client: Client,
    search_endpoint: String,
    min_rating: f64,
}

impl HttpExecutor {
    /// Builds an executor from fetch settings and the rating floor
    pub fn new(fetch: &FetchConfig, min_rating: f64) -> ExecutorResult<Self> {
        let client = Client::builder()
            .user_agent(fetch.user_agent.clone())
            .timeout(Duration::from_millis(fetch.request_timeout_ms))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            search_endpoint: fetch.search_endpoint.clone(),
            min_rating,
        })
    }

    fn search_url(&self, query: &SearchQuery) -> ExecutorResult<Url> {
        let mut url = Url::parse(&self.search_endpoint)?;
        url.query_pairs_mut().append_pair("q", &query.query);
        Ok(url)
    }

    /// Applies business rules and identity backfill to a fetched record
    fn classify(&self, link: &CandidateLink, mut record: EntityRecord) -> DetailSlot {
        if record.name.trim().is_empty() {
            return DetailSlot::Rejected(RejectReason::MissingName);
        }

        if let Some(cuisine) = &record.cuisine_type {
            let lower = cuisine.to_lowercase();
            if NON_PLACE_MARKERS.iter().any(|m| lower.contains(m)) {
                return DetailSlot::Rejected(RejectReason::NotAPlace);
            }
            if lower.contains("food truck") {
                record.business_type = BusinessType::FoodTruck;
            }
        }

        match record.rating {
            Some(rating) if rating >= self.min_rating => {}
            _ => return DetailSlot::Rejected(RejectReason::BelowRatingFloor),
        }

        if record.place_id.is_none() {
            record.place_id = link.place_id();
        }
        if record.source_url.is_none() {
            record.source_url = Some(link.as_str().to_string());
        }
        record.scraped_at = Some(Utc::now());

        DetailSlot::Saved(record)
    }
}

impl BatchExecutor for HttpExecutor {
    async fn run_searches(&self, queries: &[SearchQuery]) -> ExecutorResult<Vec<SearchOutcome>> {
        let mut outcomes = Vec::with_capacity(queries.len());

        for query in queries {
            let url = self.search_url(query)?;
            let outcome = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        let links = LINK_RE
                            .find_iter(&body)
                            .map(|m| CandidateLink::new(m.as_str()))
                            .collect();
                        SearchOutcome::found(query.clone(), links)
                    }
                    Err(e) => SearchOutcome::failed(query.clone(), e.to_string()),
                },
                Ok(response) => {
                    SearchOutcome::failed(query.clone(), format!("HTTP {}", response.status()))
                }
                Err(e) => SearchOutcome::failed(query.clone(), e.to_string()),
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn run_details(&self, links: &[CandidateLink]) -> ExecutorResult<Vec<DetailSlot>> {
        let mut slots = Vec::with_capacity(links.len());

        for link in links {
            let slot = match self.client.get(link.as_str()).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<EntityRecord>().await {
                        Ok(record) => self.classify(link, record),
                        Err(e) => DetailSlot::Failed(format!("unparseable detail payload: {}", e)),
                    }
                }
                Ok(response) => DetailSlot::Failed(format!("HTTP {}", response.status())),
                Err(e) => DetailSlot::Failed(e.to_string()),
            };
            slots.push(slot);
        }

        Ok(slots)
    }
}
