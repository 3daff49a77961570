//! Client for the remote copyright lookup service.
//!
//! Two request shapes exist: one request per publication (fanned out
//! concurrently, with progress reported as each one settles) and one batch
//! request for everything. Either way the caller gets a [`SearchReport`] keyed
//! by the original position of each item and decides how to merge it. This
//! module never touches application state.

mod dto;

use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderName, AUTHORIZATION};
use reqwest::{Client, Request, Url};

pub use dto::{CopyrightInfo, LookupResult, SearchRequest, SearchRequestItem, SearchResponse};

use crate::error::LookupError;
use crate::models::PublicationKind;
use crate::session::SessionCredentials;

const API_KEY_HEADER: &str = "x-api-key";

/// Which credential travels with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AuthScheme {
    /// `X-Api-Key: <api key from settings>`
    #[default]
    ApiKey,
    /// `Authorization: <header stored at sign-in>`
    Authorization,
}

/// How a table-wide search is sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SearchStrategy {
    /// One concurrent request per record.
    #[default]
    PerItem,
    /// A single request carrying every record.
    Batch,
}

/// Connection settings for [`LookupClient`].
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    /// Append `?mode=<ai mode>` to every request.
    pub send_ai_mode: bool,
}

/// A lookup that did not produce metadata for one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub index: usize,
    pub reason: String,
}

/// Outcome of a table-wide search.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// Results in ascending index order.
    pub successes: Vec<(usize, LookupResult)>,
    /// Failures in ascending index order.
    pub failures: Vec<ItemFailure>,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|failure| failure.index).collect()
    }

    fn finish(mut self, started: Instant) -> Self {
        self.successes.sort_by_key(|(index, _)| *index);
        self.failures.sort_by_key(|failure| failure.index);
        self.elapsed = started.elapsed();
        self
    }
}

#[derive(Clone)]
pub struct LookupClient {
    http: Client,
    base_url: String,
    auth_scheme: AuthScheme,
    send_ai_mode: bool,
    credentials: SessionCredentials,
}

impl LookupClient {
    pub fn new(config: &LookupConfig, credentials: SessionCredentials) -> Result<Self, LookupError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| LookupError::InvalidBaseUrl {
            url: config.base_url.clone(),
        })?;

        let http = Client::builder()
            .user_agent(concat!("copyright-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            auth_scheme: config.auth_scheme,
            send_ai_mode: config.send_ai_mode,
            credentials,
        })
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth_scheme
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the one-item endpoint for `kind`.
    pub fn single_path(kind: PublicationKind) -> String {
        format!("/search-copyright/{}/single", kind.endpoint_segment())
    }

    /// Path of the batch endpoint for `kind`.
    pub fn batch_path(kind: PublicationKind) -> String {
        format!("/search-copyright/{}", kind.endpoint_segment())
    }

    /// Header carrying the configured credential, or `CredentialMissing`.
    fn credential_header(&self) -> Result<(HeaderName, String), LookupError> {
        match self.auth_scheme {
            AuthScheme::ApiKey => self
                .credentials
                .usable_api_key()
                .map(|key| (HeaderName::from_static(API_KEY_HEADER), key))
                .ok_or(LookupError::CredentialMissing {
                    credential: "API key",
                }),
            AuthScheme::Authorization => self
                .credentials
                .auth_header()
                .filter(|header| !header.trim().is_empty())
                .map(|header| (AUTHORIZATION, header))
                .ok_or(LookupError::CredentialMissing {
                    credential: "sign-in",
                }),
        }
    }

    /// Fail early when no credential is available. Nothing is sent.
    pub fn ensure_credentials(&self) -> Result<(), LookupError> {
        self.credential_header().map(|_| ())
    }

    /// Assemble a POST request without sending it.
    pub fn build_request(
        &self,
        path: &str,
        items: &[SearchRequestItem],
    ) -> Result<Request, LookupError> {
        let (header, value) = self.credential_header()?;

        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|_| LookupError::InvalidBaseUrl { url: raw })?;
        if self.send_ai_mode {
            url.query_pairs_mut()
                .append_pair("mode", self.credentials.ai_mode().value());
        }

        let request = self
            .http
            .post(url)
            .header(header, value)
            .json(&SearchRequest { items })
            .build()?;
        Ok(request)
    }

    async fn send(&self, request: Request) -> Result<SearchResponse, LookupError> {
        let url = request.url().clone();
        tracing::debug!(url = %url, "sending lookup request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "lookup request rejected");
            return Err(LookupError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| LookupError::Decode(err.to_string()))
    }

    /// Look up a single publication. `index` is the item's position in the
    /// caller's table and is stamped onto the result.
    pub async fn search_item(
        &self,
        kind: PublicationKind,
        item: &SearchRequestItem,
        index: usize,
    ) -> Result<LookupResult, LookupError> {
        let request = self.build_request(&Self::single_path(kind), std::slice::from_ref(item))?;
        let response = self.send(request).await?;
        let mut result = response
            .success_items
            .into_iter()
            .next()
            .ok_or(LookupError::EmptyResult { index })?;
        result.index = Some(index);
        Ok(result)
    }

    /// Send every item in one request and return the raw response.
    pub async fn search_batch(
        &self,
        kind: PublicationKind,
        items: &[SearchRequestItem],
    ) -> Result<SearchResponse, LookupError> {
        let request = self.build_request(&Self::batch_path(kind), items)?;
        self.send(request).await
    }

    /// One concurrent request per item. `on_settled(completed, total)` runs
    /// each time a request finishes, in completion order.
    ///
    /// A missing credential aborts the whole search. Any other failure is
    /// recorded against its index and the remaining requests carry on.
    pub async fn search_each<F>(
        &self,
        kind: PublicationKind,
        items: &[SearchRequestItem],
        mut on_settled: F,
    ) -> Result<SearchReport, LookupError>
    where
        F: FnMut(usize, usize),
    {
        self.ensure_credentials()?;

        let started = Instant::now();
        let total = items.len();
        let mut pending: FuturesUnordered<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| async move { (index, self.search_item(kind, item, index).await) })
            .collect();

        let mut report = SearchReport::default();
        let mut completed = 0;
        while let Some((index, outcome)) = pending.next().await {
            completed += 1;
            on_settled(completed, total);
            match outcome {
                Ok(result) => report.successes.push((index, result)),
                Err(err) if err.is_credential_missing() => return Err(err),
                Err(err) => {
                    tracing::warn!(index, error = %err, "lookup failed for item");
                    report.failures.push(ItemFailure {
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(report.finish(started))
    }

    /// One batch request; successes are placed by the index the service
    /// reports. Positions with no usable result count as failures.
    pub async fn search_batched(
        &self,
        kind: PublicationKind,
        items: &[SearchRequestItem],
    ) -> Result<SearchReport, LookupError> {
        let started = Instant::now();
        let response = self.search_batch(kind, items).await?;

        let mut settled = vec![false; items.len()];
        let mut report = SearchReport::default();

        for result in response.success_items {
            match result.index {
                Some(index) if index < items.len() && !settled[index] => {
                    settled[index] = true;
                    report.successes.push((index, result));
                }
                other => tracing::warn!(index = ?other, "discarding batch result without a usable index"),
            }
        }

        for index in response.failed_indices {
            if index < items.len() && !settled[index] {
                settled[index] = true;
                report.failures.push(ItemFailure {
                    index,
                    reason: "the service reported a failure".to_string(),
                });
            }
        }

        for (index, done) in settled.iter().enumerate() {
            if !done {
                report.failures.push(ItemFailure {
                    index,
                    reason: "no result returned".to_string(),
                });
            }
        }

        Ok(report.finish(started))
    }

    /// Run a table-wide search with the configured strategy.
    pub async fn search<F>(
        &self,
        strategy: SearchStrategy,
        kind: PublicationKind,
        items: &[SearchRequestItem],
        mut on_settled: F,
    ) -> Result<SearchReport, LookupError>
    where
        F: FnMut(usize, usize),
    {
        tracing::info!(?strategy, %kind, items = items.len(), "starting lookup");
        let report = match strategy {
            SearchStrategy::PerItem => self.search_each(kind, items, &mut on_settled).await?,
            SearchStrategy::Batch => {
                let report = self.search_batched(kind, items).await?;
                on_settled(items.len(), items.len());
                report
            }
        };
        tracing::info!(
            succeeded = report.successes.len(),
            failed = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "lookup finished"
        );
        Ok(report)
    }
}
