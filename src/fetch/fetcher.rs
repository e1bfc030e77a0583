//! Paginated, retrying fetch of one query
//!
//! # Retry Logic
//!
//! | Outcome | Action |
//! |---------|--------|
//! | Blocked (403, 429, block marker) | Mark proxy blocked, retry with a fresh identity |
//! | Timeout, 5xx, connection error | Retry with the same identity |
//! | Other 4xx | Surface immediately as `UnexpectedStatus` |
//!
//! Every attempt goes through the resource pool, so retries are rate
//! limited like any other request. Backoff is `base-delay * 2^attempt`, and
//! a URL is attempted at most `max-retries` times.

use crate::config::Config;
use crate::extract::{ExtractedPage, Extractor};
use crate::fetch::pool::{BrowsingContext, PoolClosed, ResourcePool};
use crate::fetch::proxy::{ProxyIdentity, ProxyRotator};
use crate::fetch::retry::{FetchState, RetryPolicy, RetryStep, Sleeper, TokioSleeper};
use crate::fetch::source::{LoadOutcome, PageSource};
use crate::query::Query;
use crate::robots::ComplianceCheck;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{url} blocked the request after {attempts} attempt(s)")]
    BlockedByTarget {
        url: String,
        attempts: u32,
        status: Option<u16>,
    },

    #[error("network error on {url} after {attempts} attempt(s): {message}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("robots.txt disallows {url}")]
    ComplianceDisallowed { url: String },

    #[error("{url} answered HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("resource pool is closed")]
    PoolClosed,

    #[error("aborted after {pages_fetched} page(s)")]
    Aborted { pages_fetched: u32 },
}

impl From<PoolClosed> for FetchError {
    fn from(_: PoolClosed) -> Self {
        Self::PoolClosed
    }
}

impl FetchError {
    pub fn is_compliance(&self) -> bool {
        matches!(self, Self::ComplianceDisallowed { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::PoolClosed)
    }
}

/// One fetched and extracted result page
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub number: u32,
    pub url: Url,
    pub page: ExtractedPage,
}

/// A successfully loaded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub body: String,
    pub final_url: Url,
    pub attempts: u32,
}

/// The fetch layer: compliance, pooling, proxies, retries and pagination
pub struct Fetcher {
    pool: Arc<ResourcePool<BrowsingContext>>,
    proxies: Arc<ProxyRotator>,
    source: Arc<dyn PageSource>,
    compliance: Arc<dyn ComplianceCheck>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    base_url: Url,
    page_cap: u32,
}

impl Fetcher {
    pub fn new(
        pool: Arc<ResourcePool<BrowsingContext>>,
        proxies: Arc<ProxyRotator>,
        source: Arc<dyn PageSource>,
        compliance: Arc<dyn ComplianceCheck>,
        policy: RetryPolicy,
        base_url: Url,
        page_cap: u32,
    ) -> Self {
        Self {
            pool,
            proxies,
            source,
            compliance,
            sleeper: Arc::new(TokioSleeper),
            policy,
            base_url,
            page_cap: page_cap.max(1),
        }
    }

    /// Builds the fetch layer from configuration
    pub fn from_config(
        config: &Config,
        source: Arc<dyn PageSource>,
        compliance: Arc<dyn ComplianceCheck>,
    ) -> crate::Result<Self> {
        let proxies = config
            .proxies
            .identities
            .iter()
            .map(|identity| ProxyIdentity::new(identity.as_str()));

        Ok(Self::new(
            Arc::new(ResourcePool::from_config(&config.engine)),
            Arc::new(ProxyRotator::new(proxies)),
            source,
            compliance,
            RetryPolicy::from_config(&config.engine),
            Url::parse(&config.target.base_url)?,
            config.engine.page_cap,
        ))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn pool(&self) -> &Arc<ResourcePool<BrowsingContext>> {
        &self.pool
    }

    pub fn proxies(&self) -> &Arc<ProxyRotator> {
        &self.proxies
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches every result page of a query, up to the page cap
    ///
    /// The compliance check runs before the first request. The page count
    /// comes from the first page; later pages are fetched in ascending
    /// order and cancellation is honoured between pages.
    pub async fn fetch_all(
        &self,
        query: &Query,
        extractor: &Extractor,
        cancel: &CancellationToken,
    ) -> Result<Vec<FetchedPage>, FetchError> {
        let first_url = query.page_url(&self.base_url, 1);
        if !self.compliance.is_allowed(&first_url).await {
            return Err(FetchError::ComplianceDisallowed {
                url: first_url.to_string(),
            });
        }

        let mut pages = Vec::new();
        let mut last_page = 1;
        let mut number = 1;

        while number <= last_page {
            if cancel.is_cancelled() {
                return Err(FetchError::Aborted {
                    pages_fetched: pages.len() as u32,
                });
            }

            let url = query.page_url(&self.base_url, number);
            let loaded = self
                .fetch_page(&url, cancel)
                .await
                .map_err(|e| match e {
                    FetchError::Aborted { .. } => FetchError::Aborted {
                        pages_fetched: pages.len() as u32,
                    },
                    other => other,
                })?;
            let page = extractor.extract(&loaded.body, &loaded.final_url);

            if number == 1 {
                last_page = page.total_pages.clamp(1, self.page_cap);
                if page.total_pages > self.page_cap {
                    tracing::debug!(
                        "{} result pages, capped at {}",
                        page.total_pages,
                        self.page_cap
                    );
                }
            }

            tracing::debug!(
                "Page {}/{}: {} listing(s)",
                number,
                last_page,
                page.listings.len()
            );
            pages.push(FetchedPage { number, url, page });
            number += 1;
        }

        Ok(pages)
    }

    /// Loads one URL with retries, proxy rotation and backoff
    ///
    /// Once every proxy is blocked the remaining attempts go out directly.
    /// Cancellation during a backoff ends the load with
    /// [`FetchError::Aborted`].
    pub async fn fetch_page(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<LoadedPage, FetchError> {
        let mut proxy = self.proxies.next();

        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::trace!("{:?} {}", FetchState::Dispatching { attempt }, url);

            let outcome = {
                let slot = self.pool.acquire().await?;
                self.source.load(&slot, url, proxy.as_ref()).await
            };

            let (state, failure) = match outcome {
                LoadOutcome::Success { body, final_url } => {
                    return Ok(LoadedPage {
                        body,
                        final_url,
                        attempts: attempt,
                    })
                }
                LoadOutcome::Failed { status } => {
                    return Err(FetchError::UnexpectedStatus {
                        url: url.to_string(),
                        status,
                    })
                }
                LoadOutcome::Blocked { status } => {
                    (FetchState::Blocked, self.blocked(url, attempt, status))
                }
                LoadOutcome::Timeout => (
                    FetchState::Timeout,
                    self.transient(url, attempt, "timed out".to_string()),
                ),
                LoadOutcome::TransientError(message) => (
                    FetchState::TransientError,
                    self.transient(url, attempt, message),
                ),
            };

            tracing::debug!("Attempt {} for {} ended {:?}", attempt, url, state);

            match self.policy.next_step(attempt, state) {
                RetryStep::GiveUp => {
                    tracing::warn!("Giving up on {}: {}", url, failure);
                    return Err(failure);
                }
                RetryStep::Retry {
                    delay,
                    rotate_identity,
                } => {
                    if rotate_identity {
                        if let Some(blocked) = proxy.take() {
                            self.proxies.mark_blocked(&blocked);
                            proxy = self.proxies.next();
                            if proxy.is_none() {
                                tracing::warn!("Every proxy is blocked, retrying {} directly", url);
                            }
                        }
                    }

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!("Cancelled while backing off from {}: {}", url, failure);
                            return Err(FetchError::Aborted { pages_fetched: 0 });
                        }
                        _ = self.sleeper.sleep(delay) => {}
                    }
                }
            }
        }
    }

    fn blocked(&self, url: &Url, attempts: u32, status: Option<u16>) -> FetchError {
        FetchError::BlockedByTarget {
            url: url.to_string(),
            attempts,
            status,
        }
    }

    fn transient(&self, url: &Url, attempts: u32, message: String) -> FetchError {
        FetchError::TransientNetwork {
            url: url.to_string(),
            attempts,
            message,
        }
    }
}
