//! Page sources
//!
//! A [`PageSource`] loads one URL inside a browsing context, optionally
//! through a proxy, and classifies the result. [`HttpPageSource`] is the
//! reqwest implementation; clients are built once per proxy identity.

use crate::config::{Config, UserAgentConfig};
use crate::fetch::pool::BrowsingContext;
use crate::fetch::proxy::ProxyIdentity;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Classified result of one load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Success { body: String, final_url: Url },

    /// The target refused us: 403, 429 or a block marker in the body
    Blocked { status: Option<u16> },

    Timeout,

    /// Connection problems and 5xx responses
    TransientError(String),

    /// Any other non-success status; not worth retrying
    Failed { status: u16 },
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(
        &self,
        context: &BrowsingContext,
        url: &Url,
        proxy: Option<&ProxyIdentity>,
    ) -> LoadOutcome;
}

/// Formats the crawler user agent: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client, optionally routed through a proxy
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    proxy: Option<&ProxyIdentity>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

pub struct HttpPageSource {
    user_agent: UserAgentConfig,
    timeout: Duration,
    block_markers: Vec<String>,
    clients: Mutex<HashMap<Option<ProxyIdentity>, Client>>,
}

impl HttpPageSource {
    pub fn new(user_agent: UserAgentConfig, timeout: Duration, block_markers: Vec<String>) -> Self {
        Self {
            user_agent,
            timeout,
            block_markers,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.user_agent.clone(),
            Duration::from_millis(config.engine.timeout_ms),
            config.target.block_markers.clone(),
        )
    }

    fn client(&self, proxy: Option<&ProxyIdentity>) -> Result<Client, reqwest::Error> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = proxy.cloned();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }
        let client = build_http_client(&self.user_agent, self.timeout, proxy)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    async fn fetch(&self, client: &Client, url: &Url) -> LoadOutcome {
        let response = match client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return LoadOutcome::Blocked {
                status: Some(status.as_u16()),
            };
        }
        if status.is_server_error() {
            return LoadOutcome::TransientError(format!("HTTP {}", status.as_u16()));
        }
        if !status.is_success() {
            return LoadOutcome::Failed {
                status: status.as_u16(),
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_error(&e),
        };

        if let Some(marker) = self.block_marker(&body) {
            tracing::debug!("Block marker '{}' found on {}", marker, final_url);
            return LoadOutcome::Blocked { status: None };
        }

        LoadOutcome::Success { body, final_url }
    }

    fn block_marker(&self, body: &str) -> Option<&str> {
        self.block_markers
            .iter()
            .map(String::as_str)
            .find(|marker| body.contains(marker))
    }
}

fn classify_error(error: &reqwest::Error) -> LoadOutcome {
    if error.is_timeout() {
        LoadOutcome::Timeout
    } else if error.is_connect() {
        LoadOutcome::TransientError(format!("connection failed: {}", error))
    } else {
        LoadOutcome::TransientError(error.to_string())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn load(
        &self,
        context: &BrowsingContext,
        url: &Url,
        proxy: Option<&ProxyIdentity>,
    ) -> LoadOutcome {
        let client = match self.client(proxy) {
            Ok(client) => client,
            Err(e) => {
                return LoadOutcome::TransientError(format!("failed to build HTTP client: {}", e))
            }
        };

        tracing::trace!(
            "Context {} loading {} via {}",
            context.id,
            url,
            proxy.map_or("direct", ProxyIdentity::as_str)
        );

        match tokio::time::timeout(self.timeout, self.fetch(&client, url)).await {
            Ok(outcome) => outcome,
            Err(_) => LoadOutcome::Timeout,
        }
    }
}
