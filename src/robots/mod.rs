//! Compliance checks
//!
//! Every cycle asks a [`ComplianceCheck`] before its first request. The
//! robots.txt implementation fetches the target's robots.txt once per
//! process and evaluates the cached rules on every call.

mod parser;

pub use parser::ParsedRobots;

use crate::config::{Config, UserAgentConfig};
use crate::fetch::build_http_client;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

#[async_trait]
pub trait ComplianceCheck: Send + Sync {
    async fn is_allowed(&self, target: &Url) -> bool;
}

/// Allows every target; used when `respect-robots` is off
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ComplianceCheck for AllowAll {
    async fn is_allowed(&self, _target: &Url) -> bool {
        true
    }
}

/// robots.txt-based compliance
pub struct RobotsCompliance {
    client: Client,
    agent: String,
    robots: OnceCell<ParsedRobots>,
}

impl RobotsCompliance {
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout, None)?,
            agent: user_agent.crawler_name.clone(),
            robots: OnceCell::new(),
        })
    }

    /// Rules already in hand, for tests and dry runs
    pub fn with_rules(user_agent: &UserAgentConfig, robots: ParsedRobots) -> Result<Self, reqwest::Error> {
        Ok(Self {
            robots: OnceCell::new_with(Some(robots)),
            ..Self::new(user_agent, Duration::from_secs(10))?
        })
    }

    async fn rules(&self, target: &Url) -> &ParsedRobots {
        self.robots
            .get_or_init(|| fetch_robots(&self.client, target))
            .await
    }
}

#[async_trait]
impl ComplianceCheck for RobotsCompliance {
    async fn is_allowed(&self, target: &Url) -> bool {
        let allowed = self.rules(target).await.is_allowed(target.as_str(), &self.agent);
        if !allowed {
            tracing::warn!("robots.txt disallows {} for {}", target, self.agent);
        }
        allowed
    }
}

/// Builds the compliance check the configuration asks for
pub fn compliance_for(config: &Config) -> Result<Arc<dyn ComplianceCheck>, reqwest::Error> {
    if config.target.respect_robots {
        Ok(Arc::new(RobotsCompliance::new(
            &config.user_agent,
            Duration::from_millis(config.engine.timeout_ms),
        )?))
    } else {
        Ok(Arc::new(AllowAll))
    }
}

/// Fetches robots.txt for the target's origin
///
/// Anything but a successful response yields allow-all rules.
pub async fn fetch_robots(client: &Client, target: &Url) -> ParsedRobots {
    let robots_url = match target.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot derive robots.txt URL from {}: {}", target, e);
            return ParsedRobots::allow_all();
        }
    };

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                tracing::info!("Loaded robots.txt from {}", robots_url);
                ParsedRobots::from_content(&body)
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}; allowing all", robots_url, e);
                ParsedRobots::allow_all()
            }
        },
        Ok(response) => {
            tracing::info!(
                "{} answered HTTP {}; allowing all",
                robots_url,
                response.status().as_u16()
            );
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}; allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
