//! Shared fixtures

use auto_alert::config::{
    Config, EngineConfig, OutputConfig, ProxyConfig, SelectorConfig, TargetConfig, TierConfig,
    TierKind, UserAgentConfig,
};
use auto_alert::storage::{CriteriaStore, SqliteStore};
use auto_alert::SearchCriteria;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at a mock catalog
pub fn test_config(base_url: &str, db_path: &Path, max_retries: u32) -> Config {
    Config {
        engine: EngineConfig {
            max_concurrent: 2,
            request_delay: 10,
            timeout_ms: 2000,
            max_retries,
            base_delay: 5,
            page_cap: 5,
            max_concurrent_cycles: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        target: TargetConfig {
            base_url: format!("{}/search", base_url),
            respect_robots: true,
            block_markers: vec!["captcha-challenge".to_string()],
            selectors: SelectorConfig::default(),
        },
        proxies: ProxyConfig::default(),
        output: OutputConfig {
            database_path: db_path.display().to_string(),
        },
        tier: vec![
            TierConfig {
                name: "high".to_string(),
                cron: "0 */5 * * * *".to_string(),
                kind: TierKind::Monitor,
                urgency: Some("immediate".to_string()),
                retain_days: 30,
            },
            TierConfig {
                name: "cleanup".to_string(),
                cron: "0 0 3 * * *".to_string(),
                kind: TierKind::Cleanup,
                urgency: None,
                retain_days: 14,
            },
        ],
    }
}

/// Serves robots.txt with the given body
pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// One result card in the markup the built-in selectors expect
pub fn result_card(id: u32, title: &str, price: &str, specs: &str) -> String {
    format!(
        r#"<article class="result-item" data-listing-id="{id}">
             <h2 class="result-title">{title}</h2>
             <a class="result-link" href="/d/{id}">details</a>
             <span class="result-price">{price}</span>
             <div class="result-specs">{specs}</div>
           </article>"#
    )
}

/// A result page with the given cards and page count
pub fn result_page(cards: &[String], total_pages: u32) -> String {
    let pagination: String = (1..=total_pages)
        .map(|page| format!(r#"<a href="?pageNumber={page}">{page}</a>"#))
        .collect();
    format!(
        r#"<html><body>
             <main>{}</main>
             <nav class="pagination">{}</nav>
           </body></html>"#,
        cards.join("\n"),
        pagination
    )
}

/// Stores a search and returns it as persisted
pub async fn add_search(store: &SqliteStore, name: &str, active: bool) -> SearchCriteria {
    let mut search = SearchCriteria::new("user-1", name, "high");
    search.active = active;
    let id = store.upsert_criteria(&search).await.unwrap();
    store.get_criteria(id).await.unwrap().unwrap()
}
