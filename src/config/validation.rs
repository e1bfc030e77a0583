use crate::config::types::{
    Config, EngineConfig, OutputConfig, ProxyConfig, TargetConfig, TierConfig, TierKind,
    UserAgentConfig,
};
use crate::extract::SelectorSet;
use crate::model::Urgency;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_target_config(&config.target)?;
    validate_proxy_config(&config.proxies)?;
    validate_output_config(&config.output)?;
    validate_tiers(&config.tier)?;
    Ok(())
}

/// Validates fetch and scheduling limits
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and 64, got {}",
            config.max_concurrent
        )));
    }

    if config.request_delay < 100 {
        return Err(ConfigError::Validation(format!(
            "request-delay must be >= 100ms, got {}ms",
            config.request_delay
        )));
    }

    if config.timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= 1000ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.page_cap < 1 {
        return Err(ConfigError::Validation(
            "page-cap must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_cycles < 1 {
        return Err(ConfigError::Validation(
            "max-concurrent-cycles must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the target site and compiles its selectors
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.block_markers.iter().any(|marker| marker.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "block-markers cannot contain empty strings".to_string(),
        ));
    }

    SelectorSet::compile(&config.selectors)?;

    Ok(())
}

/// Validates proxy identities
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for identity in &config.identities {
        let url = Url::parse(identity).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", identity, e))
        })?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http, https or socks5",
                identity
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates tier definitions
fn validate_tiers(tiers: &[TierConfig]) -> Result<(), ConfigError> {
    if tiers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[tier]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for tier in tiers {
        if tier.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tier name cannot be empty".to_string(),
            ));
        }

        if !names.insert(tier.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate tier name '{}'",
                tier.name
            )));
        }

        validate_cron(tier)?;

        if let Some(urgency) = &tier.urgency {
            if Urgency::parse(urgency).is_none() {
                return Err(ConfigError::Validation(format!(
                    "tier '{}' has unknown urgency '{}'",
                    tier.name, urgency
                )));
            }
        }

        if tier.kind == TierKind::Cleanup && tier.retain_days < 1 {
            return Err(ConfigError::Validation(format!(
                "cleanup tier '{}' must retain at least one day",
                tier.name
            )));
        }
    }

    Ok(())
}

/// Checks the cron expression shape (seconds-first, six or seven fields)
///
/// The scheduler parses the expression again when the job is created; this
/// catches the common five-field mistake before anything starts.
fn validate_cron(tier: &TierConfig) -> Result<(), ConfigError> {
    let fields = tier.cron.split_whitespace().count();
    if !(6..=7).contains(&fields) {
        return Err(ConfigError::InvalidCron {
            tier: tier.name.clone(),
            expression: tier.cron.clone(),
        });
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(name: &str, cron: &str) -> TierConfig {
        TierConfig {
            name: name.to_string(),
            cron: cron.to_string(),
            kind: TierKind::Monitor,
            urgency: None,
            retain_days: 30,
        }
    }

    #[test]
    fn test_validate_tiers() {
        assert!(validate_tiers(&[tier("high", "0 */5 * * * *")]).is_ok());
        assert!(validate_tiers(&[]).is_err());
        assert!(validate_tiers(&[tier("high", "0 * * * * *"), tier("high", "0 0 * * * *")]).is_err());
    }

    #[test]
    fn test_validate_cron_field_count() {
        let err = validate_tiers(&[tier("low", "*/5 * * * *")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCron { .. }));

        assert!(validate_tiers(&[tier("low", "0 0 * * * * 2030")]).is_ok());
    }

    #[test]
    fn test_validate_unknown_urgency() {
        let mut bad = tier("high", "0 * * * * *");
        bad.urgency = Some("asap".to_string());
        assert!(validate_tiers(&[bad]).is_err());
    }

    #[test]
    fn test_validate_proxies() {
        let ok = ProxyConfig {
            identities: vec!["socks5://10.0.0.1:1080".to_string()],
        };
        assert!(validate_proxy_config(&ok).is_ok());

        let bad = ProxyConfig {
            identities: vec!["ftp://10.0.0.1".to_string()],
        };
        assert!(validate_proxy_config(&bad).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
