use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RotationStrategy, SeedEntry, SiteConfig, UserAgentConfig,
};
use crate::url::ensure_on_site;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    let root = validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds, &root)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 64, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates the site root and returns it parsed
fn validate_site_config(config: &SiteConfig) -> Result<Url, ConfigError> {
    let root = Url::parse(&config.root)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site root '{}': {}", config.root, e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Site root '{}' must use HTTP or HTTPS",
            config.root
        )));
    }

    if root.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Site root '{}' has no host",
            config.root
        )));
    }

    Ok(root)
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.identities.iter().any(|id| id.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "identities cannot contain empty entries".to_string(),
        ));
    }

    if config.rotation == RotationStrategy::Fixed && config.identities.len() != 1 {
        return Err(ConfigError::Validation(format!(
            "fixed rotation needs exactly one identity, got {}",
            config.identities.len()
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed entries against the site root
fn validate_seeds(seeds: &[SeedEntry], root: &Url) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[seed]] entry is required".to_string(),
        ));
    }

    for seed in seeds {
        ensure_on_site(&seed.url, root)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", seed.url, e)))?;
    }

    Ok(())
}
