use crate::config::types::{ApiConfig, Config, CrawlConfig, LookupConfig, OutputConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_lookup_config(&config.lookup)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl engine configuration
///
/// Runs before the first search call so a bad configuration never costs a request.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed query is required".to_string(),
        ));
    }

    if config.seeds.iter().any(|seed| seed.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "seed queries cannot be empty".to_string(),
        ));
    }

    if config.location_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "location_id cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.expansion_threshold < 1 || config.expansion_threshold > config.page_size {
        return Err(ConfigError::Validation(format!(
            "expansion_threshold must be between 1 and page_size ({}), got {}",
            config.page_size, config.expansion_threshold
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    validate_alphabet(&config.expansion_alphabet)?;

    if let Some(max_nodes) = config.max_nodes {
        // Repeated seeds are admitted once
        let distinct_seeds = config
            .seeds
            .iter()
            .map(|seed| seed.trim())
            .collect::<HashSet<_>>()
            .len();
        if max_nodes < distinct_seeds {
            return Err(ConfigError::Validation(format!(
                "max_nodes ({}) cannot be smaller than the number of distinct seeds ({})",
                max_nodes, distinct_seeds
            )));
        }
    }

    Ok(())
}

/// Validates lookup pool configuration
pub fn validate_lookup_config(config: &LookupConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "lookup max_concurrency must be >= 1, got {}",
            config.max_concurrency
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "lookup page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.id_attribute.is_empty() {
        return Err(ConfigError::Validation(
            "id_attribute cannot be empty".to_string(),
        ));
    }

    scraper::Selector::parse(&config.id_selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", config.id_selector, e)))?;

    Ok(())
}

/// Validates search API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if !config.search_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "search_path must start with '/', got '{}'",
            config.search_path
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the expansion alphabet: non-empty, no whitespace, no repeated symbols
fn validate_alphabet(alphabet: &str) -> Result<(), ConfigError> {
    if alphabet.is_empty() {
        return Err(ConfigError::Validation(
            "expansion_alphabet cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for symbol in alphabet.chars() {
        if symbol.is_whitespace() {
            return Err(ConfigError::Validation(
                "expansion_alphabet cannot contain whitespace".to_string(),
            ));
        }
        if !seen.insert(symbol) {
            return Err(ConfigError::Validation(format!(
                "expansion_alphabet repeats symbol '{}'",
                symbol
            )));
        }
    }

    Ok(())
}
