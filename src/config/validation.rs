use crate::config::types::{CacheConfig, Config, CrawlerConfig, PlatformEntry, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_cache_config(&config.cache)?;
    validate_platform_entries(&config.platform)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_scrapes < 1 || config.max_concurrent_scrapes > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_scrapes must be between 1 and 100, got {}",
            config.max_concurrent_scrapes
        )));
    }

    if config.kin_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "kin_limit must be >= 1, got {}",
            config.kin_limit
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.default_ttl_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "default_ttl_secs must be >= 1, got {}",
            config.default_ttl_secs
        )));
    }

    Ok(())
}

/// Validates platform allowlist entries
///
/// Each entry must be a bare http(s) origin: scheme and host only, no path,
/// query, or fragment.
fn validate_platform_entries(entries: &[PlatformEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        let url = Url::parse(&entry.origin)
            .map_err(|_| ConfigError::InvalidPlatformOrigin(entry.origin.clone()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidPlatformOrigin(entry.origin.clone()));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidPlatformOrigin(entry.origin.clone()));
        }

        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::InvalidPlatformOrigin(entry.origin.clone()));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
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

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = Config::default();
        config.crawler.max_concurrent_scrapes = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_kin_limit_rejected() {
        let mut config = Config::default();
        config.crawler.kin_limit = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_platform_origin_with_path_rejected() {
        let mut config = Config::default();
        config.platform.push(PlatformEntry {
            origin: "https://github.com/alice".to_string(),
        });
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPlatformOrigin(_))
        ));
    }

    #[test]
    fn test_platform_origin_with_bad_scheme_rejected() {
        let mut config = Config::default();
        config.platform.push(PlatformEntry {
            origin: "ftp://github.com".to_string(),
        });
        assert!(validate(&config).is_err());
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
