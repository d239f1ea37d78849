use super::{AppConfig, ConfigError};

/// Validate a loaded configuration.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] for an unusable endpoint, key, model,
/// or sampling temperature.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let service = &config.service;

    if service.api_endpoint.trim().is_empty() {
        return Err(ConfigError::Validation(
            "service.api_endpoint must not be empty".to_string(),
        ));
    }
    let parsed = url::Url::parse(service.api_endpoint.trim())
        .map_err(|e| ConfigError::Validation(format!("service.api_endpoint is not a URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "service.api_endpoint must be http or https, got '{}'",
            parsed.scheme()
        )));
    }

    if service.api_key.is_empty() {
        return Err(ConfigError::Validation(
            "service.api_key must not be empty".to_string(),
        ));
    }
    if service.model.is_empty() {
        return Err(ConfigError::Validation(
            "service.model must not be empty".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&service.temperature) {
        return Err(ConfigError::Validation(format!(
            "service.temperature must be within [0.0, 2.0], got {}",
            service.temperature
        )));
    }
    if service.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "service.timeout_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(proxy) = service.proxy.as_deref() {
        url::Url::parse(proxy)
            .map_err(|e| ConfigError::Validation(format!("service.proxy is not a URL: {e}")))?;
    }

    Ok(())
}
