use std::net::SocketAddr;

use http::HeaderName;

use crate::config::models::{ProxyConfig, RateLimitConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Proxy configuration validator
pub struct ProxyConfigValidator;

impl ProxyConfigValidator {
    /// Validate the entire proxy configuration, reporting every problem at once.
    pub fn validate(config: &ProxyConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_header_name(&config.client_ip_header) {
            errors.push(e);
        }

        if config.usda.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "usda.api_key".to_string(),
            });
        }

        for (field, url) in [
            ("usda.base_url", &config.usda.base_url),
            ("off.base_url", &config.off.base_url),
        ] {
            if let Err(e) = Self::validate_url(url, field) {
                errors.push(e);
            }
        }

        for (field, limit) in [
            ("usda.rate_limit", &config.usda.rate_limit),
            ("off.rate_limit", &config.off.rate_limit),
        ] {
            if let Err(mut limit_errors) = Self::validate_rate_limit(field, limit) {
                errors.append(&mut limit_errors);
            }
        }

        if config.off.user_agent.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "off.user_agent".to_string(),
            });
        }

        for (field, size) in [
            ("usda.page_size", config.usda.page_size),
            ("off.page_size", config.off.page_size),
        ] {
            if size == 0 {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: "Page size must be greater than 0".to_string(),
                });
            }
        }

        if humantime::parse_duration(&config.rate_limit.sweep_interval).is_err() {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.sweep_interval".to_string(),
                message: format!(
                    "'{}' is not a duration like '30s' or '5m'",
                    config.rate_limit.sweep_interval
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8787' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_header_name(name: &str) -> ValidationResult<()> {
        HeaderName::from_bytes(name.as_bytes())
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: "client_ip_header".to_string(),
                message: format!("Invalid header name '{name}': {e}"),
            })
    }

    /// Validate URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    /// Validate rate limit configuration
    fn validate_rate_limit(
        field: &str,
        config: &RateLimitConfig,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if config.requests == 0 {
            errors.push(ValidationError::InvalidField {
                field: format!("{field}.requests"),
                message: "Rate limit requests must be greater than 0".to_string(),
            });
        }

        match config.window_duration() {
            Ok(window) if window.as_secs() == 0 => errors.push(ValidationError::InvalidField {
                field: format!("{field}.window"),
                message: "Window must be at least one second".to_string(),
            }),
            Ok(_) => {}
            Err(message) => errors.push(ValidationError::InvalidField {
                field: format!("{field}.window"),
                message,
            }),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
