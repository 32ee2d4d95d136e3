//! Configuration data structures for NutriGate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and to
//! `NUTRIGATE__*` environment variables. They are serde‑friendly and include defaults so
//! that a deployment only has to provide the USDA API key.
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Header carrying the caller address as set by the edge network.
pub const DEFAULT_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// User agent sent to Open Food Facts, which asks API clients to identify themselves.
pub const DEFAULT_OFF_USER_AGENT: &str = "NutriGate/0.1 (food data edge proxy)";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen_addr: String,
    /// Trusted header holding the caller identity used for rate limiting.
    pub client_ip_header: String,
    pub usda: UsdaConfig,
    pub off: OffConfig,
    pub rate_limit: RateLimitStoreConfig,
    pub logging: LoggingConfig,
}

impl ProxyConfig {
    /// Create a new proxy configuration builder
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
            usda: UsdaConfig::default(),
            off: OffConfig::default(),
            rate_limit: RateLimitStoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// USDA FoodData Central upstream settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UsdaConfig {
    pub base_url: String,
    /// Private key appended server side, never exposed to callers.
    pub api_key: String,
    pub data_type: String,
    pub page_size: u32,
    pub cache_max_age_secs: u64,
    pub rate_limit: RateLimitConfig,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            api_key: String::new(),
            data_type: "Foundation".to_string(),
            page_size: 20,
            cache_max_age_secs: 300,
            rate_limit: RateLimitConfig {
                requests: 60,
                window: "60s".to_string(),
            },
        }
    }
}

/// Open Food Facts upstream settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OffConfig {
    pub base_url: String,
    pub user_agent: String,
    pub language: String,
    pub page_size: u32,
    /// Field allow-list requested for search results
    pub search_fields: Vec<String>,
    /// Field allow-list requested for single product lookups
    pub product_fields: Vec<String>,
    pub search_cache_max_age_secs: u64,
    pub product_cache_max_age_secs: u64,
    pub rate_limit: RateLimitConfig,
}

impl Default for OffConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".to_string(),
            user_agent: DEFAULT_OFF_USER_AGENT.to_string(),
            language: "en".to_string(),
            page_size: 20,
            search_fields: to_strings(&[
                "code",
                "product_name",
                "product_name_en",
                "brands",
                "quantity",
                "serving_size",
                "nutriments",
                "nutrition_grades_tags",
                "image_url",
                "image_front_small_url",
                "categories_tags",
            ]),
            product_fields: to_strings(&[
                "code",
                "product_name",
                "product_name_en",
                "product_name_fr",
                "product_name_de",
                "product_name_es",
                "generic_name",
                "brands",
                "quantity",
                "serving_size",
                "nutriments",
                "nutrition_grades_tags",
                "nutriscore_grade",
                "nutriscore_score",
                "ecoscore_grade",
                "ecoscore_score",
                "nova_group",
                "ingredients_text",
                "allergens_tags",
                "packaging",
                "packaging_tags",
                "categories_tags",
                "image_url",
                "image_front_url",
                "image_front_small_url",
            ]),
            search_cache_max_age_secs: 300,
            product_cache_max_age_secs: 86_400,
            rate_limit: RateLimitConfig {
                requests: 30,
                window: "60s".to_string(),
            },
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Fixed-window quota applied per caller identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests: u64,
    pub window: String, // Parsed by humantime, e.g., "60s", "5m"
}

impl RateLimitConfig {
    /// Parse the window into a duration.
    pub fn window_duration(&self) -> Result<Duration, String> {
        humantime::parse_duration(&self.window)
            .map_err(|e| format!("Invalid window '{}': {e}", self.window))
    }
}

/// Which counter store backs the rate gate.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CounterStoreBackend {
    #[default]
    Memory,
    /// No store bound; every request is admitted.
    Disabled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitStoreConfig {
    pub store: CounterStoreBackend,
    /// How often expired counters are swept from the in-memory store.
    pub sweep_interval: String,
}

impl Default for RateLimitStoreConfig {
    fn default() -> Self {
        Self {
            store: CounterStoreBackend::Memory,
            sweep_interval: "60s".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Builder for ProxyConfig, mostly useful for tests and embedding.
#[derive(Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn client_ip_header(mut self, header: impl Into<String>) -> Self {
        self.config.client_ip_header = header.into();
        self
    }

    pub fn usda_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.usda.api_key = key.into();
        self
    }

    pub fn usda_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.usda.base_url = url.into();
        self
    }

    pub fn off_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.off.base_url = url.into();
        self
    }

    pub fn usda_rate_limit(mut self, requests: u64, window: impl Into<String>) -> Self {
        self.config.usda.rate_limit = RateLimitConfig {
            requests,
            window: window.into(),
        };
        self
    }

    pub fn off_rate_limit(mut self, requests: u64, window: impl Into<String>) -> Self {
        self.config.off.rate_limit = RateLimitConfig {
            requests,
            window: window.into(),
        };
        self
    }

    pub fn store(mut self, backend: CounterStoreBackend) -> Self {
        self.config.rate_limit.store = backend;
        self
    }

    pub fn build(self) -> ProxyConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_give_off_a_lower_limit() {
        let config = ProxyConfig::default();
        assert!(config.off.rate_limit.requests < config.usda.rate_limit.requests);
        assert_eq!(config.usda.page_size, 20);
        assert_eq!(config.off.product_cache_max_age_secs, 86_400);
        assert_eq!(config.client_ip_header, DEFAULT_CLIENT_IP_HEADER);
    }

    #[test]
    fn test_window_duration() {
        let limit = RateLimitConfig {
            requests: 5,
            window: "2m".to_string(),
        };
        assert_eq!(limit.window_duration().unwrap(), Duration::from_secs(120));

        let bad = RateLimitConfig {
            requests: 5,
            window: "soon".to_string(),
        };
        assert!(bad.window_duration().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ProxyConfig::builder()
            .usda_api_key("secret")
            .off_rate_limit(3, "10s")
            .store(CounterStoreBackend::Disabled)
            .build();
        assert_eq!(config.usda.api_key, "secret");
        assert_eq!(config.off.rate_limit.requests, 3);
        assert_eq!(config.rate_limit.store, CounterStoreBackend::Disabled);
    }

    #[test]
    fn test_store_backend_deserializes_snake_case() {
        let cfg: RateLimitStoreConfig =
            serde_json::from_str(r#"{"store":"disabled"}"#).unwrap();
        assert_eq!(cfg.store, CounterStoreBackend::Disabled);
        assert_eq!(cfg.sweep_interval, "60s");
    }
}
