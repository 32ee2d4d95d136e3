use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ProxyConfig;

/// Prefix for environment overrides, e.g. `NUTRIGATE__USDA__API_KEY`.
pub const ENV_PREFIX: &str = "NUTRIGATE";

/// Load configuration from an optional file layered under `NUTRIGATE__*` environment
/// variables. Supports YAML, JSON and TOML files.
pub async fn load_config(config_path: &str) -> Result<ProxyConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<ProxyConfig> {
    load_with_environment(config_path, default_environment())
}

fn default_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

fn file_format(config_path: &Path) -> FileFormat {
    match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

fn load_with_environment(config_path: &str, environment: Environment) -> Result<ProxyConfig> {
    let path = Path::new(config_path);

    // The file is optional so that a deployment can run from environment variables alone.
    let settings = Config::builder()
        .add_source(
            File::new(
                path.to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
                file_format(path),
            )
            .required(false),
        )
        .add_source(environment)
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?;

    let proxy_config: ProxyConfig = settings
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {}", path.display()))?;

    Ok(proxy_config)
}
