use std::{path::Path, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use nutrigate::{
    HttpClientAdapter, HttpHandler, MemoryCounterStore, ProxyService,
    adapters::router,
    config::{CounterStoreBackend, ProxyConfig, ProxyConfigValidator, load_config},
    metrics,
    ports::{counter_store::CounterStore, http_client::HttpClient},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "nutrigate.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "nutrigate.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "nutrigate.toml")]
        config: String,
    },
    /// Start the proxy server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "nutrigate.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    metrics::init_metrics().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    ProxyConfigValidator::validate(&config).context("Invalid configuration")?;
    let config = Arc::new(config);

    let graceful_shutdown = GracefulShutdown::new();
    {
        let signals = graceful_shutdown.clone();
        tokio::spawn(async move { signals.run_signal_handler().await });
    }

    let store = build_counter_store(&config, &graceful_shutdown)?;

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client")?);
    let service = Arc::new(
        ProxyService::new(config.clone(), http_client, store)
            .context("Failed to create proxy service")?,
    );
    let http_handler = Arc::new(HttpHandler::new(service.clone(), &config)?);
    let app = router(http_handler);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    tracing::info!(
        "NutriGate listening on {} (USDA: {}, Open Food Facts: {}, rate limiting: {})",
        config.listen_addr,
        config.usda.base_url,
        config.off.base_url,
        service.rate_limiting_enabled()
    );

    let shutdown = graceful_shutdown.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received: {:?}", reason);
        })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Bind the configured counter store and, for the in-memory one, start the sweeper.
fn build_counter_store(
    config: &ProxyConfig,
    shutdown: &GracefulShutdown,
) -> Result<Option<Arc<dyn CounterStore>>> {
    match config.rate_limit.store {
        CounterStoreBackend::Disabled => {
            tracing::warn!("Counter store disabled; requests will not be rate limited");
            Ok(None)
        }
        CounterStoreBackend::Memory => {
            let interval = humantime::parse_duration(&config.rate_limit.sweep_interval)
                .with_context(|| {
                    format!(
                        "Invalid rate_limit.sweep_interval: {}",
                        config.rate_limit.sweep_interval
                    )
                })?;
            let store = Arc::new(MemoryCounterStore::new());
            spawn_sweeper(store.clone(), interval, shutdown.clone());
            let store: Arc<dyn CounterStore> = store;
            Ok(Some(store))
        }
    }
}

fn spawn_sweeper(store: Arc<MemoryCounterStore>, every: Duration, shutdown: GracefulShutdown) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut stop = shutdown.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.purge_expired().await;
                    tracing::trace!("Counter sweep removed {} entries, {} remain", removed, store.len());
                }
                _ = stop.recv() => {
                    tracing::debug!("Counter sweeper stopping");
                    break;
                }
            }
        }
    });
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ProxyConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Client IP Header: {}", config.client_ip_header);
            println!("   • USDA: {}", config.usda.base_url);
            println!(
                "   • USDA Rate Limit: {} per {}",
                config.usda.rate_limit.requests, config.usda.rate_limit.window
            );
            println!("   • Open Food Facts: {}", config.off.base_url);
            println!(
                "   • Open Food Facts Rate Limit: {} per {}",
                config.off.rate_limit.requests, config.off.rate_limit.window
            );
            println!("   • Counter Store: {:?}", config.rate_limit.store);
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Set usda.api_key or NUTRIGATE__USDA__API_KEY");
            println!("   • Ensure all URLs start with http:// or https://");
            println!("   • Verify listen address format (e.g., '127.0.0.1:8787')");
            println!("   • Ensure rate limit windows use valid units (s, m, h)");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# NutriGate configuration
#
# Every key can be overridden from the environment with the NUTRIGATE__ prefix,
# e.g. NUTRIGATE__USDA__API_KEY=... or NUTRIGATE__LISTEN_ADDR=0.0.0.0:8787

listen_addr = "127.0.0.1:8787"

# Header carrying the trusted client address, used as the rate-limit identity
client_ip_header = "cf-connecting-ip"

[usda]
base_url = "https://api.nal.usda.gov/fdc/v1"
# Prefer NUTRIGATE__USDA__API_KEY over committing the key
api_key = ""
data_type = "Foundation"
page_size = 20
cache_max_age_secs = 300

[usda.rate_limit]
requests = 60
window = "60s"

[off]
base_url = "https://world.openfoodfacts.org"
user_agent = "NutriGate/0.1 (food data edge proxy)"
language = "en"
page_size = 20
search_cache_max_age_secs = 300
product_cache_max_age_secs = 86400

[off.rate_limit]
requests = 30
window = "60s"

[rate_limit]
# "memory" or "disabled"
store = "memory"
sweep_interval = "60s"

[logging]
level = "info"
json = true
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'nutrigate serve --config {config_path}' to start the server");
    Ok(())
}
