// FILE: crates/cli/src/commands.rs

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use sublink_config::Config;
use sublink_network::{
    format_file_size, ApiClient, ApiRequest, Artwork, ArtworkCache, ArtworkSource, Client,
    ClientConfig, ConnectionCategory, Credentials, EndpointCandidates, FixedNetworkProbe,
    HttpTransport, ImageSize, ResourceFetcher, RoutePolicy, RouteSelectionResult, RouteSelector,
};
use sublink_resilience::{RequestThrottler, RetryPolicy};

/// Everything a command needs, built once from the configuration
pub struct Services {
    pub candidates: EndpointCandidates,
    pub credentials: Credentials,
    pub compatible_mode: bool,
    pub selector: RouteSelector,
    pub fetcher: ResourceFetcher,
    pub throttler: RequestThrottler,
    pub cache_dir: PathBuf,
    pub expiration_days: u32,
    pub clean_on_startup: bool,
}

impl Services {
    pub fn from_config(config: &Config, network: ConnectionCategory) -> Result<Self> {
        let client = Client::with_config(ClientConfig {
            timeout: config.network.request_timeout(),
            user_agent: config.network.user_agent.clone(),
            ..ClientConfig::default()
        })
        .context("Failed to create HTTP client")?;
        Self::with_transport(config, network, Arc::new(client))
    }

    pub fn with_transport(
        config: &Config,
        network: ConnectionCategory,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let server = &config.server;
        let selector = RouteSelector::new(transport.clone(), Arc::new(FixedNetworkProbe(network)))
            .with_policy(RoutePolicy {
                probe_timeout: config.network.probe_timeout(),
                secondary_only_on_cellular: config.network.secondary_only_on_cellular,
            });
        let fetcher = ResourceFetcher::new(transport).with_policy(retry_policy(config));

        Ok(Self {
            candidates: EndpointCandidates::new(server.primary_url.clone(), server.secondary_url.clone()),
            credentials: Credentials::new(server.username.clone(), server.password.clone()),
            compatible_mode: server.compatible_mode,
            selector,
            fetcher,
            throttler: RequestThrottler::new(config.network.max_concurrent_requests),
            cache_dir: config
                .cache
                .resolved_directory()
                .context("Failed to resolve artwork cache directory")?,
            expiration_days: config.cache.expiration_days,
            clean_on_startup: config.cache.clean_on_startup,
        })
    }

    /// Runs route selection, turning a failure into an error carrying the
    /// reason verbatim
    pub async fn select_route(&self) -> Result<String> {
        match self.selector.select(&self.candidates, &self.credentials).await {
            RouteSelectionResult::Selected { url } => Ok(url),
            RouteSelectionResult::Failed { reason } => bail!("{}", reason),
        }
    }

    pub async fn api_client(&self) -> Result<ApiClient> {
        let base_url = self.select_route().await?;
        Ok(ApiClient::new(base_url, self.credentials.clone(), self.fetcher.clone())
            .with_compatible_mode(self.compatible_mode))
    }

    pub fn open_cache(&self) -> Result<ArtworkCache> {
        ArtworkCache::open(&self.cache_dir, self.throttler.clone(), self.fetcher.clone())
            .with_context(|| format!("Failed to open artwork cache at {}", self.cache_dir.display()))
    }
}

/// Retry policy from the network section: `max_retries` retries after the
/// first attempt, doubling from `initial_backoff_ms`
pub fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::with_max_retries(config.network.max_retries)
        .with_initial_delay(config.network.initial_backoff())
        .with_multiplier(2.0)
        .with_jitter(false)
}

/// Show which server address would be used
pub async fn show_route(services: &Services) -> Result<()> {
    let url = services.select_route().await?;
    println!("{} Using {}", style("✓").green().bold(), style(url).bold());
    Ok(())
}

/// Check credentials against the selected server
pub async fn ping(services: &Services) -> Result<()> {
    let api = services.api_client().await?;
    api.ping().await.context("Ping failed")?;
    println!(
        "{} {} accepted the credentials",
        style("✓").green().bold(),
        api.base_url()
    );
    Ok(())
}

/// Call an arbitrary REST method
pub async fn call(services: &Services, matches: &ArgMatches) -> Result<()> {
    let method = matches
        .get_one::<String>("method")
        .ok_or_else(|| anyhow!("Method is required"))?;

    let mut request = ApiRequest::new(method.as_str());
    for raw in matches.get_many::<String>("params").into_iter().flatten() {
        let (key, value) = parse_param(raw)?;
        request = request.param(key, value);
    }

    let api = services.api_client().await?;
    let response = api
        .call(&request)
        .await
        .with_context(|| format!("{} failed", method))?;

    println!("{}", String::from_utf8_lossy(response.body()));
    Ok(())
}

/// Fetch cover art through the cache
pub async fn artwork(services: &Services, matches: &ArgMatches) -> Result<()> {
    let cover_id = matches
        .get_one::<String>("cover-id")
        .ok_or_else(|| anyhow!("Cover id is required"))?;
    let size = parse_size(
        matches
            .get_one::<String>("size")
            .map(|s| s.as_str())
            .unwrap_or("original"),
    )?;

    let cache = services.open_cache()?;
    if services.clean_on_startup {
        cache.clean_expired(services.expiration_days).await;
    }

    let api = services.api_client().await?;
    let url = api.cover_art_url(cover_id, size)?;

    match cache.get(&url).await {
        Artwork::Image {
            bytes,
            image,
            source,
        } => {
            let origin = match source {
                ArtworkSource::Cache => "cache",
                ArtworkSource::Network => "server",
            };
            println!(
                "{} {}x{} image, {} (from {})",
                style("✓").green().bold(),
                image.width(),
                image.height(),
                format_file_size(bytes.len() as u64),
                origin
            );

            if let Some(output) = matches.get_one::<String>("output") {
                std::fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output))?;
                println!("  Saved to {}", output);
            }
        }
        Artwork::Placeholder { path } => {
            println!(
                "{} No artwork available, placeholder is {}",
                style("!").yellow().bold(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Artwork cache maintenance
pub async fn cache(services: &Services, matches: &ArgMatches) -> Result<()> {
    let cache = services.open_cache()?;

    match matches.subcommand() {
        Some(("size", _)) => {
            let entries = cache.entries().await;
            let total: u64 = entries.iter().map(|entry| entry.size_bytes).sum();
            println!("\n{}", style("Artwork Cache").bold().cyan());
            println!("{}", "=".repeat(40));
            println!("Location: {}", cache.root().display());
            println!("Entries:  {}", entries.len());
            println!("Size:     {}", format_file_size(total));
        }
        Some(("clear", _)) => {
            let removed = cache.clear_all().await;
            println!("{} Removed {} cached images", style("✓").green().bold(), removed);
        }
        Some(("clean", sub_matches)) => {
            let days = sub_matches
                .get_one::<u32>("days")
                .copied()
                .unwrap_or(services.expiration_days);
            let removed = cache.clean_expired(days).await;
            println!(
                "{} Removed {} images older than {} days",
                style("✓").green().bold(),
                removed,
                days
            );
        }
        _ => bail!("Unknown cache command"),
    }

    Ok(())
}

/// Splits `key=value`. The value may itself contain `=`.
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => bail!("Invalid parameter '{}', expected KEY=VALUE", raw),
    }
}

pub fn parse_size(raw: &str) -> Result<ImageSize> {
    match raw {
        "thumbnail" => Ok(ImageSize::Thumbnail),
        "original" => Ok(ImageSize::Original),
        other => bail!("Unknown image size '{}'", other),
    }
}
