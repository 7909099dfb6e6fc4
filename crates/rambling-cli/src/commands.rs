//! Command implementations for the CLI host.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::debug;

use rambling_core::cache::CacheStorage;
use rambling_core::models::StatusUpdate;
use rambling_core::router::{Lifecycle, ResponseSource, SeedOutcome, SeedReport};
use rambling_core::{
    CacheRouter, Config, DiskCacheStorage, HttpNetwork, LocalClients, Request, ServiceWorkerHost,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Activate,
    Start,
    Seed { force: bool },
    Fetch { path: String, method: String },
    Caches,
    Purge,
    Status { is_online: bool, is_logged_in: bool },
    Message(String),
    Config { save: bool },
}

impl Command {
    pub fn parse(args: &[String]) -> Option<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["activate"] => Command::Activate,
            ["start"] => Command::Start,
            ["seed"] => Command::Seed { force: false },
            ["seed", "--force"] => Command::Seed { force: true },
            ["fetch", path] => Command::Fetch {
                path: path.to_string(),
                method: "GET".to_string(),
            },
            ["fetch", path, method] => Command::Fetch {
                path: path.to_string(),
                method: method.to_string(),
            },
            ["caches"] => Command::Caches,
            ["purge"] => Command::Purge,
            ["status", online, logged_in] => Command::Status {
                is_online: online.parse().ok()?,
                is_logged_in: logged_in.parse().ok()?,
            },
            ["message", json] => Command::Message(json.to_string()),
            ["config"] => Command::Config { save: false },
            ["config", "--save"] => Command::Config { save: true },
            _ => return None,
        };
        Some(command)
    }
}

fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_env()?;
    debug!(origin = %config.origin, version = config.version, "Config loaded");
    Ok(config)
}

fn build_router(config: &Config) -> Result<CacheRouter> {
    let options = config.router_options()?;
    let cache_dir = config.cache_dir()?;
    debug!(?cache_dir, "Cache directory configured");

    let storage = DiskCacheStorage::new(cache_dir).context("Failed to open cache directory")?;
    let network =
        HttpNetwork::new(config.request_timeout()).context("Failed to create HTTP client")?;

    Ok(CacheRouter::new(
        options,
        Arc::new(storage),
        Arc::new(network),
        Arc::new(LocalClients::new()),
    ))
}

pub async fn run(command: Command) -> Result<()> {
    let config = load_config()?;

    if let Command::Config { save } = command {
        return show_config(&config, save);
    }

    let router = build_router(&config)?;
    match command {
        Command::Activate => activate(router).await,
        Command::Start => {
            let report = router.start().await;
            print_report(&report);
            Ok(())
        }
        Command::Seed { force } => {
            let report = router.cache_logged_out_files(force).await;
            print_report(&report);
            Ok(())
        }
        Command::Fetch { path, method } => fetch(&router, &path, &method).await,
        Command::Caches => list_caches(&router).await,
        Command::Purge => {
            let removed = router.clear_caches().await?;
            if removed.is_empty() {
                println!("No stale caches");
            }
            for name in removed {
                println!("deleted {}", name);
            }
            Ok(())
        }
        Command::Status {
            is_online,
            is_logged_in,
        } => {
            let update = StatusUpdate {
                is_online,
                is_logged_in,
            };
            let data = json!({ "statusUpdate": update });
            deliver_message(&router, &data).await
        }
        Command::Message(json) => {
            let data: Value = serde_json::from_str(&json).context("Message must be JSON")?;
            deliver_message(&router, &data).await
        }
        Command::Config { .. } => Ok(()),
    }
}

async fn deliver_message(router: &CacheRouter, data: &Value) -> Result<()> {
    router.on_message(data).await;
    let status = router.status();
    println!(
        "isOnline: {}, isLoggedIn: {}",
        status.is_online, status.is_logged_in
    );
    Ok(())
}

async fn activate(router: CacheRouter) -> Result<()> {
    let storage = Arc::clone(router.storage());
    let cache_name = router.cache_name();

    let mut host = ServiceWorkerHost::new(router);
    host.start().await;
    host.install().await?;
    host.activate().await?;

    let entries = storage.entries(&cache_name).await?;
    println!("{} activated with {} cached entries", cache_name, entries.len());
    Ok(())
}

async fn fetch(router: &CacheRouter, path: &str, method: &str) -> Result<()> {
    let cache_name = router.cache_name();
    if !router.storage().keys().await?.contains(&cache_name) {
        bail!("{} is not active yet; run `rambling-sw activate` first", cache_name);
    }

    let url = router
        .options()
        .origin
        .join(path)
        .with_context(|| format!("Invalid path: {}", path))?;
    let request = Request::parse(method, url.as_str())?;

    match router.on_fetch(request).await {
        Some(routed) => {
            let source = match routed.source {
                ResponseSource::Network => "network",
                ResponseSource::Cache => "cache",
            };
            println!(
                "{} {} from {} ({} bytes)",
                routed.response.status,
                url,
                source,
                routed.response.body.len()
            );
            for (name, value) in &routed.response.headers {
                println!("  {}: {}", name, value);
            }
            Ok(())
        }
        None => bail!("No response for {} (offline and not cached, or cross-origin)", url),
    }
}

async fn list_caches(router: &CacheRouter) -> Result<()> {
    let current = router.cache_name();
    let stale = router.stale_cache_names().await?;
    let names = router.storage().keys().await?;
    if names.is_empty() {
        println!("No caches");
    }

    for name in names {
        let marker = if name == current {
            " (current)"
        } else if stale.contains(&name) {
            " (stale)"
        } else {
            ""
        };
        let entries = router.storage().entries(&name).await?;
        println!("{}{}: {} entries", name, marker, entries.len());
        for (key, cached) in entries {
            println!(
                "  {:<24} {} {:>8} bytes  {}",
                key,
                cached.data.status,
                cached.data.body.len(),
                cached.age_display()
            );
        }
    }
    Ok(())
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    let path = Config::config_path()?;
    if save {
        config.save()?;
        println!("Saved {}", path.display());
    } else {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("# cache dir: {}", config.cache_dir()?.display());
    Ok(())
}

fn print_report(report: &SeedReport) {
    for (url, outcome) in &report.outcomes {
        let label = match outcome {
            SeedOutcome::AlreadyCached => "cached".to_string(),
            SeedOutcome::Stored => "stored".to_string(),
            SeedOutcome::Rejected(status) => format!("skipped ({})", status),
            SeedOutcome::Failed => "failed".to_string(),
        };
        println!("  {:<24} {}", url, label);
    }
    println!(
        "{} stored, {} already cached, {} not cached",
        report.stored(),
        report.count(SeedOutcome::AlreadyCached),
        report.outcomes.len() - report.stored() - report.count(SeedOutcome::AlreadyCached)
    );
}
