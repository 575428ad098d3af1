//! ProfileCache - Read-through caching proxy for GitHub profiles
//!
//! Main entry point for the profilecache CLI.

use clap::{Parser, Subcommand};
use futures::future::join_all;
use profilecache::config::{validate_config_result, ProxyConfig};
use profilecache::relationship::mutuals;
use profilecache::resolver::CacheResolver;
use profilecache::retry::{with_retry, RetryConfig};
use profilecache::server::ProxyServer;
use profilecache::source::GitHubSource;
use profilecache::store::{open_store, EntityStore};
use std::process;
use std::sync::Arc;

/// ProfileCache - caching proxy for GitHub user profiles
#[derive(Parser, Debug)]
#[command(name = "profilecache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/profilecache/config.yaml)
    #[arg(short, long, env = "PROFILECACHE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP proxy
    Serve {
        /// Listen host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve one profile through the cache and print it
    Get {
        /// Identity (GitHub login)
        identity: String,
    },

    /// Resolve many profiles concurrently, retrying transient failures
    Warm {
        /// Identities to resolve
        #[arg(required = true)]
        identities: Vec<String>,

        /// Retries per identity after the first attempt
        #[arg(short, long, default_value = "3")]
        retries: u32,
    },

    /// List candidates whose cached profile lists the subject as a follower
    Mutuals {
        /// Subject identity
        subject: String,

        /// Candidates to test (default: the subject's cached followers)
        candidates: Vec<String>,
    },

    /// Remove a cached profile
    Invalidate {
        /// Identity to remove
        identity: String,
    },

    /// Show store statistics
    Stats,

    /// Remove every cached profile
    ClearCache,
}

fn main() {
    if let Err(e) = profilecache::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: &Option<String>) -> profilecache::Result<ProxyConfig> {
    let config = match path {
        Some(path) => ProxyConfig::load(path)?,
        None => ProxyConfig::load_default_or_new()?,
    };
    validate_config_result(&config)?;
    Ok(config)
}

fn build_resolver(config: &ProxyConfig) -> profilecache::Result<CacheResolver> {
    let store = open_store(&config.store)?;
    let source = Arc::new(GitHubSource::new(&config.source)?);
    Ok(CacheResolver::new(store, source, &config.resolver))
}

fn run(cli: Cli) -> profilecache::Result<()> {
    if let Commands::Init { force } = cli.command {
        return handle_init(&cli.config, force);
    }

    let mut config = load_config(&cli.config)?;
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            validate_config_result(&config)?;

            let server = ProxyServer::from_config(&config)?;
            let addr = config.server.bind_addr();
            println!("Profile cache listening on http://{}", addr);
            runtime.block_on(server.run(&addr))?;
        }

        Commands::Get { identity } => {
            let resolver = build_resolver(&config)?;
            let snapshot = runtime.block_on(resolver.resolve(&identity))?;
            println!("{}", serde_json::to_string_pretty(&snapshot.details)?);
        }

        Commands::Warm {
            identities,
            retries,
        } => {
            let resolver = build_resolver(&config)?;
            let retry_config = RetryConfig::with_max_retries(retries);

            let results = runtime.block_on(join_all(identities.iter().map(|identity| {
                let resolver = &resolver;
                let retry_config = &retry_config;
                async move {
                    let result =
                        with_retry(retry_config, identity, move || resolver.resolve(identity))
                            .await;
                    (identity, result)
                }
            })));

            let mut failures = 0;
            for (identity, result) in results {
                match result {
                    Ok(snapshot) => println!(
                        "  ✓ {} ({} followers cached)",
                        identity,
                        snapshot.followers().map(|f| f.len()).unwrap_or(0)
                    ),
                    Err(e) => {
                        failures += 1;
                        println!("  ✗ {}: {}", identity, e);
                    }
                }
            }

            println!();
            println!(
                "Warmed {} of {} profiles",
                identities.len() - failures,
                identities.len()
            );
        }

        Commands::Mutuals {
            subject,
            candidates,
        } => {
            let store = open_store(&config.store)?;
            let candidates = if candidates.is_empty() {
                store
                    .get(&subject)?
                    .and_then(|s| {
                        s.followers()
                            .map(|f| f.into_iter().map(String::from).collect::<Vec<_>>())
                    })
                    .unwrap_or_default()
            } else {
                candidates
            };

            let found = mutuals(store.as_ref(), &subject, &candidates)?;
            println!(
                "Mutuals for {} ({} of {} candidates, cached data only):",
                subject,
                found.len(),
                candidates.len()
            );
            for identity in found {
                println!("  {}", identity);
            }
        }

        Commands::Invalidate { identity } => {
            let store = open_store(&config.store)?;
            if store.delete(&identity)? {
                println!("Removed {} from cache", identity);
            } else {
                println!("{} was not cached", identity);
            }
        }

        Commands::Stats => {
            let store = open_store(&config.store)?;
            let all = store.all()?;
            println!("Store backend: {:?}", config.store.backend);
            println!("Cached profiles: {}", all.len());
            let with_followers = all.iter().filter(|s| s.followers().is_some()).count();
            println!("With follower lists: {}", with_followers);
            if let Some(oldest) = all.iter().min_by_key(|s| s.fetched_at) {
                println!(
                    "Oldest snapshot: {} ({})",
                    oldest.identity,
                    oldest.fetched_at.to_rfc3339()
                );
            }
        }

        Commands::ClearCache => {
            let store = open_store(&config.store)?;
            let removed = store.clear()?;
            println!("Removed {} cached profiles", removed);
        }
    }

    Ok(())
}

fn handle_init(path: &Option<String>, force: bool) -> profilecache::Result<()> {
    let target = path
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(ProxyConfig::default_path);

    if target.exists() && !force {
        return Err(profilecache::ProfileCacheError::Config(format!(
            "Config already exists at {} (use --force to overwrite)",
            target.display()
        )));
    }

    let config = ProxyConfig::new();
    match path {
        Some(_) => config.save(&target)?,
        None => config.save_default()?,
    }
    println!("Wrote default configuration to {}", target.display());
    Ok(())
}
