//! Cache Connector CLI
//!
//! Inspect and edit cache entries from the command line.

use anyhow::{Context, Result};
use cache_connector::{CacheConfig, Cacher, CacherExt, RedisCacher};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cachectl")]
#[command(about = "Inspect and edit cache entries")]
struct Args {
    /// Store address (`host:port` or `redis://` URL); defaults to CACHE_ADDR / REDIS_URL
    #[arg(short, long)]
    addr: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Check that the store is reachable
    Ping,

    /// Print the value stored under a key
    Get {
        key: String,

        /// Print raw bytes as hex instead of text
        #[arg(long)]
        hex: bool,
    },

    /// Store a value under a key
    Set {
        key: String,
        value: String,

        /// Expiration in seconds (0 = never); defaults to CACHE_DEFAULT_TTL_SECS
        #[arg(short, long)]
        ttl: Option<u64>,
    },

    /// Delete a key
    Del { key: String },

    /// Expire a key the given number of seconds from now
    Expire { key: String, seconds: u64 },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "cache_connector=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn render(bytes: &[u8], hex: bool) -> String {
    if hex {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

async fn run(cache: &RedisCacher, command: Command, config: &CacheConfig) -> Result<()> {
    match command {
        Command::Ping => {
            cache.ping().await?;
            println!("PONG");
        }
        Command::Get { key, hex } => {
            let value = cache
                .get_object(&key, |bytes| Ok::<_, Infallible>(render(bytes, hex)))
                .await?;
            println!("{value}");
        }
        Command::Set { key, value, ttl } => {
            let ttl = ttl.map_or(config.default_ttl, Duration::from_secs);
            cache.create_object(&key, value.as_bytes(), ttl).await?;
            info!(%key, ?ttl, "Stored");
        }
        Command::Del { key } => {
            cache.remove_object(&key).await?;
            info!(%key, "Removed");
        }
        Command::Expire { key, seconds } => {
            cache
                .set_expiration(&key, Duration::from_secs(seconds))
                .await?;
            info!(%key, seconds, "Expiration set");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = CacheConfig::from_env();
    if let Some(addr) = args.addr {
        config.address = addr;
    }

    info!(version = cache_connector::VERSION, address = %config.address, "Connecting to cache store");
    let cache = RedisCacher::from_config(&config)
        .await
        .with_context(|| format!("failed to connect to {}", config.address))?;

    let outcome = run(&cache, args.command, &config).await;
    cache.close().await?;
    outcome
}
