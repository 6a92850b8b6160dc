use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use redwindow::config::RedwindowConfig;
use redwindow::ratelimit::FixedWindowLimiter;
use redwindow::store::RedisStore;

/// Inspect and adjust fixed-window rate limit counters in Redis.
#[derive(Debug, Parser)]
#[command(name = "redwindow", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Redis URL, overriding the configuration
    #[arg(long)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Consume points for a subject
    Consume {
        subject: String,
        #[arg(short, long, default_value_t = 1)]
        points: u64,
    },
    /// Overwrite a subject's window with an exact value
    Set {
        subject: String,
        #[arg(short, long)]
        points: u64,
        /// Window length in milliseconds; 0 means no expiry
        #[arg(short, long)]
        duration_ms: u64,
    },
    /// Show a subject's active window
    Peek { subject: String },
    /// Remove a subject's window
    Delete { subject: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => RedwindowConfig::from_file(path)?,
        None => RedwindowConfig::default(),
    };
    if let Some(url) = cli.redis_url {
        config.redis.url = url;
    }
    info!(redis = %config.redis.url, "Configuration loaded");

    let client = redis::Client::open(config.redis.url.as_str())?;
    let conn = client.get_multiplexed_async_connection().await?;
    let store = RedisStore::from_connection(conn, config.limiter.store_options())?;
    let limiter = FixedWindowLimiter::new(Arc::new(store), config.limiter.limit_config());

    let output = match cli.command {
        Command::Consume { subject, points } => {
            let key = config.limiter.key(&subject);
            serde_json::to_string_pretty(&limiter.consume(&key, points).await?)?
        }
        Command::Set {
            subject,
            points,
            duration_ms,
        } => {
            let key = config.limiter.key(&subject);
            let window = Duration::from_millis(duration_ms);
            serde_json::to_string_pretty(&limiter.set(&key, points, window).await?)?
        }
        Command::Peek { subject } => {
            let key = config.limiter.key(&subject);
            serde_json::to_string_pretty(&limiter.get(&key).await?)?
        }
        Command::Delete { subject } => {
            let key = config.limiter.key(&subject);
            let deleted = limiter.delete(&key).await?;
            serde_json::to_string_pretty(&serde_json::json!({ "deleted": deleted }))?
        }
    };

    println!("{}", output);
    Ok(())
}
