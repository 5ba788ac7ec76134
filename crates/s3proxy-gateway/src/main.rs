//! s3proxy - serve S3 buckets over plain HTTP

use clap::builder::FalseyValueParser;
use clap::Parser;
use s3proxy_gateway::config::{parse_users, SiteConfig, SiteOptions, SiteSource};
use s3proxy_gateway::{run_server_with_shutdown, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "S3PROXY_CONFIG";

#[derive(Parser, Debug)]
#[command(name = "s3proxy")]
#[command(about = "Reverse proxy serving S3 buckets per virtual host")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "S3PROXY_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "S3PROXY_PORT")]
    port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "S3PROXY_DEBUG")]
    debug: bool,

    /// Seconds allowed until response headers are sent (0 disables)
    #[arg(long, default_value = "60", env = "S3PROXY_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    /// JSON file with a list of sites (multi-site mode)
    #[arg(long, env = "S3PROXY_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// JSON list of sites (multi-site mode, even when empty)
    #[arg(long = "config", env = "S3PROXY_CONFIG", hide_env_values = true)]
    config_json: Option<String>,

    /// Access key ID (single-site mode)
    #[arg(long, env = "S3PROXY_AWS_KEY", default_value = "")]
    aws_key: String,

    /// Secret access key (single-site mode)
    #[arg(long, env = "S3PROXY_AWS_SECRET", default_value = "", hide_env_values = true)]
    aws_secret: String,

    /// Bucket region (single-site mode)
    #[arg(long, env = "S3PROXY_AWS_REGION", default_value = "")]
    aws_region: String,

    /// Bucket name (single-site mode)
    #[arg(long, env = "S3PROXY_AWS_BUCKET", default_value = "")]
    aws_bucket: String,

    /// Custom S3 endpoint (single-site mode)
    #[arg(long, env = "S3PROXY_AWS_ENDPOINT")]
    aws_endpoint: Option<String>,

    /// Users as `name:password,name:password` (single-site mode)
    #[arg(long, env = "S3PROXY_USERS", default_value = "", hide_env_values = true)]
    users: String,

    /// Allow cross-origin GETs
    #[arg(long, env = "S3PROXY_OPTION_CORS", value_parser = FalseyValueParser::new())]
    cors: bool,

    /// Gzip responses for clients that accept it
    #[arg(long, env = "S3PROXY_OPTION_GZIP", value_parser = FalseyValueParser::new())]
    gzip: bool,

    /// Serve the bucket's website index document for directory paths
    #[arg(long, env = "S3PROXY_OPTION_WEBSITE", value_parser = FalseyValueParser::new())]
    website: bool,

    /// Key prefix prepended to every request path
    #[arg(long, env = "S3PROXY_OPTION_PREFIX", default_value = "")]
    prefix: String,

    /// Redirect plain HTTP to HTTPS
    #[arg(long, env = "S3PROXY_OPTION_FORCE_SSL", value_parser = FalseyValueParser::new())]
    force_ssl: bool,

    /// Trust X-Forwarded-* and Forwarded headers
    #[arg(long, env = "S3PROXY_OPTION_PROXIED", value_parser = FalseyValueParser::new())]
    proxied: bool,
}

impl Args {
    /// Sites file first, then inline JSON, else a single site from flags
    fn site_source(&self) -> anyhow::Result<SiteSource> {
        if let Some(path) = &self.config_file {
            return Ok(SiteSource::from_file(path)?);
        }
        // clap drops empty env values, but a set variable still selects multi-site mode
        let json = self
            .config_json
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok());
        if let Some(json) = json {
            return Ok(SiteSource::from_json(&json)?);
        }

        let site = SiteConfig {
            host: String::new(),
            store_key: self.aws_key.clone(),
            store_secret: self.aws_secret.clone(),
            region: self.aws_region.clone(),
            bucket: self.aws_bucket.clone(),
            endpoint: self.aws_endpoint.clone().filter(|e| !e.is_empty()),
            users: parse_users(&self.users)?,
            options: SiteOptions {
                cors: self.cors,
                gzip: self.gzip,
                website: self.website,
                prefix: self.prefix.clone(),
                force_ssl: self.force_ssl,
                proxied: self.proxied,
            },
        };
        Ok(SiteSource::single(site)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse arguments
    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("s3proxy_gateway={log_level},tower_http=info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let sites = args.site_source()?;
    match &sites {
        SiteSource::Single(_) => tracing::info!("Single-site mode"),
        SiteSource::Multi(list) => tracing::info!(sites = list.len(), "Multi-site mode"),
    }

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        request_timeout_secs: args.request_timeout_secs,
        sites,
    };

    run_server_with_shutdown(config, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
