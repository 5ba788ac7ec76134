//! Application state

use crate::config::{GatewayConfig, SiteConfig, SiteSource};
use crate::error::ConfigError;
use crate::routes::{HostRouter, ProxyHandler};
use crate::site::build_site_chain;
use s3proxy_store::{ObjectStore, S3ObjectStore, S3StoreConfig};
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests. Built once at startup.
#[derive(Debug)]
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Site chains, routed by host in multi-site mode
    pub handler: ProxyHandler,
}

impl AppState {
    /// Create the state, connecting each site to its S3 bucket
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        Self::with_stores(config, |site| -> Arc<dyn ObjectStore> {
            Arc::new(S3ObjectStore::new(store_config(site)))
        })
        .await
    }

    /// Create the state with a caller-supplied store per site
    pub async fn with_stores<F>(config: GatewayConfig, connect: F) -> anyhow::Result<Self>
    where
        F: Fn(&SiteConfig) -> Arc<dyn ObjectStore>,
    {
        let handler = match &config.sites {
            SiteSource::Single(site) => {
                let chain = build_site_chain(site, connect(site)).await;
                info!(bucket = %site.bucket, stages = ?chain.stage_names(), "Serving single site");
                ProxyHandler::Single(chain)
            }
            SiteSource::Multi(sites) => {
                if sites.is_empty() {
                    return Err(ConfigError::NoSites.into());
                }

                let mut router = HostRouter::new();
                for site in sites {
                    let chain = build_site_chain(site, connect(site)).await;
                    info!(
                        host = %site.host,
                        bucket = %site.bucket,
                        stages = ?chain.stage_names(),
                        "Registered site"
                    );
                    router.register_host(site.host.clone(), chain);
                }
                ProxyHandler::Routed(router)
            }
        };

        Ok(Self { config, handler })
    }
}

fn store_config(site: &SiteConfig) -> S3StoreConfig {
    let config = S3StoreConfig::new(
        site.store_key.clone(),
        site.store_secret.clone(),
        site.region.clone(),
        site.bucket.clone(),
    );
    match site.endpoint.as_deref().filter(|e| !e.is_empty()) {
        Some(endpoint) => config.with_endpoint(endpoint),
        None => config,
    }
}
