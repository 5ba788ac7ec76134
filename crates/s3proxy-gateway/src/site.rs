//! Composing one site's configuration into its request chain

use crate::config::SiteConfig;
use crate::handlers::ObjectFetchHandler;
use crate::middleware::{BasicAuth, Cors, ForceHttps, Gzip, ProxyHeaders, WebsiteIndex};
use crate::stage::{SiteChain, Stage};
use s3proxy_store::ObjectStore;
use std::sync::Arc;

/// Build the chain for `site`, outermost stage first.
///
/// The only store call made here is the website configuration lookup. If it
/// fails the site is served without index rewriting.
pub async fn build_site_chain(site: &SiteConfig, store: Arc<dyn ObjectStore>) -> SiteChain {
    let options = &site.options;
    let mut stages: Vec<Arc<dyn Stage>> = Vec::new();

    if options.proxied {
        stages.push(Arc::new(ProxyHeaders));
    }

    if options.force_ssl {
        stages.push(Arc::new(ForceHttps));
    }

    if site.users.is_empty() {
        tracing::warn!(host = %site.host, bucket = %site.bucket, "No users configured, site is open to everyone");
    } else {
        stages.push(Arc::new(BasicAuth::new(&site.users)));
    }

    if options.gzip {
        stages.push(Arc::new(Gzip::new()));
    }

    if options.cors {
        stages.push(Arc::new(Cors::new()));
    }

    if options.website {
        match store.website_index_suffix().await {
            Ok(suffix) => stages.push(Arc::new(WebsiteIndex::new(suffix))),
            Err(err) => tracing::warn!(
                host = %site.host,
                bucket = %site.bucket,
                error = %err,
                "Website configuration unavailable, index rewriting disabled"
            ),
        }
    }

    let endpoint = ObjectFetchHandler::new(store, options.prefix.clone());
    SiteChain::new(stages, Arc::new(endpoint))
}
