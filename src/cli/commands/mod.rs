//! CLI command implementations

pub mod cache;
pub mod config;
pub mod hash;
pub mod send;
pub mod show;
pub mod watch;

pub use cache::execute as cache;
pub use config::execute as config;
pub use hash::execute as hash;
pub use send::execute as send;
pub use show::execute as show;
pub use watch::execute as watch;

use crate::cache::{CacheManager, SqliteStore};
use crate::cli::args::RequestArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{IhppError, IhppResult};
use crate::request::{Fingerprint, RequestDescriptor};
use std::sync::Arc;
use tracing::{debug, warn};

/// Open the durable store named by the configuration and wrap it in a cache
///
/// Opening eagerly surfaces an unusable store path before any work is done.
pub(crate) async fn open_cache(config: &Config) -> IhppResult<Arc<CacheManager>> {
    let store = configured_store(config);
    store.open().await?;
    Ok(Arc::new(CacheManager::new(Arc::new(store))))
}

/// Like [`open_cache`], but an unusable store only costs durability
///
/// The cache keeps working from memory and store errors are logged.
pub(crate) async fn open_cache_lenient(config: &Config) -> Arc<CacheManager> {
    let store = configured_store(config);
    if let Err(e) = store.open().await {
        warn!("Response store unavailable, continuing in memory: {}", e);
    }
    Arc::new(CacheManager::new(Arc::new(store)))
}

fn configured_store(config: &Config) -> SqliteStore {
    let path = ConfigManager::store_path(config);
    debug!("Opening response store at {}", path.display());
    SqliteStore::new(path)
}

pub(crate) fn build_request(args: &RequestArgs) -> RequestDescriptor {
    args.headers.iter().cloned().fold(
        RequestDescriptor::new(args.method.to_uppercase(), args.url.clone())
            .with_body(args.body.clone()),
        RequestDescriptor::with_header,
    )
}

pub(crate) fn parse_fingerprint(input: &str) -> IhppResult<Fingerprint> {
    Fingerprint::parse(input).ok_or_else(|| {
        IhppError::User(format!(
            "'{}' is not a fingerprint (expected 64 hex characters)",
            input
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Header;

    #[test]
    fn build_request_uppercases_method() {
        let args = RequestArgs {
            method: "post".to_string(),
            url: "https://x/y".to_string(),
            headers: vec![Header::new("A", "1")],
            body: "{}".to_string(),
        };
        let request = build_request(&args);
        assert_eq!(request.method, "POST");
        assert_eq!(request.headers, vec![Header::new("A", "1")]);
        assert_eq!(request.body, "{}");
    }

    #[test]
    fn parse_fingerprint_rejects_garbage() {
        assert!(matches!(parse_fingerprint("xyz"), Err(IhppError::User(_))));
    }

    #[tokio::test]
    async fn open_cache_uses_configured_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.store_path = Some(temp.path().join("nested").join("responses.db"));

        let cache = open_cache(&config).await.unwrap();
        assert_eq!(cache.durable_count().await.unwrap(), 0);
        assert!(temp.path().join("nested").join("responses.db").exists());
    }

    #[tokio::test]
    async fn lenient_open_survives_unusable_store_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("plain-file");
        std::fs::write(&file, "").unwrap();
        let mut config = Config::default();
        config.cache.store_path = Some(file.join("responses.db"));

        assert!(open_cache(&config).await.is_err());

        let cache = open_cache_lenient(&config).await;
        let key = Fingerprint::from_hex("a");
        let written = cache.update_state(&key, crate::response::ResponseUpdate::failed("x"));
        cache.flush().await;
        assert_eq!(cache.get_state(&key).await, written);
        assert!(cache.durable_count().await.is_err());
    }
}
