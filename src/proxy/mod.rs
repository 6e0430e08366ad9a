//! Reverse-proxy route bookkeeping keyed by command id.
//!
//! The HTTP layer only needs to tear routes down; route creation belongs to
//! whatever component dispatches traffic to a command's backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Owner of the reverse-proxy routes attached to registry entities.
///
/// Both operations are idempotent: removing routes that do not exist is not
/// an error.
#[async_trait]
pub trait ProxyManager: Send + Sync {
    async fn delete_proxy(&self, key: &str);
    async fn delete_extension_proxies(&self, key: &str);
}

/// In-process route table.
#[derive(Default)]
pub struct RouteTable {
    proxies: RwLock<HashMap<String, String>>,
    extension_proxies: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_proxy(&self, key: &str, target: impl Into<String>) {
        self.proxies
            .write()
            .await
            .insert(key.to_string(), target.into());
    }

    pub async fn register_extension_proxy(
        &self,
        key: &str,
        extension: &str,
        target: impl Into<String>,
    ) {
        self.extension_proxies
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(extension.to_string(), target.into());
    }

    pub async fn proxy(&self, key: &str) -> Option<String> {
        self.proxies.read().await.get(key).cloned()
    }

    pub async fn extension_proxies(&self, key: &str) -> HashMap<String, String> {
        self.extension_proxies
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProxyManager for RouteTable {
    async fn delete_proxy(&self, key: &str) {
        if self.proxies.write().await.remove(key).is_some() {
            debug!(key, "proxy removed");
        }
    }

    async fn delete_extension_proxies(&self, key: &str) {
        if let Some(removed) = self.extension_proxies.write().await.remove(key) {
            debug!(key, count = removed.len(), "extension proxies removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_removes_only_matching_key() {
        let routes = RouteTable::new();
        routes.register_proxy("1", "http://10.0.0.1:8080").await;
        routes.register_proxy("2", "http://10.0.0.2:8080").await;
        routes.register_extension_proxy("1", "storidge", "http://10.0.0.1:8282").await;

        routes.delete_proxy("1").await;
        routes.delete_extension_proxies("1").await;

        assert_eq!(routes.proxy("1").await, None);
        assert!(routes.extension_proxies("1").await.is_empty());
        assert_eq!(routes.proxy("2").await.as_deref(), Some("http://10.0.0.2:8080"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let routes = RouteTable::new();
        routes.delete_proxy("7").await;
        routes.delete_extension_proxies("7").await;
        assert_eq!(routes.proxy("7").await, None);
    }
}
