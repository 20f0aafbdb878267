//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::document::{DocumentCache, Resolver};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    resolver: Resolver,
}

impl AppState {
    /// One document cache per state, rooted at the uploads directory
    pub fn new(config: Config) -> Self {
        let cache = DocumentCache::new(config.storage.uploads.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                resolver: Resolver::new(cache),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// Get the document cache
    pub fn cache(&self) -> &DocumentCache {
        self.inner.resolver.cache()
    }
}
