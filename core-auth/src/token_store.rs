//! Token Storage
//!
//! Holds the current access/refresh token pair read by every outgoing request.
//!
//! Two backings are provided:
//!
//! - [`InMemoryTokenStore`]: process-lifetime only
//! - [`SecureTokenStore`]: write-through to a platform [`SecureStore`] so the
//!   pair survives a restart
//!
//! Both swap the whole pair behind a lock, so concurrent readers observe either
//! the old or the new record, never a mix.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{InMemoryTokenStore, TokenStore, Tokens};
//!
//! # async fn example() {
//! let store = InMemoryTokenStore::new();
//! store.replace(Tokens::new("access", "refresh")).await;
//! assert_eq!(store.access_token().await.as_deref(), Some("access"));
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::Tokens;
use async_trait::async_trait;
use bridge_traits::storage::SecureStore;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure store key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "auth.access_token";
/// Secure store key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "auth.refresh_token";

/// Mutable holder of the current access and refresh token.
///
/// Written by the session manager (and logout); read by the request builder.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current access token, if any.
    async fn access_token(&self) -> Option<String>;

    /// Current refresh token, if any.
    async fn refresh_token(&self) -> Option<String>;

    async fn set_access_token(&self, token: Option<String>);

    async fn set_refresh_token(&self, token: Option<String>);

    /// Snapshot of the whole pair.
    async fn tokens(&self) -> Tokens;

    /// Replace both tokens in one step.
    async fn replace(&self, tokens: Tokens);

    /// Forget both tokens.
    async fn clear(&self) {
        self.replace(Tokens::default()).await;
    }
}

/// Token store that lives for the process lifetime only.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<Tokens>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens.read().access_token.clone()
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().refresh_token.clone()
    }

    async fn set_access_token(&self, token: Option<String>) {
        self.tokens.write().access_token = token;
    }

    async fn set_refresh_token(&self, token: Option<String>) {
        self.tokens.write().refresh_token = token;
    }

    async fn tokens(&self) -> Tokens {
        self.tokens.read().clone()
    }

    async fn replace(&self, tokens: Tokens) {
        *self.tokens.write() = tokens;
    }
}

/// Token store backed by a platform secure store.
///
/// Reads come from an in-memory cache; every write updates the cache first and
/// then the secure store. A failed secure-store write is logged and otherwise
/// ignored: the in-process pair stays authoritative for the running session.
pub struct SecureTokenStore {
    secure_store: Arc<dyn SecureStore>,
    cache: RwLock<Tokens>,
}

impl SecureTokenStore {
    /// Create a store with an empty cache. Use [`SecureTokenStore::load`] to
    /// seed it from previously persisted tokens.
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing SecureTokenStore");
        Self {
            secure_store,
            cache: RwLock::new(Tokens::default()),
        }
    }

    /// Create a store seeded from whatever the secure store currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SecureStorageUnavailable`] if the secure store
    /// cannot be read.
    pub async fn load(secure_store: Arc<dyn SecureStore>) -> Result<Self> {
        let store = Self::new(secure_store);
        let access_token = store.read_secret(ACCESS_TOKEN_KEY).await?;
        let refresh_token = store.read_secret(REFRESH_TOKEN_KEY).await?;

        info!(
            has_access_token = access_token.is_some(),
            has_refresh_token = refresh_token.is_some(),
            "Loaded tokens from secure storage"
        );

        *store.cache.write() = Tokens {
            access_token,
            refresh_token,
        };
        Ok(store)
    }

    async fn read_secret(&self, key: &str) -> Result<Option<String>> {
        let bytes = self.secure_store.get_secret(key).await.map_err(|e| {
            warn!(key, error = %e, "Failed to read token from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        Ok(bytes.and_then(|b| match String::from_utf8(b) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, "Discarding non UTF-8 token from secure storage");
                None
            }
        }))
    }

    async fn write_secret(&self, key: &str, value: Option<&str>) {
        let outcome = match value {
            Some(value) => self.secure_store.set_secret(key, value.as_bytes()).await,
            None => self.secure_store.delete_secret(key).await,
        };

        if let Err(e) = outcome {
            warn!(key, error = %e, "Failed to persist token to secure storage");
        }
    }
}

#[async_trait]
impl TokenStore for SecureTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.cache.read().access_token.clone()
    }

    async fn refresh_token(&self) -> Option<String> {
        self.cache.read().refresh_token.clone()
    }

    async fn set_access_token(&self, token: Option<String>) {
        self.cache.write().access_token = token.clone();
        self.write_secret(ACCESS_TOKEN_KEY, token.as_deref()).await;
    }

    async fn set_refresh_token(&self, token: Option<String>) {
        self.cache.write().refresh_token = token.clone();
        self.write_secret(REFRESH_TOKEN_KEY, token.as_deref()).await;
    }

    async fn tokens(&self) -> Tokens {
        self.cache.read().clone()
    }

    async fn replace(&self, tokens: Tokens) {
        *self.cache.write() = tokens.clone();
        self.write_secret(ACCESS_TOKEN_KEY, tokens.access_token.as_deref())
            .await;
        self.write_secret(REFRESH_TOKEN_KEY, tokens.refresh_token.as_deref())
            .await;

        debug!(cleared = tokens.is_empty(), "Tokens replaced");
    }
}
