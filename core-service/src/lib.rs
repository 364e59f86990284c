//! Core service façade and bootstrap.
//!
//! [`CoreService::bootstrap`] turns a validated [`CoreConfig`] into the full
//! object graph: token store, session manager, API client, transfer engine
//! and the feature repositories. Desktop apps typically enable the
//! `desktop-shims` feature so that missing bridges fall back to the
//! `bridge-desktop` adapters while the configuration is built.
//!
//! ```ignore
//! use core_runtime::config::{ApiEnvironment, CoreConfig};
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .environment(ApiEnvironment::Staging)
//!     .build()?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! let gyms = core.gyms().fetch_gyms().await?;
//! ```

pub mod endpoints;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{CoreError, Result};
pub use models::*;
pub use repositories::{
    AuthRepository, CheckInRepository, DocumentRepository, DownloadRepository, GymsRepository,
    SubscriptionsRepository,
};

use std::fmt;
use std::sync::Arc;

use core_auth::{InMemoryTokenStore, SecureTokenStore, SessionManager, TokenStore};
use core_network::{ApiClient, RequestBuilder, TransferEngine};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, instrument, warn};

use repositories::{
    ApiAuthRepository, ApiCheckInRepository, ApiGymsRepository, ApiSubscriptionsRepository,
};

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones share every component.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    event_bus: EventBus,
    token_store: Arc<dyn TokenStore>,
    session: Arc<SessionManager>,
    api: ApiClient,
    transfers: TransferEngine,
    auth: Arc<dyn AuthRepository>,
    gyms: Arc<dyn GymsRepository>,
    subscriptions: Arc<dyn SubscriptionsRepository>,
    check_in: Arc<dyn CheckInRepository>,
    documents: DocumentRepository,
    downloads: DownloadRepository,
}

impl CoreService {
    /// Build every component from `config` and restore any persisted session.
    ///
    /// Session restoration never fails startup: an unreadable or expired
    /// record simply leaves the service signed out.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Runtime`] if `config` does not validate
    /// - [`CoreError::InitializationFailed`] if secure token persistence is
    ///   requested without a secure store
    #[instrument(skip_all, fields(base_url = %config.base_url))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let token_store = Self::open_token_store(&config).await?;

        let session = Arc::new(
            SessionManager::load(
                token_store.clone(),
                config.settings_store.clone(),
                config.clock.clone(),
                event_bus.clone(),
            )
            .await,
        );

        let builder = RequestBuilder::new(config.app_metadata.clone());
        let api = ApiClient::new(
            config.http_client.clone(),
            builder.clone(),
            token_store.clone(),
            config.base_url.clone(),
        )
        .with_redactor(config.log_redaction);
        let transfers = TransferEngine::new(config.http_client.clone(), builder, token_store.clone())
            .with_event_bus(event_bus.clone())
            .with_redactor(config.log_redaction);

        let auth: Arc<dyn AuthRepository> = Arc::new(ApiAuthRepository::new(
            api.clone(),
            session.clone(),
            config.clock.clone(),
        ));
        let gyms: Arc<dyn GymsRepository> = Arc::new(ApiGymsRepository::new(api.clone()));
        let subscriptions: Arc<dyn SubscriptionsRepository> =
            Arc::new(ApiSubscriptionsRepository::new(api.clone()));
        let check_in: Arc<dyn CheckInRepository> =
            Arc::new(ApiCheckInRepository::new(api.clone()));
        let documents =
            DocumentRepository::new(api.clone(), transfers.clone(), config.retry_policy);
        let downloads = DownloadRepository::new(transfers.clone(), config.retry_policy);

        info!(
            authenticated = session.is_authenticated(),
            secure_tokens = config.persist_tokens_securely,
            "Core service ready"
        );

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            token_store,
            session,
            api,
            transfers,
            auth,
            gyms,
            subscriptions,
            check_in,
            documents,
            downloads,
        })
    }

    async fn open_token_store(config: &CoreConfig) -> Result<Arc<dyn TokenStore>> {
        if !config.persist_tokens_securely {
            return Ok(Arc::new(InMemoryTokenStore::new()));
        }

        let secure_store = config.secure_store.clone().ok_or_else(|| {
            CoreError::InitializationFailed(
                "secure token persistence requested without a secure store".to_string(),
            )
        })?;

        match SecureTokenStore::load(secure_store.clone()).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Could not read stored tokens, starting without them");
                Ok(Arc::new(SecureTokenStore::new(secure_store)))
            }
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// New subscription to core events. Past events are not replayed.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        self.token_store.clone()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn transfers(&self) -> &TransferEngine {
        &self.transfers
    }

    pub fn auth(&self) -> &dyn AuthRepository {
        self.auth.as_ref()
    }

    pub fn gyms(&self) -> &dyn GymsRepository {
        self.gyms.as_ref()
    }

    pub fn subscriptions(&self) -> &dyn SubscriptionsRepository {
        self.subscriptions.as_ref()
    }

    pub fn check_in(&self) -> &dyn CheckInRepository {
        self.check_in.as_ref()
    }

    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    pub fn downloads(&self) -> &DownloadRepository {
        &self.downloads
    }
}

impl fmt::Debug for CoreService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
