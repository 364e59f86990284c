//! # Session Manager
//!
//! Owns the single authenticated session for the process.
//!
//! ## Overview
//!
//! The session is observable state: callers either read it on demand
//! ([`SessionManager::current_session`]) or hold a `watch` receiver from
//! [`SessionManager::subscribe`] and react to changes. Every transition is also
//! published as an [`AuthEvent`] on the event bus.
//!
//! The serialized session is persisted in the settings store under
//! [`SESSION_STORAGE_KEY`]. Storage problems never abort startup: an unreadable
//! or undecodable record simply means "no session", and failed writes are
//! logged and skipped.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{InMemoryTokenStore, SessionManager};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::{storage::SettingsStore, time::SystemClock};
//! # async fn example(settings: Arc<dyn SettingsStore>) {
//! let manager = SessionManager::load(
//!     Arc::new(InMemoryTokenStore::new()),
//!     settings,
//!     Arc::new(SystemClock),
//!     EventBus::new(100),
//! )
//! .await;
//!
//! if manager.is_authenticated() {
//!     println!("welcome back");
//! }
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{AuthSession, SESSION_STORAGE_KEY};
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

/// Owner of the current [`AuthSession`].
pub struct SessionManager {
    token_store: Arc<dyn TokenStore>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    state: watch::Sender<Option<AuthSession>>,
    /// Serializes writers so state, tokens and the persisted record move together.
    write_lock: Mutex<()>,
}

impl SessionManager {
    /// Build a manager and restore any persisted session.
    ///
    /// A persisted session is adopted only if its `expires_at` lies in the
    /// future according to `clock`; its tokens are then pushed into
    /// `token_store`. An expired or undecodable record is removed.
    #[instrument(skip_all)]
    pub async fn load(
        token_store: Arc<dyn TokenStore>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        let (state, _) = watch::channel(None);
        let manager = Self {
            token_store,
            settings,
            clock,
            event_bus,
            state,
            write_lock: Mutex::new(()),
        };
        manager.restore().await;
        manager
    }

    async fn restore(&self) {
        let record = match self.settings.get_string(SESSION_STORAGE_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No persisted session");
                self.token_store.clear().await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting signed out");
                self.token_store.clear().await;
                return;
            }
        };

        let session = match AuthSession::from_record(&record) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable session record");
                self.token_store.clear().await;
                self.remove_record().await;
                return;
            }
        };

        let now = self.clock.now();
        if session.is_expired_at(now) {
            info!(
                user_id = %session.user.id,
                expires_at = %session.expires_at,
                "Persisted session expired"
            );
            self.token_store.clear().await;
            self.remove_record().await;
            self.emit(AuthEvent::SessionExpired {
                user_id: session.user.id,
            });
            return;
        }

        self.token_store.replace(session.tokens()).await;
        let user_id = session.user.id.clone();
        self.state.send_replace(Some(session));

        info!(user_id = %user_id, "Restored persisted session");
        self.emit(AuthEvent::SessionRestored { user_id });
    }

    /// Receiver that observes every change to the current session.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.state.subscribe()
    }

    /// Snapshot of the current session.
    pub fn current_session(&self) -> Option<AuthSession> {
        self.state.borrow().clone()
    }

    /// The current session, or [`AuthError::NotAuthenticated`].
    pub fn require_session(&self) -> Result<AuthSession> {
        self.current_session().ok_or(AuthError::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Replace the current session, push its tokens into the token store
    /// and persist it.
    #[instrument(skip_all, fields(user_id = %session.user.id))]
    pub async fn save_session(&self, session: AuthSession) {
        let _guard = self.write_lock.lock().await;

        self.token_store.replace(session.tokens()).await;

        match session.to_record() {
            Ok(record) => {
                if let Err(e) = self.settings.set_string(SESSION_STORAGE_KEY, &record).await {
                    warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode session for persistence"),
        }

        let user_id = session.user.id.clone();
        self.state.send_replace(Some(session));

        info!("Session saved");
        self.emit(AuthEvent::SignedIn { user_id });
    }

    /// Drop the current session, clear the token store and remove the
    /// persisted record.
    #[instrument(skip_all)]
    pub async fn clear_session(&self) {
        let _guard = self.write_lock.lock().await;

        self.state.send_replace(None);
        self.token_store.clear().await;
        self.remove_record().await;

        info!("Session cleared");
        self.emit(AuthEvent::SignedOut);
    }

    async fn remove_record(&self) {
        if let Err(e) = self.settings.delete(SESSION_STORAGE_KEY).await {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
