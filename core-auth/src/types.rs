use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthError, Result};

/// Key under which the serialized session is persisted in the settings store.
pub const SESSION_STORAGE_KEY: &str = "user_session";

/// Lifetime, in seconds, given to a session created from a successful OTP
/// verification.
pub const SESSION_LIFETIME_SECS: i64 = 60 * 60;

/// Authenticated member as returned by the backend.
///
/// Field names are camelCase on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// Tokens stay out of debug output
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_phone", &self.phone.is_some())
            .finish_non_exhaustive()
    }
}

/// Access/refresh token pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Tokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// The authenticated session.
///
/// Owned by [`SessionManager`](crate::SessionManager) and always replaced
/// wholesale; nothing mutates an individual field of a live session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Session for `user` that expires [`SESSION_LIFETIME_SECS`] after `now`.
    pub fn starting_at(
        user: User,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: now + Duration::seconds(SESSION_LIFETIME_SECS),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn tokens(&self) -> Tokens {
        Tokens::new(self.access_token.clone(), self.refresh_token.clone())
    }

    /// Serialize into the persisted record format.
    pub fn to_record(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AuthError::Serialization {
            context: "session record".to_string(),
            source: e,
        })
    }

    /// Parse a persisted record.
    pub fn from_record(record: &str) -> Result<Self> {
        serde_json::from_str(record).map_err(|e| AuthError::Serialization {
            context: "session record".to_string(),
            source: e,
        })
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
