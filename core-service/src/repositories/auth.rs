//! OTP sign-in, logout and token refresh

use async_trait::async_trait;
use bridge_traits::time::Clock;
use core_auth::{AuthSession, SessionManager};
use core_network::ApiClient;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::endpoints::{AuthEndpoint, RefreshEndpoint};
use crate::error::Result;
use crate::models::{
    AuthResponse, OtpRequest, OtpResponse, OtpVerification, RefreshRequest, RefreshResponse,
};

/// Authentication operations
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Ask the backend to send a one-time code to `phone`
    async fn request_otp(&self, phone: &str) -> Result<OtpResponse>;

    /// Exchange a one-time code for a session
    ///
    /// On success the session is saved with a one hour lifetime measured from
    /// the injected clock.
    async fn verify_otp(&self, otp: &str) -> Result<AuthResponse>;

    /// Sign out on the backend, then clear the local session
    ///
    /// The local session is cleared even when the backend call fails; that
    /// failure is still returned.
    async fn logout(&self) -> Result<()>;

    /// Trade the stored refresh token for a new access token
    ///
    /// # Errors
    /// - `AuthError::NotAuthenticated` without a current session
    /// - any transport or server error from the refresh call; the current
    ///   session is left untouched
    async fn refresh_session(&self) -> Result<AuthSession>;
}

/// [`AuthRepository`] over the JSON API.
pub struct ApiAuthRepository {
    api: ApiClient,
    session: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl ApiAuthRepository {
    pub fn new(api: ApiClient, session: Arc<SessionManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            session,
            clock,
        }
    }
}

#[async_trait]
impl AuthRepository for ApiAuthRepository {
    #[instrument(skip_all)]
    async fn request_otp(&self, phone: &str) -> Result<OtpResponse> {
        let endpoint = AuthEndpoint::RequestOtp(OtpRequest {
            phone: phone.to_string(),
        });
        Ok(self.api.call(&endpoint).await?)
    }

    #[instrument(skip_all)]
    async fn verify_otp(&self, otp: &str) -> Result<AuthResponse> {
        let endpoint = AuthEndpoint::VerifyOtp(OtpVerification {
            otp: otp.to_string(),
        });
        let response: AuthResponse = self.api.call(&endpoint).await?;

        let session = AuthSession::starting_at(
            response.user.clone(),
            response.access_token.clone(),
            response.refresh_token.clone(),
            self.clock.now(),
        );
        self.session.save_session(session).await;

        info!(user_id = %response.user.id, "OTP verified");
        Ok(response)
    }

    #[instrument(skip_all)]
    async fn logout(&self) -> Result<()> {
        let outcome = self.api.call_unit(&AuthEndpoint::Logout).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.session.clear_session().await;
        outcome?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self) -> Result<AuthSession> {
        let current = self.session.require_session()?;

        let endpoint = RefreshEndpoint::Refresh(RefreshRequest {
            refresh_token: current.refresh_token.clone(),
        });
        let response: RefreshResponse = self.api.call(&endpoint).await?;

        let refreshed = AuthSession::starting_at(
            current.user,
            response.access_token,
            current.refresh_token,
            self.clock.now(),
        );
        self.session.save_session(refreshed.clone()).await;

        info!(expires_at = %refreshed.expires_at, "Session refreshed");
        Ok(refreshed)
    }
}
