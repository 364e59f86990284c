use async_trait::async_trait;
use core_network::ApiClient;
use tracing::{debug, instrument};

use crate::endpoints::CheckInEndpoint;
use crate::error::Result;
use crate::models::{CheckInRequest, CheckInResponse};

#[async_trait]
pub trait CheckInRepository: Send + Sync {
    /// Check the member in with the code scanned at the venue
    async fn check_in(&self, qr_code: &str) -> Result<CheckInResponse>;
}

pub struct ApiCheckInRepository {
    api: ApiClient,
}

impl ApiCheckInRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CheckInRepository for ApiCheckInRepository {
    #[instrument(skip_all)]
    async fn check_in(&self, qr_code: &str) -> Result<CheckInResponse> {
        let endpoint = CheckInEndpoint::CheckIn(CheckInRequest {
            qr_code: qr_code.to_string(),
        });
        let venue: CheckInResponse = self.api.call(&endpoint).await?;
        debug!(venue = %venue.name, "Checked in");
        Ok(venue)
    }
}
