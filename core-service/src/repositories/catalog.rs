//! Gym and subscription listings

use async_trait::async_trait;
use core_network::ApiClient;
use tracing::instrument;

use crate::endpoints::{GymsEndpoint, SubscriptionsEndpoint};
use crate::error::Result;
use crate::models::{Gym, Subscription};

#[async_trait]
pub trait GymsRepository: Send + Sync {
    /// All gyms available to the member
    async fn fetch_gyms(&self) -> Result<Vec<Gym>>;
}

#[async_trait]
pub trait SubscriptionsRepository: Send + Sync {
    async fn fetch_subscriptions(&self) -> Result<Vec<Subscription>>;
}

pub struct ApiGymsRepository {
    api: ApiClient,
}

impl ApiGymsRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GymsRepository for ApiGymsRepository {
    #[instrument(skip(self))]
    async fn fetch_gyms(&self) -> Result<Vec<Gym>> {
        Ok(self.api.call(&GymsEndpoint::List).await?)
    }
}

pub struct ApiSubscriptionsRepository {
    api: ApiClient,
}

impl ApiSubscriptionsRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SubscriptionsRepository for ApiSubscriptionsRepository {
    #[instrument(skip(self))]
    async fn fetch_subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self.api.call(&SubscriptionsEndpoint::List).await?)
    }
}
