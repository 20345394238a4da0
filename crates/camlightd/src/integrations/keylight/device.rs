use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use super::client::KeyLightClient;
use super::client::LightsPayload;
use crate::engine::LightOps;
use crate::engine::LightState;

/// One fixture's operations, bound to its REST endpoint.
///
/// Instances sit behind the `DeviceHandle`s this integration registers with
/// the engine; the engine's device tasks drive them concurrently.
pub struct KeyLight {
    endpoint: String,
    client: Arc<dyn KeyLightClient>,
}

impl KeyLight {
    pub fn new(endpoint: String, client: Arc<dyn KeyLightClient>) -> Self {
        Self { endpoint, client }
    }

    async fn put(&self, payload: LightsPayload) -> Result<(), Box<dyn Error + Send>> {
        self.client
            .put_lights(&self.endpoint, &payload)
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send>)
    }
}

#[async_trait]
impl LightOps for KeyLight {
    async fn refresh_state(&self) -> Result<LightState, Box<dyn Error + Send>> {
        let payload = self
            .client
            .fetch_lights(&self.endpoint)
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send>)?;

        payload.state().ok_or_else(|| -> Box<dyn Error + Send> {
            Box::new(std::io::Error::other(format!(
                "{} reported no lights",
                self.endpoint
            )))
        })
    }

    async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>> {
        self.put(LightsPayload::set(Some(true), None)).await
    }

    async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>> {
        self.put(LightsPayload::set(Some(false), None)).await
    }

    async fn set_brightness(&self, percent: u8) -> Result<(), Box<dyn Error + Send>> {
        self.put(LightsPayload::set(None, Some(percent.min(100))))
            .await
    }
}
