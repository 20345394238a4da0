use std::error::Error;

use async_trait::async_trait;
use linkme::distributed_slice;
use tokio::sync::mpsc;

use super::message::EngineMessage;
use crate::config::Config;

/// Channel types for messages into the engine's decision loop.
/// Bounded to provide backpressure when sources outpace the engine.
pub type EngineSender = mpsc::Sender<EngineMessage>;
pub type EngineReceiver = mpsc::Receiver<EngineMessage>;

/// Result type for integration factory functions
pub type IntegrationFactoryResult = anyhow::Result<Option<Box<dyn Integration>>>;

pub struct IntegrationContext<'a> {
    pub config: &'a Config,
}

#[distributed_slice]
pub static REGISTRY: [fn(&IntegrationContext) -> IntegrationFactoryResult];

/// An event source wired into the engine.
///
/// Integrations own their transport (HTTP polling, MQTT subscription) and
/// report device lifecycle, device state, and camera activity on the sender
/// they are given. They never receive commands back: device mutation goes
/// through the handles they register.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Get the name/identifier of this integration
    fn name(&self) -> &str;

    /// Run the integration until the engine shuts down.
    ///
    /// Returning `Ok` means the source has nothing more to report; an error
    /// is logged by the engine and the integration is not restarted.
    async fn run(&mut self, tx: EngineSender) -> Result<(), Box<dyn Error + Send>>;
}
