use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::client::KeyLightClient;
use super::device::KeyLight;
use crate::config::KeyLightConfig;
use crate::engine::DeviceHandle;
use crate::engine::EngineMessage;
use crate::engine::EngineSender;
use crate::engine::Integration;
use crate::engine::LightState;

/// Device manager for statically configured key light fixtures.
///
/// Registers a `DeviceHandle` per fixture, then polls each fixture's REST
/// endpoint, reporting liveness and state changes to the engine. A failed
/// poll marks the fixture offline; the last known light state is retained
/// until contact resumes.
pub struct KeyLightManager<C: KeyLightClient> {
    client: Arc<C>,
    config: KeyLightConfig,

    /// Last reported (online, state) per fixture id.
    cached: HashMap<String, (bool, LightState)>,
}

impl<C: KeyLightClient + 'static> KeyLightManager<C> {
    pub fn new(client: C, config: &KeyLightConfig) -> Self {
        Self {
            client: Arc::new(client),
            config: config.clone(),
            cached: HashMap::new(),
        }
    }

    /// Announce every configured fixture to the engine.
    ///
    /// Returns false when the engine inbox is closed.
    async fn announce(&self, tx: &EngineSender) -> bool {
        for fixture in &self.config.fixtures {
            let ops = Arc::new(KeyLight::new(fixture.endpoint.clone(), self.client.clone()));
            let handle = DeviceHandle::new(fixture.id.clone(), ops);

            info!(
                "Registering key light '{}' at {}",
                fixture.id, fixture.endpoint
            );
            let msg = EngineMessage::DeviceDiscovered {
                id: fixture.id.clone(),
                handle,
                managed: fixture.managed,
            };
            if tx.send(msg).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Poll every fixture once, reporting entries whose view changed.
    ///
    /// Returns false when the engine inbox is closed.
    async fn poll_once(&mut self, tx: &EngineSender) -> bool {
        for fixture in &self.config.fixtures {
            let last = self.cached.get(&fixture.id).copied();
            let last_state = last.map(|(_, state)| state).unwrap_or_default();

            let next = match self.client.fetch_lights(&fixture.endpoint).await {
                Ok(payload) => match payload.state() {
                    Some(state) => (true, state),
                    None => {
                        warn!("Fixture '{}' reported no lights", fixture.id);
                        (false, last_state)
                    }
                },
                Err(e) => {
                    debug!("Failed to poll '{}': {}", fixture.id, e);
                    (false, last_state)
                }
            };

            if last != Some(next) {
                self.cached.insert(fixture.id.clone(), next);
                let msg = EngineMessage::DeviceStateChanged {
                    id: fixture.id.clone(),
                    online: next.0,
                    state: next.1,
                };
                if tx.send(msg).await.is_err() {
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl<C: KeyLightClient + 'static> Integration for KeyLightManager<C> {
    fn name(&self) -> &str {
        "keylight"
    }

    async fn run(&mut self, tx: EngineSender) -> Result<(), Box<dyn Error + Send>> {
        if !self.announce(&tx).await {
            return Ok(());
        }

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        loop {
            interval.tick().await;
            if !self.poll_once(&tx).await {
                // Engine inbox closed: the daemon is shutting down.
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::FixtureConfig;
    use crate::integrations::keylight::client::MockKeyLightClient;

    const ENDPOINT: &str = "192.168.1.40:9123";

    fn config() -> KeyLightConfig {
        KeyLightConfig {
            poll_interval_secs: 1,
            fixtures: vec![FixtureConfig {
                id: "desk".to_string(),
                endpoint: ENDPOINT.to_string(),
                managed: true,
            }],
        }
    }

    #[tokio::test]
    async fn test_announce_registers_configured_fixtures() {
        let client = MockKeyLightClient::new().with_light(ENDPOINT, false, 20);
        let manager = KeyLightManager::new(client, &config());
        let (tx, mut rx) = mpsc::channel(16);

        assert!(manager.announce(&tx).await);

        match rx.try_recv().unwrap() {
            EngineMessage::DeviceDiscovered { id, managed, .. } => {
                assert_eq!(id, "desk");
                assert!(managed);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_poll_reports_each_change_once() {
        let client = MockKeyLightClient::new().with_light(ENDPOINT, true, 40);
        let mut manager = KeyLightManager::new(client, &config());
        let (tx, mut rx) = mpsc::channel(16);

        assert!(manager.poll_once(&tx).await);
        match rx.try_recv().unwrap() {
            EngineMessage::DeviceStateChanged { id, online, state } => {
                assert_eq!(id, "desk");
                assert!(online);
                assert!(state.on);
                assert_eq!(state.brightness, 40);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        // Unchanged fixture: no duplicate report.
        assert!(manager.poll_once(&tx).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_poll_marks_fixture_offline_keeping_last_state() {
        let client = MockKeyLightClient::new().with_light(ENDPOINT, true, 40);
        let mut manager = KeyLightManager::new(client, &config());
        let (tx, mut rx) = mpsc::channel(16);

        assert!(manager.poll_once(&tx).await);
        rx.try_recv().unwrap();

        manager.client.set_unreachable(ENDPOINT, true);
        assert!(manager.poll_once(&tx).await);
        match rx.try_recv().unwrap() {
            EngineMessage::DeviceStateChanged { online, state, .. } => {
                assert!(!online);
                assert!(state.on);
                assert_eq!(state.brightness, 40);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
