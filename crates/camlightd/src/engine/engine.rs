use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::device::DeviceEntry;
use super::device::DeviceRegistry;
use super::executor::Executor;
use super::integration::EngineReceiver;
use super::integration::EngineSender;
use super::integration::Integration;
use super::integration::IntegrationContext;
use super::message::EngineMessage;
use super::reconciler::Reconciler;
use super::settings::AutomationSettings;
use super::settings::SettingsStore;
use super::state::LightSnapshot;
use super::state::State;

/// Capacity for the inbox feeding the decision loop.
/// Provides backpressure when sources send faster than the engine can process.
const ENGINE_CHANNEL_SIZE: usize = 1024;

/// camlightd engine
///
/// Serializes every camera-activity transition, settings change, device
/// report, and bookkeeping message onto one decision loop, hands the
/// resulting device actions to the executor, and maintains a snapshot of the
/// world for the HTTP API.
pub struct Engine {
    /// Centralized state snapshot (readers load the Arc, the loop stores a
    /// new one after every pass).
    state: Arc<ArcSwap<State>>,

    /// Fixtures known to the engine, mirrored from integration reports.
    devices: DeviceRegistry,

    reconciler: Reconciler,
    executor: Executor,

    /// Live automation settings, shared with the HTTP API.
    settings: Arc<SettingsStore>,

    message_rx: EngineReceiver,

    /// Sender handed to integrations and device tasks.
    message_tx: EngineSender,

    /// Handles for integration tasks
    integration_handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Create a new Engine instance with the configured initial settings.
    pub fn new(initial: AutomationSettings) -> Self {
        let (message_tx, message_rx) = mpsc::channel(ENGINE_CHANNEL_SIZE);
        let settings = Arc::new(SettingsStore::new(initial, message_tx.clone()));
        Self {
            state: Arc::new(ArcSwap::new(Arc::default())),
            devices: HashMap::new(),
            reconciler: Reconciler::new(initial),
            executor: Executor::new(message_tx.clone()),
            settings,
            message_rx,
            message_tx,
            integration_handles: Vec::new(),
        }
    }

    /// Shared handle to the published state snapshot, for the HTTP API.
    pub fn state_handle(&self) -> Arc<ArcSwap<State>> {
        self.state.clone()
    }

    /// Shared handle to the settings store, for the HTTP API.
    pub fn settings_store(&self) -> Arc<SettingsStore> {
        self.settings.clone()
    }

    /// Register integrations from configuration.
    ///
    /// Walks the linkme registry; factories return `None` when their config
    /// section is absent. A factory error skips that integration only.
    pub fn register_integrations_from_config(&mut self, cfg: &crate::config::Config) {
        let ctx = IntegrationContext { config: cfg };
        for constr in super::integration::REGISTRY {
            let integration = match constr(&ctx) {
                Ok(Some(i)) => i,
                Ok(None) => continue,
                Err(e) => {
                    error!("failed to set up integration: {}", e);
                    continue;
                }
            };
            let name = integration.name().to_string();
            self.register_integration(name, integration);
        }
    }

    /// Register an integration with the engine, spawning it in a background
    /// task with a sender for its reports.
    pub fn register_integration(&mut self, name: String, mut integration: Box<dyn Integration>) {
        let tx = self.message_tx.clone();

        let handle = tokio::spawn(async move {
            info!("Integration '{}' starting", name);
            match integration.run(tx).await {
                Ok(()) => info!("Integration '{}' finished", name),
                Err(e) => warn!("Integration '{}' exited with error: {}", name, e),
            }
        });

        self.integration_handles.push(handle);
    }

    /// Run the engine's decision loop.
    ///
    /// Decisions and bookkeeping happen synchronously here; device I/O is
    /// dispatched to independent tasks and never awaited by the loop.
    pub async fn run(&mut self) {
        info!("Engine starting");

        while let Some(msg) = self.message_rx.recv().await {
            self.handle_message(msg);
            self.publish_state();
        }

        info!("Engine shutting down");
    }

    fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::DeviceDiscovered {
                id,
                handle,
                managed,
            } => {
                info!("Device discovered: {} (managed: {})", id, managed);
                self.devices.insert(
                    id,
                    DeviceEntry {
                        handle,
                        online: false,
                        managed,
                        state: Default::default(),
                    },
                );
            }
            EngineMessage::DeviceRemoved { id } => {
                info!("Device removed: {}", id);
                self.devices.remove(&id);
            }
            EngineMessage::DeviceStateChanged { id, online, state } => {
                debug!(
                    "Device state changed: {} -> online={}, on={}, brightness={}",
                    id, online, state.on, state.brightness
                );
                if let Some(entry) = self.devices.get_mut(&id) {
                    entry.online = online;
                    entry.state = state;
                }
            }
            EngineMessage::CameraActivityChanged { active } => {
                info!("Camera activity changed: active={}", active);
                let batch = self.reconciler.camera_changed(active, &self.devices);
                // Fire and forget; the tasks report bookkeeping intent back
                // through this loop.
                let _ = self.executor.dispatch(batch);
            }
            EngineMessage::SettingsChanged => {
                let new = self.settings.current();
                debug!("Settings changed: {:?}", new);
                let batch = self.reconciler.settings_changed(new, &self.devices);
                let _ = self.executor.dispatch(batch);
            }
            EngineMessage::BoostCaptured { id, original } => {
                self.reconciler.boost_captured(id, original);
            }
            EngineMessage::LightClaimed { id } => {
                self.reconciler.light_claimed(id);
            }
        }
    }

    fn publish_state(&self) {
        let lights = self
            .devices
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    LightSnapshot {
                        online: entry.online,
                        managed: entry.managed,
                        on: entry.state.on,
                        brightness: entry.state.brightness,
                    },
                )
            })
            .collect();

        self.state.store(Arc::new(State {
            camera_active: self.reconciler.camera_active(),
            lights,
        }));
    }
}
