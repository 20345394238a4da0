mod device;
#[allow(clippy::module_inception)]
mod engine;
mod executor;
mod integration;
mod message;
mod reconciler;
mod settings;
pub mod state;

pub use device::DeviceHandle;
pub use device::LightOps;
pub use engine::Engine;
pub use integration::EngineSender;
pub use integration::Integration;
pub use integration::IntegrationContext;
pub use integration::IntegrationFactoryResult;
pub use integration::REGISTRY as INTEGRATION_REGISTRY;
pub use message::EngineMessage;
pub use settings::AutomationSettings;
pub use settings::SettingsError;
pub use settings::SettingsStore;
pub use state::LightState;
pub use state::State;
