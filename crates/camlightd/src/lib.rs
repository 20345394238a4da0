pub mod api;
pub mod config;
mod engine;
mod integrations;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::AutomationSettings;
pub use engine::Engine;
pub use engine::LightState;
pub use engine::SettingsStore;
pub use engine::State;
