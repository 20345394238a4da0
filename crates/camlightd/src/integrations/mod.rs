//! Event sources wired into the engine, one module per integration.
//!
//! Each integration registers a factory in the engine's linkme registry and
//! is only built when its feature is enabled.

#[cfg(feature = "integration_camera_mqtt")]
mod camera;

#[cfg(feature = "integration_keylight")]
mod keylight;
