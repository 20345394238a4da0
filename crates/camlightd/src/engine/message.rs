//! Messages serialized onto the engine's single decision loop.
//!
//! Everything that can change a decision arrives here: device lifecycle and
//! state reports from integrations, camera-activity transitions, settings
//! change notifications, and bookkeeping reports from in-flight device tasks.
//! Processing them on one task is what keeps the reconciler's maps race-free.

use super::device::DeviceHandle;
use super::state::LightState;

#[derive(Debug)]
pub enum EngineMessage {
    /// A fixture was registered by its integration.
    DeviceDiscovered {
        id: String,
        handle: DeviceHandle,
        managed: bool,
    },

    /// A fixture was deconfigured or its integration shut down.
    DeviceRemoved { id: String },

    /// A fixture's cached liveness or light state changed.
    DeviceStateChanged {
        id: String,
        online: bool,
        state: LightState,
    },

    /// The camera-activity source observed a transition. Values are
    /// deduplicated upstream: no two consecutive messages carry the same
    /// value.
    CameraActivityChanged { active: bool },

    /// Some automation setting changed. Carries no payload; the engine
    /// re-reads the settings store.
    SettingsChanged,

    /// A device task captured a fixture's pre-boost brightness after issuing
    /// the boosted set-brightness request.
    BoostCaptured { id: String, original: u8 },

    /// A device task powered a fixture on because of camera activity; the
    /// engine is now responsible for powering it back off.
    LightClaimed { id: String },
}
