use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Power and brightness of a light fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightState {
    /// Whether the light is on or off.
    pub on: bool,

    /// Brightness percentage (0-100).
    pub brightness: u8,
}

/// Per-light entry in the published state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightSnapshot {
    /// Whether the last contact with the fixture succeeded.
    pub online: bool,

    /// Whether the fixture participates in automation.
    pub managed: bool,

    pub on: bool,
    pub brightness: u8,
}

/// Centralized snapshot of the engine's view of the world.
///
/// Readers (the HTTP API) load the current `Arc`; the engine stores a new one
/// after every reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct State {
    /// Last observed camera-activity value.
    pub camera_active: bool,

    pub lights: HashMap<String, LightSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_state_default() {
        let state = LightState::default();
        assert!(!state.on);
        assert_eq!(state.brightness, 0);
    }

    #[test]
    fn test_state_serialization_shape() {
        let mut lights = HashMap::new();
        lights.insert(
            "desk".to_string(),
            LightSnapshot {
                online: true,
                managed: true,
                on: false,
                brightness: 35,
            },
        );
        let state = State {
            camera_active: false,
            lights,
        };

        insta::assert_snapshot!(
            serde_json::to_string(&state).unwrap(),
            @r#"{"camera_active":false,"lights":{"desk":{"online":true,"managed":true,"on":false,"brightness":35}}}"#
        );
    }
}
