use arc_swap::ArcSwap;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use super::message::EngineMessage;

/// User-configurable automation settings.
///
/// One instance is the live value in [`SettingsStore`]; the reconciler keeps
/// its own copy as the baseline for change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSettings {
    /// Turn managed fixtures on while the camera is active.
    pub lights_on_with_camera: bool,

    /// Raise brightness by `boost_percent` while the camera is active.
    pub boost_brightness_on_camera: bool,

    /// Amount added to a fixture's brightness while boosted (0-100).
    pub boost_percent: u8,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            lights_on_with_camera: true,
            boost_brightness_on_camera: false,
            boost_percent: 20,
        }
    }
}

impl AutomationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.boost_percent > 100 {
            return Err(SettingsError::BoostPercentOutOfRange(self.boost_percent));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("boost_percent must be between 0 and 100, got {0}")]
    BoostPercentOutOfRange(u8),
}

/// Holds the current automation settings and notifies the engine on change.
///
/// The notification carries no payload; the engine re-reads [`current`] when
/// it processes the message, so the reconciler always diffs against the
/// latest values.
///
/// [`current`]: SettingsStore::current
pub struct SettingsStore {
    current: ArcSwap<AutomationSettings>,
    engine_tx: mpsc::Sender<EngineMessage>,
}

impl SettingsStore {
    pub fn new(initial: AutomationSettings, engine_tx: mpsc::Sender<EngineMessage>) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            engine_tx,
        }
    }

    pub fn current(&self) -> AutomationSettings {
        **self.current.load()
    }

    /// Replace the settings and notify the engine.
    ///
    /// The notification fires even when the new values equal the old ones;
    /// the reconciler's diff is what suppresses redundant device actions.
    pub async fn update(&self, settings: AutomationSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.current.store(Arc::new(settings));

        if let Err(e) = self.engine_tx.send(EngineMessage::SettingsChanged).await {
            warn!("Failed to notify engine of settings change: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AutomationSettings::default();
        assert!(settings.lights_on_with_camera);
        assert!(!settings.boost_brightness_on_camera);
        assert_eq!(settings.boost_percent, 20);
    }

    #[test]
    fn test_validate_rejects_out_of_range_percent() {
        let settings = AutomationSettings {
            boost_percent: 101,
            ..AutomationSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_serialization_shape() {
        let settings = AutomationSettings::default();
        insta::assert_snapshot!(
            serde_json::to_string(&settings).unwrap(),
            @r#"{"lights_on_with_camera":true,"boost_brightness_on_camera":false,"boost_percent":20}"#
        );
    }

    #[tokio::test]
    async fn test_update_swaps_value_and_notifies() {
        let (tx, mut rx) = mpsc::channel(4);
        let store = SettingsStore::new(AutomationSettings::default(), tx);

        let new = AutomationSettings {
            lights_on_with_camera: false,
            boost_brightness_on_camera: true,
            boost_percent: 35,
        };
        store.update(new).await.unwrap();

        assert_eq!(store.current(), new);
        assert!(matches!(
            rx.recv().await,
            Some(EngineMessage::SettingsChanged)
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_percent_without_swapping() {
        let (tx, mut rx) = mpsc::channel(4);
        let store = SettingsStore::new(AutomationSettings::default(), tx);

        let bad = AutomationSettings {
            boost_percent: 200,
            ..AutomationSettings::default()
        };
        assert!(store.update(bad).await.is_err());
        assert_eq!(store.current(), AutomationSettings::default());
        assert!(rx.try_recv().is_err());
    }
}
