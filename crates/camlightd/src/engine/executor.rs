//! Fire-and-forget execution of per-device actions.
//!
//! Each action runs in its own tokio task: a failure on one fixture is logged
//! and never blocks, retries, or rolls back a sibling. Bookkeeping intent
//! (boost captures, claimed lights) is reported back to the engine loop as a
//! message; device tasks never touch the reconciler's maps directly.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use super::device::DeviceHandle;
use super::message::EngineMessage;

/// What to do to one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    /// Power on. Bookkeeping for this path happens at dispatch time.
    TurnOn,

    /// Refresh live state first; power on and claim the fixture only if it
    /// was off. Fixtures already on are left alone and never claimed.
    TurnOnIfOff,

    /// Power off.
    TurnOff,

    /// Set an absolute brightness computed at dispatch time.
    SetBrightness(u8),

    /// Refresh live state, apply `min(original + percent, 100)`, and report
    /// the pre-boost brightness back to the engine.
    ApplyBoost { percent: u8 },
}

/// One fixture, one operation.
#[derive(Debug, Clone)]
pub struct Action {
    pub handle: DeviceHandle,
    pub kind: ActionKind,
}

/// Brightness with a boost applied, clamped to 100.
pub(crate) fn boosted_brightness(original: u8, percent: u8) -> u8 {
    original.saturating_add(percent).min(100)
}

/// Spawns one independent task per action.
pub struct Executor {
    report_tx: mpsc::Sender<EngineMessage>,
}

impl Executor {
    pub fn new(report_tx: mpsc::Sender<EngineMessage>) -> Self {
        Self { report_tx }
    }

    /// Dispatch a batch of actions, one task each.
    ///
    /// The returned handles are dropped by the engine (the tasks are
    /// best-effort side effects); tests await them for determinism.
    pub fn dispatch(&self, batch: Vec<Action>) -> Vec<JoinHandle<()>> {
        batch
            .into_iter()
            .map(|action| {
                debug!("Dispatching {} for {}", action.kind, action.handle.id());
                let report_tx = self.report_tx.clone();
                tokio::spawn(run_action(action, report_tx))
            })
            .collect()
    }
}

async fn run_action(action: Action, report_tx: mpsc::Sender<EngineMessage>) {
    let id = action.handle.id().to_string();

    match action.kind {
        ActionKind::TurnOn => {
            if let Err(e) = action.handle.turn_on().await {
                warn!("Failed to turn on {}: {}", id, e);
            }
        }
        ActionKind::TurnOff => {
            if let Err(e) = action.handle.turn_off().await {
                warn!("Failed to turn off {}: {}", id, e);
            }
        }
        ActionKind::SetBrightness(percent) => {
            if let Err(e) = action.handle.set_brightness(percent).await {
                warn!("Failed to set brightness on {}: {}", id, e);
            }
        }
        ActionKind::TurnOnIfOff => {
            match action.handle.refresh_state().await {
                // Already on: the user did this, not us. Leave it alone.
                Ok(state) if state.on => {}
                Ok(_) => {
                    if let Err(e) = action.handle.turn_on().await {
                        warn!("Failed to turn on {}: {}", id, e);
                    }
                    // Reported after the request is issued: bookkeeping
                    // reflects intent, not confirmed hardware state.
                    report(&report_tx, EngineMessage::LightClaimed { id }).await;
                }
                Err(e) => warn!("Failed to read state of {}: {}", id, e),
            }
        }
        ActionKind::ApplyBoost { percent } => match action.handle.refresh_state().await {
            Ok(state) => {
                let original = state.brightness;
                let target = boosted_brightness(original, percent);
                if let Err(e) = action.handle.set_brightness(target).await {
                    warn!("Failed to boost brightness on {}: {}", id, e);
                }
                report(&report_tx, EngineMessage::BoostCaptured { id, original }).await;
            }
            Err(e) => warn!("Failed to read state of {}: {}", id, e),
        },
    }
}

async fn report(report_tx: &mpsc::Sender<EngineMessage>, msg: EngineMessage) {
    if let Err(e) = report_tx.send(msg).await {
        warn!("Failed to report device task outcome: {}", e);
    }
}
