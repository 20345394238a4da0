//! The decision core of the automation engine.
//!
//! Every camera-activity transition and settings-change notification passes
//! through here, serialized by the engine loop. The reconciler diffs against
//! its own copy of the last observed settings, consults the boost table and
//! the controlled-lights set, and emits a minimal batch of device actions.
//! It never awaits: device I/O happens in the executor's tasks, which report
//! bookkeeping intent back through the engine loop.

use std::collections::HashMap;
use std::collections::HashSet;

use super::device::DeviceRegistry;
use super::executor::Action;
use super::executor::ActionKind;
use super::executor::boosted_brightness;
use super::settings::AutomationSettings;

pub struct Reconciler {
    /// Most recently observed settings; the baseline for the next diff.
    /// Replaced only after a notification has been fully acted on, so every
    /// transition is observed exactly once.
    settings: AutomationSettings,

    /// Last observed camera-activity value; gates settings-change decisions.
    camera_active: bool,

    /// Device id -> brightness recorded immediately before a boost was
    /// applied. An entry exists iff that device carries a boost this engine
    /// is responsible for undoing.
    boost_originals: HashMap<String, u8>,

    /// Devices this engine powered on due to camera activity. Lights the
    /// user turned on manually are never in here, so they are never powered
    /// off by us.
    controlled: HashSet<String>,
}

impl Reconciler {
    pub fn new(initial: AutomationSettings) -> Self {
        Self {
            settings: initial,
            camera_active: false,
            boost_originals: HashMap::new(),
            controlled: HashSet::new(),
        }
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    /// Handle a settings-change notification.
    ///
    /// The notification is coalesced ("something changed"), so each field is
    /// diffed against the previous snapshot; fields whose value did not
    /// change cause no device traffic no matter how often the notification
    /// fires.
    pub fn settings_changed(
        &mut self,
        new: AutomationSettings,
        devices: &DeviceRegistry,
    ) -> Vec<Action> {
        let mut batch = Vec::new();

        if new.lights_on_with_camera != self.settings.lights_on_with_camera {
            if new.lights_on_with_camera {
                if self.camera_active {
                    for (id, entry) in devices {
                        if entry.managed && entry.online {
                            self.controlled.insert(id.clone());
                            batch.push(Action {
                                handle: entry.handle.clone(),
                                kind: ActionKind::TurnOn,
                            });
                        }
                    }
                }
            } else {
                // Disabled: release everything we are responsible for,
                // regardless of camera state.
                for id in self.controlled.drain() {
                    if let Some(entry) = devices.get(&id) {
                        batch.push(Action {
                            handle: entry.handle.clone(),
                            kind: ActionKind::TurnOff,
                        });
                    }
                }
            }
        }

        // Boost transitions only matter while the camera is active; the
        // activity path re-applies or restores on its own transitions.
        if self.camera_active {
            let was = self.settings.boost_brightness_on_camera;
            let now = new.boost_brightness_on_camera;

            if was && !now {
                batch.extend(self.restore_all(devices));
            } else if !was && now {
                batch.extend(Self::apply_boost_all(new.boost_percent, devices));
            } else if now && new.boost_percent != self.settings.boost_percent {
                // Recompute from the recorded originals; live state is not
                // re-read, so percentage changes never compound.
                for (id, original) in &self.boost_originals {
                    if let Some(entry) = devices.get(id) {
                        batch.push(Action {
                            handle: entry.handle.clone(),
                            kind: ActionKind::SetBrightness(boosted_brightness(
                                *original,
                                new.boost_percent,
                            )),
                        });
                    }
                }
            }
        }

        self.settings = new;
        batch
    }

    /// Handle a camera-activity transition.
    pub fn camera_changed(&mut self, active: bool, devices: &DeviceRegistry) -> Vec<Action> {
        self.camera_active = active;
        let mut batch = Vec::new();

        if active {
            if self.settings.lights_on_with_camera {
                for entry in devices.values() {
                    if entry.managed && entry.online {
                        // The device task checks live power state and only
                        // claims fixtures it actually turned on.
                        batch.push(Action {
                            handle: entry.handle.clone(),
                            kind: ActionKind::TurnOnIfOff,
                        });
                    }
                }
            }
            if self.settings.boost_brightness_on_camera {
                batch.extend(Self::apply_boost_all(self.settings.boost_percent, devices));
            }
        } else {
            // Restore brightness first so fixtures about to be powered off
            // still end up at their pre-boost value.
            batch.extend(self.restore_all(devices));

            if self.settings.lights_on_with_camera {
                for id in self.controlled.drain() {
                    if let Some(entry) = devices.get(&id) {
                        batch.push(Action {
                            handle: entry.handle.clone(),
                            kind: ActionKind::TurnOff,
                        });
                    }
                }
            }
        }

        batch
    }

    /// Record a pre-boost brightness reported by a device task.
    ///
    /// Ignored when the boost conditions no longer hold (the task was
    /// dispatched under a decision that a later event superseded). The first
    /// capture for a device wins; re-applications never overwrite it.
    pub fn boost_captured(&mut self, id: String, original: u8) {
        if self.camera_active && self.settings.boost_brightness_on_camera {
            self.boost_originals.entry(id).or_insert(original);
        }
    }

    /// Record that a device task powered a fixture on for us.
    pub fn light_claimed(&mut self, id: String) {
        if self.camera_active && self.settings.lights_on_with_camera {
            self.controlled.insert(id);
        }
    }

    /// Restore every recorded original and clear the table. Devices that
    /// have disappeared from the registry are skipped silently; their
    /// absence already means no action is needed.
    fn restore_all(&mut self, devices: &DeviceRegistry) -> Vec<Action> {
        let mut batch = Vec::new();
        for (id, original) in self.boost_originals.drain() {
            if let Some(entry) = devices.get(&id) {
                batch.push(Action {
                    handle: entry.handle.clone(),
                    kind: ActionKind::SetBrightness(original),
                });
            }
        }
        batch
    }

    fn apply_boost_all(percent: u8, devices: &DeviceRegistry) -> Vec<Action> {
        let mut batch = Vec::new();
        for entry in devices.values() {
            if entry.managed && entry.online {
                batch.push(Action {
                    handle: entry.handle.clone(),
                    kind: ActionKind::ApplyBoost { percent },
                });
            }
        }
        batch
    }
}
