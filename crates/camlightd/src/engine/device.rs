use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use super::state::LightState;

/// Asynchronous operations on a single light fixture.
///
/// Implemented by integrations; the engine and its device tasks only ever see
/// this trait. Every operation may fail with a transport or device error.
#[async_trait]
pub trait LightOps: Send + Sync {
    /// Read the fixture's live state.
    async fn refresh_state(&self) -> Result<LightState, Box<dyn Error + Send>>;

    /// Power the fixture on.
    async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>>;

    /// Power the fixture off.
    async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>>;

    /// Set brightness to an absolute percentage (0-100).
    async fn set_brightness(&self, percent: u8) -> Result<(), Box<dyn Error + Send>>;
}

/// Cheaply cloneable handle to one fixture.
///
/// Device tasks receive a clone at dispatch time; they never reach back into
/// the engine's registry.
#[derive(Clone)]
pub struct DeviceHandle {
    id: String,
    ops: Arc<dyn LightOps>,
}

impl DeviceHandle {
    pub fn new(id: String, ops: Arc<dyn LightOps>) -> Self {
        Self { id, ops }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn refresh_state(&self) -> Result<LightState, Box<dyn Error + Send>> {
        self.ops.refresh_state().await
    }

    pub async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>> {
        self.ops.turn_on().await
    }

    pub async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>> {
        self.ops.turn_off().await
    }

    pub async fn set_brightness(&self, percent: u8) -> Result<(), Box<dyn Error + Send>> {
        self.ops.set_brightness(percent).await
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The engine's cached view of one registered fixture.
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub handle: DeviceHandle,
    pub online: bool,
    pub managed: bool,
    pub state: LightState,
}

/// Registry of fixtures known to the engine, keyed by device id.
pub type DeviceRegistry = HashMap<String, DeviceEntry>;

/// Mock fixture for engine tests.
///
/// Commands mutate the mock's own state so multi-step sequences observe the
/// effects of earlier operations, the way a real fixture would.
#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockCommand {
        On,
        Off,
        Brightness(u8),
    }

    #[derive(Debug, Default)]
    pub struct MockLight {
        pub state: Mutex<LightState>,
        pub fail: AtomicBool,
        pub commands: Mutex<Vec<MockCommand>>,
    }

    impl MockLight {
        pub fn new(on: bool, brightness: u8) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(LightState { on, brightness }),
                fail: AtomicBool::new(false),
                commands: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            let light = Self::new(false, 0);
            light.fail.store(true, Ordering::SeqCst);
            light
        }

        pub fn handle(self: &Arc<Self>, id: &str) -> DeviceHandle {
            DeviceHandle::new(id.to_string(), self.clone())
        }

        pub fn commands(&self) -> Vec<MockCommand> {
            self.commands.lock().unwrap().clone()
        }

        fn check_fail(&self) -> Result<(), Box<dyn Error + Send>> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Box::new(std::io::Error::other("mock fixture unreachable")))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl LightOps for MockLight {
        async fn refresh_state(&self) -> Result<LightState, Box<dyn Error + Send>> {
            self.check_fail()?;
            Ok(*self.state.lock().unwrap())
        }

        async fn turn_on(&self) -> Result<(), Box<dyn Error + Send>> {
            self.check_fail()?;
            self.commands.lock().unwrap().push(MockCommand::On);
            self.state.lock().unwrap().on = true;
            Ok(())
        }

        async fn turn_off(&self) -> Result<(), Box<dyn Error + Send>> {
            self.check_fail()?;
            self.commands.lock().unwrap().push(MockCommand::Off);
            self.state.lock().unwrap().on = false;
            Ok(())
        }

        async fn set_brightness(&self, percent: u8) -> Result<(), Box<dyn Error + Send>> {
            self.check_fail()?;
            self.commands
                .lock()
                .unwrap()
                .push(MockCommand::Brightness(percent));
            self.state.lock().unwrap().brightness = percent;
            Ok(())
        }
    }
}
