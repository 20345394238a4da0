use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::engine::LightState;

/// Wire representation of a fixture's light array.
///
/// Key lights expose a small REST surface: `GET /elgato/lights` returns this
/// document, `PUT /elgato/lights` with the same shape mutates it. Fields left
/// out of a PUT are untouched by the fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsPayload {
    #[serde(rename = "numberOfLights")]
    pub number_of_lights: u8,

    pub lights: Vec<LightElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightElement {
    /// 1 = on, 0 = off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<u8>,

    /// Brightness percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

impl LightsPayload {
    /// Build a single-light mutation payload.
    pub fn set(on: Option<bool>, brightness: Option<u8>) -> Self {
        Self {
            number_of_lights: 1,
            lights: vec![LightElement {
                on: on.map(u8::from),
                brightness,
            }],
        }
    }

    /// State of the first light, if the fixture reported one.
    pub fn state(&self) -> Option<LightState> {
        self.lights.first().map(|light| LightState {
            on: light.on.unwrap_or(0) == 1,
            brightness: light.brightness.unwrap_or(0),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyLightError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
}

/// Trait for key light REST operations
///
/// This trait allows for mocking the HTTP client for testing purposes
#[async_trait]
pub trait KeyLightClient: Send + Sync {
    /// Read the fixture's current light array
    async fn fetch_lights(&self, endpoint: &str) -> Result<LightsPayload, KeyLightError>;

    /// Apply a (possibly partial) light array to the fixture
    async fn put_lights(
        &self,
        endpoint: &str,
        payload: &LightsPayload,
    ) -> Result<(), KeyLightError>;
}

/// Real client implementation over reqwest
pub struct HttpKeyLightClient {
    http: reqwest::Client,
}

impl HttpKeyLightClient {
    pub fn new() -> anyhow::Result<Self> {
        // Fixtures live on the local network; long timeouts only delay
        // offline detection.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http })
    }

    fn url(endpoint: &str) -> String {
        format!("http://{}/elgato/lights", endpoint)
    }
}

#[async_trait]
impl KeyLightClient for HttpKeyLightClient {
    async fn fetch_lights(&self, endpoint: &str) -> Result<LightsPayload, KeyLightError> {
        let response = self
            .http
            .get(Self::url(endpoint))
            .send()
            .await
            .map_err(|source| KeyLightError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(KeyLightError::Status {
                endpoint: endpoint.to_string(),
                status: response.status(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| KeyLightError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn put_lights(
        &self,
        endpoint: &str,
        payload: &LightsPayload,
    ) -> Result<(), KeyLightError> {
        let response = self
            .http
            .put(Self::url(endpoint))
            .json(payload)
            .send()
            .await
            .map_err(|source| KeyLightError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(KeyLightError::Status {
                endpoint: endpoint.to_string(),
                status: response.status(),
            });
        }

        Ok(())
    }
}

/// Mock client for testing
///
/// Applies PUT payloads to its stored state so multi-step tests observe the
/// effect of earlier commands.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockKeyLightClient {
    pub lights: std::sync::Mutex<std::collections::HashMap<String, LightsPayload>>,
    pub unreachable: std::sync::Mutex<std::collections::HashSet<String>>,
    pub puts: std::sync::Mutex<Vec<(String, LightsPayload)>>,
}

#[cfg(test)]
impl MockKeyLightClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_light(self, endpoint: &str, on: bool, brightness: u8) -> Self {
        self.lights.lock().unwrap().insert(
            endpoint.to_string(),
            LightsPayload {
                number_of_lights: 1,
                lights: vec![LightElement {
                    on: Some(u8::from(on)),
                    brightness: Some(brightness),
                }],
            },
        );
        self
    }

    pub fn set_unreachable(&self, endpoint: &str, unreachable: bool) {
        let mut set = self.unreachable.lock().unwrap();
        if unreachable {
            set.insert(endpoint.to_string());
        } else {
            set.remove(endpoint);
        }
    }

    fn check_reachable(&self, endpoint: &str) -> Result<(), KeyLightError> {
        if self.unreachable.lock().unwrap().contains(endpoint) {
            Err(KeyLightError::Status {
                endpoint: endpoint.to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[async_trait]
impl KeyLightClient for MockKeyLightClient {
    async fn fetch_lights(&self, endpoint: &str) -> Result<LightsPayload, KeyLightError> {
        self.check_reachable(endpoint)?;
        self.lights
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| KeyLightError::Status {
                endpoint: endpoint.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }

    async fn put_lights(
        &self,
        endpoint: &str,
        payload: &LightsPayload,
    ) -> Result<(), KeyLightError> {
        self.check_reachable(endpoint)?;
        self.puts
            .lock()
            .unwrap()
            .push((endpoint.to_string(), payload.clone()));

        let mut lights = self.lights.lock().unwrap();
        let stored = lights
            .get_mut(endpoint)
            .ok_or_else(|| KeyLightError::Status {
                endpoint: endpoint.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })?;
        let (stored_light, new_light) = (&mut stored.lights[0], &payload.lights[0]);
        if let Some(on) = new_light.on {
            stored_light.on = Some(on);
        }
        if let Some(brightness) = new_light.brightness {
            stored_light.brightness = Some(brightness);
        }

        Ok(())
    }
}
