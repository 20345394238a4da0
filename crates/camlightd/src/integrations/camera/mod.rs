mod client;

use std::error::Error;

use async_trait::async_trait;
use linkme::distributed_slice;
use tracing::info;
use tracing::warn;

use client::MqttClient;

use crate::config::CameraMqttConfig;
use crate::engine;
use crate::engine::EngineMessage;
use crate::engine::EngineSender;
use crate::engine::Integration;

#[distributed_slice(engine::INTEGRATION_REGISTRY)]
fn init_camera_mqtt(ctx: &engine::IntegrationContext) -> engine::IntegrationFactoryResult {
    let camera_config = if let Some(c) = &ctx.config.integrations.camera_mqtt {
        c
    } else {
        return Ok(None);
    };

    let client = client::RumqttcClient::new(camera_config);
    Ok(Some(Box::new(CameraActivitySource::new(
        client,
        camera_config,
    ))))
}

/// Interpret a bare payload as an activity value.
///
/// Accepts the spellings common across MQTT publishers: booleans, ON/OFF,
/// and 0/1.
fn parse_bare(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "ON" | "on" | "1" => Some(true),
        "false" | "False" | "OFF" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Extract the activity value from a message payload.
///
/// With a `value_key` configured the payload is parsed as JSON and the value
/// is read from that key; otherwise the whole payload is treated as a bare
/// value. Unparseable payloads yield `None` and are skipped by the caller.
fn parse_activity(payload: &[u8], value_key: Option<&str>) -> Option<bool> {
    let text = std::str::from_utf8(payload).ok()?.trim();

    match value_key {
        Some(key) => {
            let doc: serde_json::Value = serde_json::from_str(text).ok()?;
            match doc.get(key)? {
                serde_json::Value::Bool(b) => Some(*b),
                serde_json::Value::String(s) => parse_bare(s),
                _ => None,
            }
        }
        None => parse_bare(text),
    }
}

/// Camera-activity source over MQTT.
///
/// Subscribes to one configured topic and reports activity transitions to
/// the engine. Consecutive identical values are deduplicated here, so the
/// engine only ever sees genuine transitions.
pub struct CameraActivitySource<C: MqttClient> {
    client: C,
    config: CameraMqttConfig,

    /// Last reported value; `None` until the first message arrives.
    last: Option<bool>,
}

impl<C: MqttClient> CameraActivitySource<C> {
    pub fn new(client: C, config: &CameraMqttConfig) -> Self {
        Self {
            client,
            config: config.clone(),
            last: None,
        }
    }
}

#[async_trait]
impl<C: MqttClient + 'static> Integration for CameraActivitySource<C> {
    fn name(&self) -> &str {
        "camera_mqtt"
    }

    async fn run(&mut self, tx: EngineSender) -> Result<(), Box<dyn Error + Send>> {
        self.client.connect().await?;
        self.client.subscribe(&self.config.topic).await?;
        info!("Watching camera activity on '{}'", self.config.topic);

        while let Some(msg) = self.client.poll_message().await {
            if msg.topic != self.config.topic {
                continue;
            }

            let active = match parse_activity(&msg.payload, self.config.value_key.as_deref()) {
                Some(v) => v,
                None => {
                    warn!(
                        "Ignoring unparseable payload on '{}': {:?}",
                        msg.topic,
                        String::from_utf8_lossy(&msg.payload)
                    );
                    continue;
                }
            };

            if self.last == Some(active) {
                continue;
            }
            self.last = Some(active);

            if tx
                .send(EngineMessage::CameraActivityChanged { active })
                .await
                .is_err()
            {
                // Engine inbox closed: the daemon is shutting down.
                return Ok(());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::client::MockMqttClient;
    use super::*;

    const TOPIC: &str = "webcam/in-use";

    fn config(value_key: Option<&str>) -> CameraMqttConfig {
        CameraMqttConfig {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "camlightd".to_string(),
            topic: TOPIC.to_string(),
            value_key: value_key.map(str::to_string),
            username: None,
            password: None,
        }
    }

    async fn transitions(client: MockMqttClient, value_key: Option<&str>) -> Vec<bool> {
        let mut source = CameraActivitySource::new(client, &config(value_key));
        let (tx, mut rx) = mpsc::channel(16);
        source.run(tx).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            match msg {
                EngineMessage::CameraActivityChanged { active } => seen.push(active),
                other => panic!("unexpected message: {:?}", other),
            }
        }
        seen
    }

    #[test]
    fn test_parse_bare_payloads() {
        assert_eq!(parse_activity(b"ON", None), Some(true));
        assert_eq!(parse_activity(b"true", None), Some(true));
        assert_eq!(parse_activity(b"1", None), Some(true));
        assert_eq!(parse_activity(b"OFF", None), Some(false));
        assert_eq!(parse_activity(b"false", None), Some(false));
        assert_eq!(parse_activity(b" ON \n", None), Some(true));
        assert_eq!(parse_activity(b"maybe", None), None);
    }

    #[test]
    fn test_parse_json_payloads() {
        assert_eq!(
            parse_activity(br#"{"active": true}"#, Some("active")),
            Some(true)
        );
        assert_eq!(
            parse_activity(br#"{"active": "OFF", "fps": 30}"#, Some("active")),
            Some(false)
        );
        assert_eq!(parse_activity(br#"{"other": true}"#, Some("active")), None);
        assert_eq!(parse_activity(br#"{"active": 3}"#, Some("active")), None);
        assert_eq!(parse_activity(b"not json", Some("active")), None);
    }

    #[tokio::test]
    async fn test_consecutive_identical_values_are_deduplicated() {
        let mut client = MockMqttClient::new();
        client.queue(TOPIC, b"ON");
        client.queue(TOPIC, b"ON");
        client.queue(TOPIC, b"OFF");
        client.queue(TOPIC, b"OFF");
        client.queue(TOPIC, b"ON");

        assert_eq!(
            transitions(client, None).await,
            vec![true, false, true]
        );
    }

    #[tokio::test]
    async fn test_other_topics_and_garbage_are_ignored() {
        let mut client = MockMqttClient::new();
        client.queue("webcam/other", b"ON");
        client.queue(TOPIC, b"garbage");
        client.queue(TOPIC, b"ON");

        assert_eq!(transitions(client, None).await, vec![true]);
    }

    #[tokio::test]
    async fn test_json_value_key_transitions() {
        let mut client = MockMqttClient::new();
        client.queue(TOPIC, br#"{"active": true, "camera": "c920"}"#);
        client.queue(TOPIC, br#"{"active": false}"#);

        assert_eq!(
            transitions(client, Some("active")).await,
            vec![true, false]
        );
    }

    #[tokio::test]
    async fn test_run_subscribes_to_the_configured_topic() {
        let mut source = CameraActivitySource::new(MockMqttClient::new(), &config(None));
        let (tx, _rx) = mpsc::channel(16);
        source.run(tx).await.unwrap();

        assert!(source.client.is_connected);
        assert_eq!(source.client.subscriptions, vec![TOPIC.to_string()]);
    }
}
