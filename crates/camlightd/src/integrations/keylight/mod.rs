mod client;
mod device;
mod manager;

use anyhow::Context;
use linkme::distributed_slice;

pub use manager::KeyLightManager;

use crate::engine;

#[distributed_slice(engine::INTEGRATION_REGISTRY)]
fn init_keylight(ctx: &engine::IntegrationContext) -> engine::IntegrationFactoryResult {
    let keylight_config = if let Some(c) = &ctx.config.integrations.keylight {
        c
    } else {
        return Ok(None);
    };

    let client =
        client::HttpKeyLightClient::new().context("Failed to create key light HTTP client")?;
    Ok(Some(Box::new(KeyLightManager::new(client, keylight_config))))
}
