use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::AutomationSettings;
use crate::engine::SettingsStore;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,

    /// Engine-published snapshot of lights and camera activity.
    world: Arc<ArcSwap<crate::engine::State>>,

    /// Live automation settings; writes notify the engine.
    settings: Arc<SettingsStore>,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/state
#[tracing::instrument(skip(state))]
async fn world_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/state request");
    (StatusCode::OK, Json((**state.world.load()).clone()))
}

/// Handler for GET /v1/settings
#[tracing::instrument(skip(state))]
async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/settings request");
    (StatusCode::OK, Json(state.settings.current()))
}

/// Handler for PUT /v1/settings
///
/// Replaces the automation settings wholesale. A successful update queues a
/// change notification for the engine; the engine's own diffing decides
/// whether any device traffic results.
#[tracing::instrument(skip(state))]
async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(new): Json<AutomationSettings>,
) -> Response {
    tracing::debug!("Handling /v1/settings update");

    match state.settings.update(new).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/state", get(world_state))
        .route("/v1/settings", get(get_settings).put(put_settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to the specified address and serves the API endpoints until the
/// provided shutdown signal is triggered.
pub async fn serve(
    listen: String,
    port: u16,
    world: Arc<ArcSwap<crate::engine::State>>,
    settings: Arc<SettingsStore>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    let state = Arc::new(AppState {
        version,
        world,
        settings,
    });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::engine::EngineMessage;

    fn app_state() -> (Arc<AppState>, mpsc::Receiver<EngineMessage>) {
        let (tx, rx) = mpsc::channel(4);
        let state = Arc::new(AppState {
            version: "0.0.0",
            world: Arc::new(ArcSwap::new(Arc::default())),
            settings: Arc::new(SettingsStore::new(AutomationSettings::default(), tx)),
        });
        (state, rx)
    }

    #[tokio::test]
    async fn test_put_settings_applies_and_notifies() {
        let (state, mut rx) = app_state();
        let new = AutomationSettings {
            lights_on_with_camera: false,
            boost_brightness_on_camera: true,
            boost_percent: 35,
        };

        let response = put_settings(State(state.clone()), Json(new)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert_eq!(state.settings.current(), new);
        assert!(matches!(
            rx.try_recv(),
            Ok(EngineMessage::SettingsChanged)
        ));
    }

    #[tokio::test]
    async fn test_put_settings_rejects_out_of_range_percent() {
        let (state, mut rx) = app_state();
        let bad = AutomationSettings {
            boost_percent: 130,
            ..AutomationSettings::default()
        };

        let response = put_settings(State(state.clone()), Json(bad)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // The stored value is untouched and the engine was not notified.
        assert_eq!(state.settings.current(), AutomationSettings::default());
        assert!(rx.try_recv().is_err());
    }
}
