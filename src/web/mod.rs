//! Minimal HTTP surface: liveness/readiness only. The CRUD configuration
//! API lives in the external collaborator (§1); this process exposes
//! nothing else.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::InputStore;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn InputStore>,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, store: Arc<dyn InputStore>) -> Result<Self> {
        let state = AppState { store };

        let app = Router::new()
            .route("/health", get(health))
            .route("/live", get(live))
            .route("/ready", get(ready))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        Ok(Self { app, addr })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn live() -> StatusCode {
    StatusCode::OK
}

/// Ready when the configuration store can be reached at all — a single
/// cheap enumeration call, not a full cycle.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match state.store.enumerate_enabled().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn live_is_always_ok() {
        assert_eq!(live().await, StatusCode::OK);
    }
}
