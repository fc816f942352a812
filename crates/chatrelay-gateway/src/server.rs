use std::net::SocketAddr;
use std::sync::Arc;

use chatrelay_common::{Error, Result};
use chatrelay_config::AppConfig;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Owns the listener lifecycle; `run` blocks until ctrl-c.
pub struct GatewayServer {
    config: AppConfig,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.gateway.host, self.config.gateway.port);
        let state = Arc::new(AppState::new(self.config));

        let providers: Vec<String> = state
            .engine
            .configured_providers()
            .iter()
            .map(|p| p.to_string())
            .collect();
        info!(addr, providers = ?providers, "starting gateway");

        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("server error: {e}")))?;

        info!("gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
