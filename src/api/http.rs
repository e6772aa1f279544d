// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use tracing::info;

use crate::api::handlers::{ApiHandlers, ApiResponse, ConsoleRequest, RefreshRequest};
use crate::manager::AddonStatus;

pub struct HttpServer {
    handlers: ApiHandlers,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(handlers: ApiHandlers, addr: SocketAddr) -> Self {
        Self { handlers, addr }
    }

    pub fn router(handlers: ApiHandlers) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/addons", get(status_handler))
            .route("/api/addons/refresh", post(refresh_handler))
            .route("/api/addons/clear", post(clear_handler))
            .route(
                "/api/addons/:id",
                post(add_addon_handler).delete(remove_addon_handler),
            )
            .route("/api/console", post(console_handler))
            .with_state(handlers)
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let app = Self::router(self.handlers);

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    ApiHandlers::health().await
}

async fn status_handler(
    State(handlers): State<ApiHandlers>,
) -> Result<Json<ApiResponse<AddonStatus>>, StatusCode> {
    handlers.status().await
}

async fn add_addon_handler(
    State(handlers): State<ApiHandlers>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    handlers.add_addon(Path(id)).await
}

async fn remove_addon_handler(
    State(handlers): State<ApiHandlers>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    handlers.remove_addon(Path(id)).await
}

async fn refresh_handler(
    State(handlers): State<ApiHandlers>,
    request: Option<Json<RefreshRequest>>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    handlers.refresh(Json(request)).await
}

async fn clear_handler(
    State(handlers): State<ApiHandlers>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    handlers.clear().await
}

async fn console_handler(
    State(handlers): State<ApiHandlers>,
    Json(request): Json<ConsoleRequest>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    handlers.console(Json(request)).await
}
