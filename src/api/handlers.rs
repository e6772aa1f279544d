// SPDX-License-Identifier: GPL-3.0-only
use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::addon::AddonId;
use crate::host::ConsoleCommand;
use crate::manager::{AddonLifecycleManager, AddonStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsoleRequest {
    pub command: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub reload: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Work the HTTP side asks of the main loop, which owns the manager
#[derive(Debug)]
pub enum AdminCommand {
    Status,
    Console(ConsoleCommand),
}

#[derive(Debug)]
pub enum AdminReply {
    Status(Box<AddonStatus>),
    Output(String),
}

#[derive(Debug)]
pub struct AdminRequest {
    pub command: AdminCommand,
    pub reply: oneshot::Sender<AdminReply>,
}

/// Execute an admin request on the manager's thread and answer it
pub fn serve_request(manager: &mut AddonLifecycleManager, request: AdminRequest) {
    let reply = match request.command {
        AdminCommand::Status => AdminReply::Status(Box::new(manager.status())),
        AdminCommand::Console(command) => AdminReply::Output(command.execute(manager)),
    };

    if request.reply.send(reply).is_err() {
        debug!("Admin client went away before the reply was sent");
    }
}

#[derive(Clone)]
pub struct ApiHandlers {
    requests: mpsc::Sender<AdminRequest>,
}

impl ApiHandlers {
    pub fn new(requests: mpsc::Sender<AdminRequest>) -> Self {
        Self { requests }
    }

    async fn dispatch(&self, command: AdminCommand) -> Result<AdminReply, StatusCode> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(AdminRequest { command, reply })
            .await
            .map_err(|_| {
                error!("Addon manager is not accepting requests");
                StatusCode::SERVICE_UNAVAILABLE
            })?;

        response.await.map_err(|_| {
            error!("Addon manager dropped the request");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }

    async fn run(&self, command: ConsoleCommand) -> Result<Json<ApiResponse<String>>, StatusCode> {
        match self.dispatch(AdminCommand::Console(command)).await? {
            AdminReply::Output(output) => Ok(Json(ApiResponse::success(output))),
            AdminReply::Status(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn parse_id(raw: &str) -> Result<AddonId, StatusCode> {
        raw.parse().map_err(|e| {
            warn!(error = %e, "Rejected addon id");
            StatusCode::BAD_REQUEST
        })
    }
}

impl ApiHandlers {
    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    pub async fn status(&self) -> Result<Json<ApiResponse<AddonStatus>>, StatusCode> {
        match self.dispatch(AdminCommand::Status).await? {
            AdminReply::Status(status) => Ok(Json(ApiResponse::success(*status))),
            AdminReply::Output(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub async fn add_addon(
        &self,
        Path(id): Path<String>,
    ) -> Result<Json<ApiResponse<String>>, StatusCode> {
        let id = Self::parse_id(&id)?;
        info!(addon = %id, "Add addon request received");
        self.run(ConsoleCommand::AddAddon(id)).await
    }

    pub async fn remove_addon(
        &self,
        Path(id): Path<String>,
    ) -> Result<Json<ApiResponse<String>>, StatusCode> {
        let id = Self::parse_id(&id)?;
        info!(addon = %id, "Remove addon request received");
        self.run(ConsoleCommand::RemoveAddon(id)).await
    }

    pub async fn refresh(
        &self,
        Json(request): Json<RefreshRequest>,
    ) -> Result<Json<ApiResponse<String>>, StatusCode> {
        self.run(ConsoleCommand::RefreshAddons {
            reload: request.reload,
        })
        .await
    }

    pub async fn clear(&self) -> Result<Json<ApiResponse<String>>, StatusCode> {
        self.run(ConsoleCommand::ClearAddons).await
    }

    pub async fn console(
        &self,
        Json(request): Json<ConsoleRequest>,
    ) -> Result<Json<ApiResponse<String>>, StatusCode> {
        let command = request.command.parse::<ConsoleCommand>().map_err(|e| {
            warn!(command = %request.command, error = %e, "Rejected console command");
            StatusCode::BAD_REQUEST
        })?;
        self.run(command).await
    }
}
