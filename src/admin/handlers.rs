use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::http::OperationOutcome;
use crate::registry::{ModuleView, RegistryError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstallRequest {
    pub base_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathRequest {
    pub base_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub available_modules: usize,
    pub active_modules: Vec<String>,
    pub route_generation: u64,
    pub route_bindings: usize,
    pub last_changed: f64,
}

/// A registry failure rendered as an admin response.
pub struct AdminError(RegistryError);

impl From<RegistryError> for AdminError {
    fn from(e: RegistryError) -> Self {
        Self(e)
    }
}

impl AdminError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RegistryError::NotRegistered(_) => StatusCode::NOT_FOUND,
            RegistryError::NotActive(_) | RegistryError::RecordMissing(_) => StatusCode::CONFLICT,
            RegistryError::InvalidBasePath { .. } => StatusCode::BAD_REQUEST,
            RegistryError::SetupFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
            RegistryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        OperationOutcome::failed(self.0.to_string()).with_status(status)
    }
}

type AdminResult<T> = Result<T, AdminError>;

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.registry.snapshot();
    let routes = state.routes.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        available_modules: snapshot.available().len(),
        active_modules: snapshot.active().keys().cloned().collect(),
        route_generation: routes.generation(),
        route_bindings: routes.bindings().len(),
        last_changed: state.registry.notifier().last_changed(),
    })
}

pub async fn list_modules(State(state): State<AdminState>) -> AdminResult<Json<Vec<ModuleView>>> {
    Ok(Json(state.registry.list_all().await?))
}

pub async fn install_module(
    State(state): State<AdminState>,
    Path(module_id): Path<String>,
    body: Bytes,
) -> Response {
    let request = if body.is_empty() {
        InstallRequest::default()
    } else {
        match serde_json::from_slice::<InstallRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return OperationOutcome::failed(format!("invalid request body: {e}"))
                    .with_status(StatusCode::BAD_REQUEST)
            }
        }
    };

    match state
        .registry
        .install(&module_id, request.base_path.as_deref())
        .await
    {
        Ok(()) => OperationOutcome::ok(format!("module '{module_id}' installed")).into_response(),
        Err(e) => AdminError::from(e).into_response(),
    }
}

pub async fn uninstall_module(
    State(state): State<AdminState>,
    Path(module_id): Path<String>,
) -> AdminResult<OperationOutcome> {
    state.registry.uninstall(&module_id).await?;
    Ok(OperationOutcome::ok(format!("module '{module_id}' uninstalled")))
}

pub async fn upgrade_module(
    State(state): State<AdminState>,
    Path(module_id): Path<String>,
) -> AdminResult<OperationOutcome> {
    state.registry.upgrade(&module_id).await?;
    Ok(OperationOutcome::ok(format!("module '{module_id}' upgraded")))
}

pub async fn update_module_path(
    State(state): State<AdminState>,
    Path(module_id): Path<String>,
    Json(request): Json<PathRequest>,
) -> AdminResult<OperationOutcome> {
    state
        .registry
        .update_path(&module_id, &request.base_path)
        .await?;
    Ok(OperationOutcome::ok(format!(
        "module '{module_id}' base path set to '{}'",
        request.base_path
    )))
}

pub async fn force_reload(State(state): State<AdminState>) -> OperationOutcome {
    state.registry.notifier().force_reload();
    OperationOutcome::ok("route reload requested")
}
