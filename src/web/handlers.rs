//! HTTP request handlers.

use super::AppState;
use crate::scheduler::{LogEntry, TargetRuntime};
use crate::store::{SettingsUpdate, StoreError, Target, TargetPatch};

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// Responses
// ============================================================================

fn failure(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": error.to_string() })),
    )
        .into_response()
}

fn store_failure(e: StoreError) -> Response {
    match e {
        StoreError::NoCapacity | StoreError::InvalidId(_) => failure(StatusCode::BAD_REQUEST, e),
        _ => {
            tracing::error!("Failed to persist targets: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn slot_id(id: Option<i64>) -> Result<u32, Response> {
    id.and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Invalid server ID"))
}

// ============================================================================
// API: Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub general_config: GeneralConfig,
    pub targets: Vec<TargetStatus>,
}

#[derive(Debug, Serialize)]
pub struct GeneralConfig {
    pub gmt_offset: i32,
}

#[derive(Debug, Serialize)]
pub struct PingStats {
    pub last: u64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Serialize)]
pub struct TargetStatus {
    pub id: u32,
    pub http_code: i32,
    /// Timeline text, newest first.
    pub log: String,
    pub events: Vec<LogEntry>,
    pub ping: PingStats,
    pub online: bool,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub config: TargetConfigView,
}

/// Target configuration under its admin API names.
#[derive(Debug, Serialize)]
pub struct TargetConfigView {
    pub server_name: String,
    pub group_name: String,
    pub enabled: bool,
    pub weburl: String,
    pub discord_webhook: String,
    pub ntfy_url: String,
    pub ntfy_priority: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id_1: String,
    pub telegram_chat_id_2: String,
    pub telegram_chat_id_3: String,
    pub http_get_url_on: String,
    pub http_get_url_off: String,
    pub online_message: String,
    pub offline_message: String,
    pub check_interval_seconds: u32,
    pub failure_threshold: u32,
    pub recovery_threshold: u32,
}

impl From<Target> for TargetConfigView {
    fn from(t: Target) -> Self {
        Self {
            server_name: t.name,
            group_name: t.group,
            enabled: t.enabled,
            weburl: t.url,
            discord_webhook: t.discord_webhook,
            ntfy_url: t.ntfy_url,
            ntfy_priority: t.ntfy_priority,
            telegram_bot_token: t.telegram_bot_token,
            telegram_chat_id_1: t.telegram_chat_id_1,
            telegram_chat_id_2: t.telegram_chat_id_2,
            telegram_chat_id_3: t.telegram_chat_id_3,
            http_get_url_on: t.http_get_url_on,
            http_get_url_off: t.http_get_url_off,
            online_message: t.online_message,
            offline_message: t.offline_message,
            check_interval_seconds: t.check_interval,
            failure_threshold: t.failure_threshold,
            recovery_threshold: t.recovery_threshold,
        }
    }
}

fn local_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix())
}

fn target_status(target: Target, runtime: TargetRuntime, offset: FixedOffset) -> TargetStatus {
    let state = runtime.state;
    TargetStatus {
        id: target.id,
        http_code: state.status.code(),
        log: runtime.log.render(offset),
        events: runtime.log.entries().copied().collect(),
        ping: PingStats {
            last: state.last_latency.as_millis() as u64,
            min: state.min_latency.as_millis() as u64,
            max: state.max_latency.as_millis() as u64,
        },
        online: state.confirmed_online,
        failure_count: state.failure_count,
        success_count: state.success_count,
        last_check: state.last_check,
        config: target.into(),
    }
}

pub async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let gmt_offset = state.store.gmt_offset();
    let offset = local_offset(gmt_offset);
    let mut runtimes = state.scheduler.snapshots().await;

    let targets = state
        .store
        .list()
        .into_iter()
        .map(|target| {
            let runtime = runtimes.remove(&target.id).unwrap_or_default();
            target_status(target, runtime, offset)
        })
        .collect();

    Json(StatusResponse {
        general_config: GeneralConfig { gmt_offset },
        targets,
    })
}

pub async fn handle_logs(State(state): State<AppState>) -> String {
    state.console.contents()
}

pub async fn handle_groups(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.groups())
}

// ============================================================================
// API: Configuration
// ============================================================================

pub async fn handle_settings(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let update = SettingsUpdate::from_pairs(pairs);

    match state.store.apply_settings(&update) {
        Ok(touched) => {
            tracing::info!("Settings saved ({} targets touched)", touched.len());
            state.scheduler.sync_all().await;
            "OK".into_response()
        }
        Err(e) => {
            tracing::error!("Failed to save settings: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn handle_add_server(
    State(state): State<AppState>,
    Json(patch): Json<TargetPatch>,
) -> Response {
    match state.store.add(&patch) {
        Ok(id) => {
            state.scheduler.sync_target(id).await;
            Json(json!({ "success": true, "id": id })).into_response()
        }
        Err(e) => store_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateServerRequest {
    pub id: Option<i64>,
    #[serde(flatten)]
    pub patch: TargetPatch,
}

pub async fn handle_update_server(
    State(state): State<AppState>,
    Json(req): Json<UpdateServerRequest>,
) -> Response {
    let id = match slot_id(req.id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.store.update(id, &req.patch) {
        Ok(_) => {
            state.scheduler.sync_target(id).await;
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => store_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteServerRequest {
    pub id: Option<i64>,
}

pub async fn handle_delete_server(
    State(state): State<AppState>,
    Json(req): Json<DeleteServerRequest>,
) -> Response {
    let id = match slot_id(req.id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.store.delete(id) {
        Ok(()) => {
            state.scheduler.sync_target(id).await;
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => store_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameGroupRequest {
    pub old_name: Option<String>,
    pub new_name: Option<String>,
}

pub async fn handle_rename_group(
    State(state): State<AppState>,
    Json(req): Json<RenameGroupRequest>,
) -> Response {
    let (Some(old_name), Some(new_name)) = (req.old_name, req.new_name) else {
        return failure(StatusCode::BAD_REQUEST, "Missing old_name or new_name");
    };

    match state.store.rename_group(&old_name, &new_name) {
        Ok(updated) => Json(json!({ "success": true, "updated": updated })).into_response(),
        Err(e) => store_failure(e),
    }
}
