//! REST handlers for the production line API.
//!
//! Everything lives under `/api`: layout CRUD (`/api/machines`,
//! `/api/connections`, `/api/item-types`) and the derived production views
//! (`/api/production/*`). Handlers take `now` from the wall clock and hand it
//! to the engine.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use prodline_core::{
    Connection, ConnectionDraft, ConnectionId, FlowDirection, ItemType, ItemTypeDraft, Machine,
    MachineDraft, MachineId, MachinePatch, MachineSnapshot, OverviewSnapshot,
};
use prodline_engine::HistoryPoint;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::types::{MessageResponse, RateEntry, SimulateResponse};

/// Routes mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/production/rates", get(list_rates))
        .route("/api/production/rates/{machine_id}", get(machine_rates))
        .route("/api/production/history/{machine_id}", get(machine_history))
        .route("/api/production/status", get(production_status))
        .route("/api/production/overview", get(production_overview))
        .route("/api/production/simulate/{machine_id}", post(simulate))
        .route(
            "/api/machines",
            get(list_machines)
                .post(create_machine)
                .delete(delete_all_machines),
        )
        .route(
            "/api/machines/{machine_id}",
            get(get_machine).put(update_machine).delete(delete_machine),
        )
        .route(
            "/api/connections",
            get(list_connections).post(create_connection),
        )
        .route("/api/connections/{connection_id}", delete(delete_connection))
        .route(
            "/api/item-types",
            get(list_item_types).post(create_item_type),
        )
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::Validation(e.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(params)| params)
        .map_err(|e| ApiError::Validation(e.body_text()))
}

// --- Production ---

async fn list_rates(State(state): State<AppState>) -> ApiResult<Json<Vec<RateEntry>>> {
    Ok(Json(state.dashboard().rate_entries(None)?))
}

async fn machine_rates(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
) -> ApiResult<Json<Vec<RateEntry>>> {
    let machine_id = MachineId(machine_id);
    state.dashboard().engine().store().require_machine(machine_id)?;
    Ok(Json(state.dashboard().rate_entries(Some(machine_id))?))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    item_type: Option<String>,
    #[serde(default = "default_history_hours")]
    hours: i64,
}

fn default_history_hours() -> i64 {
    1
}

async fn machine_history(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<HistoryPoint>>> {
    let params = query_params(params)?;
    let points = state.dashboard().engine().history(
        MachineId(machine_id),
        params.item_type.as_deref(),
        params.hours,
        Utc::now(),
    )?;
    Ok(Json(points))
}

async fn production_status(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MachineSnapshot>>> {
    Ok(Json(state.dashboard().engine().status(Utc::now())?))
}

async fn production_overview(State(state): State<AppState>) -> ApiResult<Json<OverviewSnapshot>> {
    Ok(Json(state.dashboard().engine().overview()?))
}

#[derive(Debug, Deserialize)]
struct SimulateParams {
    item_type: String,
    quantity: i64,
    /// `input` or `output`; omitted means inferred from the machine.
    direction: Option<String>,
}

async fn simulate(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
    params: Result<Query<SimulateParams>, QueryRejection>,
) -> ApiResult<Json<SimulateResponse>> {
    let params = query_params(params)?;
    let direction = params
        .direction
        .as_deref()
        .map(str::parse::<FlowDirection>)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let outcome = state.dashboard().engine().simulate(
        MachineId(machine_id),
        &params.item_type,
        params.quantity,
        direction,
        Utc::now(),
    )?;

    Ok(Json(SimulateResponse {
        message: "Production simulated successfully".to_string(),
        rate_per_minute: outcome.rate_per_minute,
    }))
}

// --- Machines ---

async fn list_machines(State(state): State<AppState>) -> ApiResult<Json<Vec<Machine>>> {
    Ok(Json(state.dashboard().engine().store().list_machines(false)?))
}

async fn get_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
) -> ApiResult<Json<Machine>> {
    let machine = state
        .dashboard()
        .engine()
        .store()
        .require_machine(MachineId(machine_id))?;
    Ok(Json(machine))
}

async fn create_machine(
    State(state): State<AppState>,
    payload: Result<Json<MachineDraft>, JsonRejection>,
) -> ApiResult<Json<Machine>> {
    let draft = json_body(payload)?;
    let machine = state.dashboard().engine().store().create_machine(draft)?;
    info!(machine_id = %machine.id, name = %machine.name, "Machine created");
    Ok(Json(machine))
}

async fn update_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
    payload: Result<Json<MachinePatch>, JsonRejection>,
) -> ApiResult<Json<Machine>> {
    let patch = json_body(payload)?;
    let machine = state
        .dashboard()
        .engine()
        .store()
        .update_machine(MachineId(machine_id), patch)?;
    Ok(Json(machine))
}

async fn delete_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<u64>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .dashboard()
        .engine()
        .store()
        .delete_machine(MachineId(machine_id))?;
    info!(machine_id, "Machine deleted");
    Ok(Json(MessageResponse::new("Machine deleted successfully")))
}

async fn delete_all_machines(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    let deleted = state.dashboard().engine().store().delete_all_machines()?;
    info!(deleted, "All machines deleted");
    Ok(Json(MessageResponse::new(format!(
        "All {deleted} machines deleted successfully"
    ))))
}

// --- Connections ---

async fn list_connections(State(state): State<AppState>) -> ApiResult<Json<Vec<Connection>>> {
    Ok(Json(state.dashboard().engine().store().list_connections()?))
}

async fn create_connection(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionDraft>, JsonRejection>,
) -> ApiResult<Json<Connection>> {
    let draft = json_body(payload)?;
    let connection = state
        .dashboard()
        .engine()
        .store()
        .create_connection(draft)?;
    Ok(Json(connection))
}

async fn delete_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<u64>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .dashboard()
        .engine()
        .store()
        .delete_connection(ConnectionId(connection_id))?;
    Ok(Json(MessageResponse::new("Connection deleted successfully")))
}

// --- Item types ---

async fn list_item_types(State(state): State<AppState>) -> ApiResult<Json<Vec<ItemType>>> {
    Ok(Json(state.dashboard().engine().store().list_item_types()?))
}

async fn create_item_type(
    State(state): State<AppState>,
    payload: Result<Json<ItemTypeDraft>, JsonRejection>,
) -> ApiResult<Json<ItemType>> {
    let draft = json_body(payload)?;
    Ok(Json(
        state.dashboard().engine().store().create_item_type(draft)?,
    ))
}
