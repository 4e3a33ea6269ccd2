//! Ranger handlers: create, page, search, list, read, patch, delete, claimed-today.
//!
//! Request shape is checked before a session is taken from the pool, so malformed
//! requests never hold a connection.

use crate::config::{ResolvedEntity, ValidationRule};
use crate::error::{AppError, ErrorBody};
use crate::model::ranger::{Completion, CreateRanger, Ranger, RangerStatus, COMPLETE, ID, RANGER_PATH};
use crate::response::{Count, Page};
use crate::service::{is_truthy_or_zero, CrudService, PageRequest, Record, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

const MAX_PAGE_SIZE: i64 = 100;
const CREATE_FIELDS: [&str; 2] = ["nickname", "ph_number"];

fn body_to_map(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Map keys to column names; any key naming no field is rejected.
fn known_fields(entity: &ResolvedEntity, body: Value) -> Result<Record, AppError> {
    let (known, unknown) = entity.normalize(body_to_map(body)?);
    match unknown.first() {
        Some(key) => Err(AppError::BadRequest(format!(
            "unknown field '{}' for {}",
            key, entity.table_name
        ))),
        None => Ok(known),
    }
}

fn id_filter(id: &str) -> Record {
    let mut m = Record::new();
    m.insert(ID.into(), Value::String(id.to_string()));
    m
}

fn record_not_found() -> AppError {
    AppError::NotFound("Record not found".into())
}

/// Validate a page request: 1-based page, size within 1..=100.
pub fn check_page_request(req: &PageRequest) -> Result<(), AppError> {
    if req.page < 1 {
        return Err(AppError::Validation("Page number should be positive".into()));
    }
    if req.size > MAX_PAGE_SIZE {
        return Err(AppError::Validation(format!("Size should be below {}", MAX_PAGE_SIZE)));
    }
    if req.size < 1 {
        return Err(AppError::Validation("Size should be positive".into()));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/ranger/create",
    request_body = CreateRanger,
    responses(
        (status = 200, description = "Id of the new ranger", body = String),
        (status = 400, description = "Missing field or duplicate nickname/phone", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<String>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let (known, ignored) = entity.normalize(body_to_map(body)?);
    if !ignored.is_empty() {
        tracing::debug!(fields = ?ignored, "create: ignoring unknown fields");
    }
    let rules: HashMap<String, ValidationRule> = entity
        .validation
        .iter()
        .filter(|(k, _)| CREATE_FIELDS.contains(&k.as_str()))
        .map(|(k, r)| (k.clone(), r.clone()))
        .collect();
    RequestValidator::validate(&known, &rules)?;
    let req: CreateRanger = serde_json::from_value(Value::Object(known))
        .map_err(|e| AppError::Validation(format!("invalid ranger: {}", e)))?;

    let mut session = state.session().await?;
    let row = CrudService::create(&mut session, entity, &req.into_record()).await?;
    let ranger = Ranger::from_record(row)?;
    tracing::info!(ranger_id = %ranger.ranger_id, "ranger created");
    Ok(Json(ranger.ranger_id))
}

#[utoipa::path(
    post,
    path = "/ranger/page-list",
    request_body = PageRequest,
    responses(
        (status = 200, description = "One page of rangers, newest first", body = Page<Ranger>),
        (status = 400, description = "Invalid page or size", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn page_list(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Page<Ranger>>, AppError> {
    let req: PageRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("invalid page request: {}", e)))?;
    check_page_request(&req)?;
    let entity = state.entity(RANGER_PATH)?;
    let mut session = state.session().await?;
    let page = CrudService::paginate(&mut session, entity, req).await?;
    Ok(Json(page.try_map(Ranger::from_record)?))
}

#[utoipa::path(
    post,
    path = "/ranger/search",
    request_body = Object,
    responses(
        (status = 200, description = "Id of the first matching ranger", body = String),
        (status = 400, description = "Unknown field", body = ErrorBody),
        (status = 404, description = "No match", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn search(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<String>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let filters = known_fields(entity, body)?;
    let mut session = state.session().await?;
    let rows = CrudService::search(&mut session, entity, &filters).await?;
    let first = rows.into_iter().next().ok_or_else(record_not_found)?;
    Ok(Json(Ranger::from_record(first)?.ranger_id))
}

#[utoipa::path(
    get,
    path = "/ranger/list",
    responses((status = 200, description = "Every ranger", body = Vec<Ranger>)),
    tag = "ranger"
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Ranger>>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let mut session = state.session().await?;
    let rows = CrudService::list_all(&mut session, entity).await?;
    let rangers = rows.into_iter().map(Ranger::from_record).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(rangers))
}

#[utoipa::path(
    get,
    path = "/ranger/claimed-today",
    responses((status = 200, description = "Rangers who claimed a first-come prize today", body = Count)),
    tag = "ranger"
)]
pub async fn claimed_today(State(state): State<AppState>) -> Result<Json<Count>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let mut session = state.session().await?;
    let count = CrudService::count_updated_today(
        &mut session,
        entity,
        COMPLETE,
        Completion::ClaimedFirst.code(),
        Utc::now(),
    )
    .await?;
    Ok(Json(Count { count }))
}

#[utoipa::path(
    get,
    path = "/ranger/{id}",
    params(("id" = String, Path, description = "Ranger id")),
    responses(
        (status = 200, description = "Treasure progress", body = RangerStatus),
        (status = 404, description = "Record not found", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<RangerStatus>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let mut session = state.session().await?;
    let row = CrudService::get_one(&mut session, entity, &id_filter(&id))
        .await?
        .ok_or_else(record_not_found)?;
    Ok(Json(Ranger::from_record(row)?.status()))
}

#[utoipa::path(
    patch,
    path = "/ranger/{id}",
    params(("id" = String, Path, description = "Ranger id")),
    request_body = Object,
    responses(
        (status = 200, description = "Updated ranger", body = Ranger),
        (status = 400, description = "Unknown, read-only or mistyped field", body = ErrorBody),
        (status = 404, description = "Record not found", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Ranger>, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let changes = known_fields(entity, body)?;
    for (key, v) in &changes {
        let writable = entity.column(key).map_or(false, |c| c.writable);
        if !writable && is_truthy_or_zero(v) {
            return Err(AppError::BadRequest(format!("{} is read-only", key)));
        }
    }
    RequestValidator::validate_partial(&changes, &entity.validation)?;

    let mut session = state.session().await?;
    let existing = CrudService::get_one(&mut session, entity, &id_filter(&id))
        .await?
        .ok_or_else(record_not_found)?;
    let row = CrudService::patch(&mut session, entity, &existing, &changes).await?;
    let mut ranger = Ranger::from_record(row)?;
    if let Some(done) = ranger.completion_patch() {
        let row = CrudService::patch(&mut session, entity, &id_filter(&ranger.ranger_id), &done).await?;
        ranger = Ranger::from_record(row)?;
        tracing::info!(ranger_id = %ranger.ranger_id, "ranger completed the hunt");
    }
    Ok(Json(ranger))
}

#[utoipa::path(
    delete,
    path = "/ranger/{id}",
    params(("id" = String, Path, description = "Ranger id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Record not found", body = ErrorBody),
    ),
    tag = "ranger"
)]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    let entity = state.entity(RANGER_PATH)?;
    let mut session = state.session().await?;
    if CrudService::delete(&mut session, entity, &id_filter(&id)).await? {
        tracing::info!(ranger_id = %id, "ranger deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(record_not_found())
    }
}
