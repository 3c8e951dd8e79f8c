//! Rectification portal endpoints: login gating, planning, one-shot submit.
//!
//! The planning endpoint is the only one with algorithmic content behind
//! it; login and submit are the administrative wrapper around the one-time
//! rectification record.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::RequestStatus;
use crate::planner::{self, EnrollmentEntry, PlanError, Preferences};
use crate::server::types::ApiErrorType;
use crate::types::{AppState, RequestKey};

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub boleta: String,
    #[serde(default)]
    pub codigo: String,
    #[serde(default)]
    pub dni: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub boleta: String,
    pub period: String,
    pub enrollment: Vec<EnrollmentEntry>,
    /// Loose preference object: `{"freeDays": [...], "keepChangesLow": bool}`
    #[serde(default)]
    pub preferences: Value,
}

#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    pub boleta: String,
    #[serde(rename = "finalData")]
    pub final_data: Value,
    #[serde(default = "default_submit_message")]
    pub message: String,
}

fn default_submit_message() -> String {
    "Rectification submitted successfully.".to_string()
}

/// Converts PlanError to an API response.
fn plan_error_to_response(error: PlanError) -> Response {
    let (status, message) = match &error {
        PlanError::Network { .. } => (StatusCode::BAD_GATEWAY, "Could not reach the SIS"),
        PlanError::UnexpectedResponse { .. } => (StatusCode::BAD_GATEWAY, "SIS request failed"),
        PlanError::MalformedPayload { .. } => (
            StatusCode::BAD_GATEWAY,
            "SIS returned an unreadable payload",
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Planning failed"),
    };
    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// POST /rectification/login
///
/// Verifies the boleta/codigo/dni triple and gates re-entry: a student
/// whose request is already DONE is refused with the stored record.
pub async fn post_login(
    State(s): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let boleta = payload.boleta.trim();
    let codigo = payload.codigo.trim();
    let dni = payload.dni.trim();
    let key = RequestKey::from_boleta(boleta);

    info!(student = %key, "POST /rectification/login");

    if !s.verifier.verify(boleta, codigo, dni) {
        warn!(student = %key, "boleta verification rejected");
        return ApiErrorType::from((
            StatusCode::UNAUTHORIZED,
            "Invalid boleta/codigo/dni",
            None,
        ))
        .into_response();
    }

    let existing = match s.store.get_request(boleta) {
        Ok(row) => row,
        Err(e) => {
            error!(student = %key, error = %e, "request lookup failed");
            return storage_error_response(e);
        }
    };

    if let Some(row) = &existing {
        if row.status == RequestStatus::Done {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "allowed": false,
                    "status": "DONE",
                    "message": row.message.clone().unwrap_or_else(|| "Already submitted.".to_string()),
                    "details": row.final_data,
                })),
            )
                .into_response();
        }
    }

    let status = existing
        .map(|row| row.status)
        .unwrap_or(RequestStatus::Pending);

    if let Err(e) = s.store.upsert_pending(boleta, codigo, dni) {
        error!(student = %key, error = %e, "request upsert failed");
        return storage_error_response(e);
    }

    (
        StatusCode::OK,
        Json(json!({"allowed": true, "status": status.as_str()})),
    )
        .into_response()
}

/// POST /rectification/plan
///
/// Runs one planning invocation for the logged-in student. Serialized per
/// boleta: a student cannot run two plans concurrently.
pub async fn post_plan(
    State(s): State<Arc<AppState>>,
    Json(payload): Json<PlanPayload>,
) -> Response {
    let boleta = payload.boleta.trim();
    let key = RequestKey::from_boleta(boleta);

    info!(
        student = %key,
        period = %payload.period,
        courses = payload.enrollment.len(),
        "POST /rectification/plan"
    );

    match s.store.get_request(boleta) {
        Ok(None) => {
            return ApiErrorType::from((
                StatusCode::UNAUTHORIZED,
                "No active rectification request; log in first",
                None,
            ))
            .into_response();
        }
        Ok(Some(row)) if row.status == RequestStatus::Done => {
            return ApiErrorType::from((
                StatusCode::FORBIDDEN,
                "Rectification already submitted",
                None,
            ))
            .into_response();
        }
        Ok(Some(_)) => {}
        Err(e) => {
            error!(student = %key, error = %e, "request lookup failed");
            return storage_error_response(e);
        }
    }

    let lock = s.get_plan_lock(&key);
    let _guard = lock.lock().await;

    let prefs = Preferences::from_json(&payload.preferences);
    match planner::build_plan(&s.client, &payload.period, &payload.enrollment, &prefs).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => {
            error!(student = %key, error = %e, "planning run failed");
            plan_error_to_response(e)
        }
    }
}

/// POST /rectification/submit
///
/// Persists the chosen plan as the record of record. One-shot: a second
/// submit for the same boleta gets 409.
pub async fn post_submit(
    State(s): State<Arc<AppState>>,
    Json(payload): Json<SubmitPayload>,
) -> Response {
    let boleta = payload.boleta.trim();
    let key = RequestKey::from_boleta(boleta);

    info!(student = %key, "POST /rectification/submit");

    // Only a boleta with an active (logged-in, not yet DONE) request may
    // submit; anything else must not be able to mint a DONE record.
    match s.store.get_request(boleta) {
        Ok(None) => {
            return ApiErrorType::from((
                StatusCode::UNAUTHORIZED,
                "No active rectification request; log in first",
                None,
            ))
            .into_response();
        }
        Ok(Some(row)) if row.status == RequestStatus::Done => {
            return ApiErrorType::from((
                StatusCode::CONFLICT,
                "Already submitted",
                None,
            ))
            .into_response();
        }
        Ok(Some(_)) => {}
        Err(e) => {
            error!(student = %key, error = %e, "request lookup failed");
            return storage_error_response(e);
        }
    }

    match s
        .store
        .mark_done(boleta, &payload.final_data, &payload.message)
    {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({"ok": true, "status": "DONE"})),
        )
            .into_response(),
        Ok(false) => ApiErrorType::from((
            StatusCode::CONFLICT,
            "Already submitted",
            None,
        ))
        .into_response(),
        Err(e) => {
            error!(student = %key, error = %e, "submit failed");
            storage_error_response(e)
        }
    }
}

/// GET /rectification/status/:boleta
pub async fn get_status(
    Path(boleta): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    let key = RequestKey::from_boleta(&boleta);
    info!(student = %key, "GET /rectification/status");

    match s.store.get_request(boleta.trim()) {
        Ok(Some(row)) => (StatusCode::OK, Json(row)).into_response(),
        Ok(None) => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "No rectification request for this boleta",
            None,
        ))
        .into_response(),
        Err(e) => {
            error!(student = %key, error = %e, "status lookup failed");
            storage_error_response(e)
        }
    }
}

fn storage_error_response(e: rusqlite::Error) -> Response {
    ApiErrorType::from((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Request store failure",
        Some(e.to_string()),
    ))
    .into_response()
}
