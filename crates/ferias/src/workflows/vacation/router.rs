use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CycleLabel, EmployeeId, GrantTerms, RequestId, RequestStage};
use super::grant::GrantError;
use super::repository::{AccessDirectory, Notifier, RepositoryError, VacationStore};
use super::service::{VacationService, VacationServiceError};
use super::validator::ValidationError;

/// Router builder exposing the vacation workflow over HTTP.
pub fn vacation_router<S, D, N>(service: Arc<VacationService<S, D, N>>) -> Router
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/vacation/periods/generate",
            post(generate_periods_handler::<S, D, N>),
        )
        .route(
            "/api/v1/vacation/periods/:employee_id",
            get(open_periods_handler::<S, D, N>),
        )
        .route(
            "/api/v1/vacation/requests",
            post(submit_handler::<S, D, N>),
        )
        .route(
            "/api/v1/vacation/requests/pending",
            get(pending_handler::<S, D, N>),
        )
        .route(
            "/api/v1/vacation/requests/:request_id/decision",
            post(decide_handler::<S, D, N>),
        )
        .route(
            "/api/v1/vacation/requests/:request_id/history",
            get(history_handler::<S, D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct GeneratePeriodsBody {
    pub employee_id: String,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub employee_id: String,
    pub period: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub actor_id: String,
    pub approved: bool,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub grant: Option<GrantTerms>,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub actor: String,
    pub stage: String,
}

async fn generate_periods_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    axum::Json(body): axum::Json<GeneratePeriodsBody>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    let today = body.today.unwrap_or_else(|| Utc::now().date_naive());
    match service.ensure_periods(&EmployeeId(body.employee_id), today) {
        Ok(created) => (StatusCode::OK, axum::Json(created)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn open_periods_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    Path(employee_id): Path<String>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    match service.open_periods(&EmployeeId(employee_id)) {
        Ok(periods) => (StatusCode::OK, axum::Json(periods)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn submit_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    axum::Json(body): axum::Json<SubmitRequestBody>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    match service.submit_request(
        &EmployeeId(body.employee_id),
        &CycleLabel(body.period),
        body.starts_on,
        body.ends_on,
    ) {
        Ok(request) => (StatusCode::CREATED, axum::Json(request.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn decide_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<DecisionBody>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    match service.decide(
        &RequestId(request_id),
        &EmployeeId(body.actor_id),
        body.approved,
        body.observation,
        body.grant,
    ) {
        Ok(request) => (StatusCode::OK, axum::Json(request.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn pending_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    Query(query): Query<PendingQuery>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    let Some(stage) = parse_pending_stage(&query.stage) else {
        let payload = json!({ "error": "stage must be 'manager' or 'executive'" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match service.list_pending(&EmployeeId(query.actor), stage) {
        Ok(requests) => {
            let views: Vec<_> = requests.iter().map(|request| request.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn history_handler<S, D, N>(
    State(service): State<Arc<VacationService<S, D, N>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: VacationStore + 'static,
    D: AccessDirectory + 'static,
    N: Notifier + 'static,
{
    match service.history(&RequestId(request_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

fn parse_pending_stage(raw: &str) -> Option<RequestStage> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "manager" | "pending_manager" => Some(RequestStage::PendingManager),
        "executive" | "pending_executive" => Some(RequestStage::PendingExecutive),
        _ => None,
    }
}

fn error_response(err: VacationServiceError) -> Response {
    let status = match &err {
        VacationServiceError::Validation(
            ValidationError::PeriodNotOpen { .. }
            | ValidationError::OverlappingRequest { .. }
            | ValidationError::RequestAlreadyPending { .. },
        ) => StatusCode::CONFLICT,
        VacationServiceError::Validation(ValidationError::InvalidRange { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VacationServiceError::Grant(GrantError::InvalidBalance(_))
        | VacationServiceError::Grant(GrantError::RangeMismatch { .. })
        | VacationServiceError::Grant(GrantError::MissingTerms) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VacationServiceError::AlreadyDecided(_) => StatusCode::CONFLICT,
        VacationServiceError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        VacationServiceError::UnknownEmployee(_)
        | VacationServiceError::UnknownPeriod(..)
        | VacationServiceError::UnknownRequest(_) => StatusCode::NOT_FOUND,
        VacationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VacationServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Stale,
        ) => StatusCode::CONFLICT,
        VacationServiceError::Repository(RepositoryError::Unavailable(_))
        | VacationServiceError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
