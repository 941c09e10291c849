use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::LoanRequestId;
use super::policy::{RuleSetEvaluator, RuleTreeEvaluator};
use super::repository::UnderwritingRepository;
use super::run::MatchRunId;
use super::service::{UnderwritingError, UnderwritingService};

/// Router exposing underwriting runs and their stored matches.
///
/// `POST /runs/:id` takes a loan request id and starts a run; `GET /runs/:id` takes a run id.
pub fn underwriting_router<R>(service: Arc<UnderwritingService<R>>) -> Router
where
    R: UnderwritingRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/underwriting/runs/:id",
            post(run_handler::<R, RuleTreeEvaluator>).get(run_status_handler::<R, RuleTreeEvaluator>),
        )
        .route(
            "/api/v1/matches/by-run/:run_id",
            get(matches_handler::<R, RuleTreeEvaluator>),
        )
        .with_state(service)
}

pub(crate) async fn run_handler<R, E>(
    State(service): State<Arc<UnderwritingService<R, E>>>,
    Path(loan_request_id): Path<i64>,
) -> Response
where
    R: UnderwritingRepository + 'static,
    E: RuleSetEvaluator + 'static,
{
    match service.run(LoanRequestId(loan_request_id)) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn run_status_handler<R, E>(
    State(service): State<Arc<UnderwritingService<R, E>>>,
    Path(run_id): Path<i64>,
) -> Response
where
    R: UnderwritingRepository + 'static,
    E: RuleSetEvaluator + 'static,
{
    match service.get_run(MatchRunId(run_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn matches_handler<R, E>(
    State(service): State<Arc<UnderwritingService<R, E>>>,
    Path(run_id): Path<i64>,
) -> Response
where
    R: UnderwritingRepository + 'static,
    E: RuleSetEvaluator + 'static,
{
    match service.evaluations_for_run(MatchRunId(run_id)) {
        Ok(evaluations) => (StatusCode::OK, axum::Json(evaluations)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: UnderwritingError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        warn!(error = %err, "underwriting request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
