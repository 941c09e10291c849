use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::underwriting::policy::RuleTreeEvaluator;
use crate::workflows::underwriting::{LoanRequestId, UnderwritingService};

#[tokio::test]
async fn run_route_creates_completed_run() {
    let (service, _) = build_service();
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/underwriting/runs/1")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "COMPLETE");
    assert_eq!(payload["loan_request_id"], 1);
    assert_eq!(payload["eligible_count"], 1);
    assert_eq!(payload["results"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn run_route_returns_not_found_for_unknown_loan_request() {
    let (service, _) = build_service();
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/underwriting/runs/404")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "loan request 404 not found");
}

#[tokio::test]
async fn run_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(UnderwritingService::new(Arc::new(UnavailableRepository)));

    let response = crate::workflows::underwriting::router::run_handler::<
        UnavailableRepository,
        RuleTreeEvaluator,
    >(State(service), Path(1))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn status_route_returns_stored_run() {
    let (service, _) = build_service();
    let view = service
        .run_as_of(LoanRequestId(1), as_of())
        .expect("run succeeds");
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/underwriting/runs/{}", view.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], view.id.0);
    assert_eq!(payload["status"], "COMPLETE");
}

#[tokio::test]
async fn status_route_returns_not_found_for_unknown_run() {
    let (service, _) = build_service();
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/underwriting/runs/99")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matches_route_lists_evaluations_for_run() {
    let (service, _) = build_service();
    let view = service
        .run_as_of(LoanRequestId(1), as_of())
        .expect("run succeeds");
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/matches/by-run/{}", view.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let evaluations = payload.as_array().expect("array payload");
    assert_eq!(evaluations.len(), 2);
    assert_eq!(evaluations[0]["eligible"], true);
    assert_eq!(evaluations[0]["fit_score"], 100.0);
    assert_eq!(evaluations[1]["fit_score"], serde_json::Value::Null);
    assert_eq!(
        evaluations[1]["reasons"][0],
        "Prime tier requires FICO 720+"
    );
}

#[tokio::test]
async fn matches_route_returns_not_found_for_unknown_run() {
    let (service, _) = build_service();
    let router = underwriting_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/matches/by-run/5")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
