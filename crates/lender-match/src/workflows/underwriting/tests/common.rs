use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::workflows::underwriting::policy::{evaluate_group, RuleResult, RuleSetEvaluator};
use crate::workflows::underwriting::{
    underwriting_router, ApplicationProfile, Borrower, BusinessCredit, CatalogEntry, Guarantor,
    InMemoryUnderwritingRepository, LoanApplication, LoanRequest, LoanRequestId, MatchResult,
    MatchRun, MatchRunId, Policy, PolicyCatalog, RepositoryError, Rule, RuleGroup, Severity,
    UnderwritingRepository, UnderwritingService,
};

pub(super) const FICO_RULE_MESSAGE: &str = "Guarantor FICO must be at least 680";
pub(super) const IDEAL_FICO_MESSAGE: &str = "Ideal FICO is 700+";

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn application(fico_score: Option<u32>) -> LoanApplication {
    LoanApplication {
        loan_request: LoanRequest {
            id: LoanRequestId(1),
            borrower_id: 1,
            amount: 85_000.0,
            term_months: 48,
            equipment_type: "Excavator".to_string(),
            equipment_cost: 92_000.0,
            equipment_year: Some(2021),
            equipment_vendor: Some("Midwest Heavy Equipment".to_string()),
            equipment_condition: Some("used".to_string()),
            created_at: NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date"),
        },
        borrower: Borrower {
            id: 1,
            business_name: "Cedar Ridge Construction".to_string(),
            industry: "Construction".to_string(),
            state: "IA".to_string(),
            years_in_business: 6.5,
            annual_revenue: 1_450_000.0,
            paynet_score: Some(682),
            medical_license_flag: false,
        },
        guarantors: vec![Guarantor {
            id: 1,
            borrower_id: 1,
            name: "Dana Whitfield".to_string(),
            fico_score,
            bankruptcy_flag: false,
            delinquency_flag: false,
        }],
        business_credit: Some(BusinessCredit {
            borrower_id: 1,
            paynet_score: Some(682),
            tradelines_count: Some(14),
            serious_delinquency_count: Some(0),
        }),
    }
}

pub(super) fn profile_with_fico(fico_score: Option<u32>) -> ApplicationProfile {
    ApplicationProfile::build(&application(fico_score), as_of())
}

pub(super) fn rule(id: &str, rule_type: &str, field: &str, params: Value, severity: Severity) -> Rule {
    Rule {
        id: id.to_string(),
        rule_type: rule_type.to_string(),
        field: Some(field.to_string()),
        params: params.as_object().cloned().unwrap_or_default(),
        severity,
        message: format!("{id} failed"),
    }
}

pub(super) fn group(rules: Vec<Rule>) -> RuleGroup {
    RuleGroup {
        rules: Some(rules),
        ..RuleGroup::default()
    }
}

/// Hard FICO floor of 680, a soft "ideal 700+" rule and a single deduction for it.
pub(super) fn fico_policy(min_accept_score: f64, deduction_points: f64) -> Policy {
    serde_json::from_value(json!({
        "hard_rules": {
            "logic": "ALL",
            "rules": [{
                "id": "min_fico",
                "type": "MIN_VALUE",
                "field": "guarantor.primary.fico_score",
                "params": { "min": 680 },
                "severity": "HARD",
                "message": FICO_RULE_MESSAGE
            }]
        },
        "soft_rules": {
            "logic": "ALL",
            "rules": [{
                "id": "ideal_fico_700",
                "type": "MIN_VALUE",
                "field": "guarantor.primary.fico_score",
                "params": { "min": 700 },
                "severity": "SOFT",
                "message": IDEAL_FICO_MESSAGE
            }]
        },
        "scoring_config": {
            "base_score": 100,
            "min_accept_score": min_accept_score,
            "deductions": [{ "ruleId": "ideal_fico_700", "points": deduction_points }]
        }
    }))
    .expect("policy parses")
}

pub(super) fn hard_only_policy(min_fico: u32) -> Policy {
    serde_json::from_value(json!({
        "hard_rules": {
            "rules": [{
                "id": "prime_fico",
                "type": "MIN_VALUE",
                "field": "guarantor.primary.fico_score",
                "params": { "min": min_fico },
                "severity": "HARD",
                "message": format!("Prime tier requires FICO {min_fico}+")
            }]
        }
    }))
    .expect("policy parses")
}

/// Two active lenders, one dormant lender and one switched-off policy.
pub(super) fn catalog() -> PolicyCatalog {
    let document = json!({
        "lenders": [
            { "id": 1, "name": "Apex Equipment Finance" },
            { "id": 2, "name": "Summit Commercial Credit" },
            { "id": 3, "name": "Dormant Leasing", "active": false }
        ],
        "programs": [
            { "id": 10, "lender_id": 1, "name": "Standard A", "min_amount": 10000, "max_amount": 500000, "min_term_months": 24, "max_term_months": 60 },
            { "id": 11, "lender_id": 1, "name": "Medical Tier 1", "min_amount": 25000, "max_amount": 750000, "min_term_months": 24, "max_term_months": 72 },
            { "id": 20, "lender_id": 2, "name": "Prime", "min_amount": 50000, "max_amount": 1000000, "min_term_months": 36, "max_term_months": 84 },
            { "id": 30, "lender_id": 3, "name": "Legacy", "min_amount": 5000, "max_amount": 100000, "min_term_months": 12, "max_term_months": 48 }
        ],
        "policies": [
            { "id": 100, "lender_program_id": 10, "policy_json": fico_policy(60.0, 10.0) },
            { "id": 110, "lender_program_id": 11, "is_active": false, "policy_json": hard_only_policy(600) },
            { "id": 200, "lender_program_id": 20, "policy_json": hard_only_policy(720) },
            { "id": 300, "lender_program_id": 30, "policy_json": fico_policy(60.0, 10.0) }
        ]
    });
    let raw = serde_json::to_vec(&document).expect("catalog serializes");
    PolicyCatalog::from_reader(raw.as_slice()).expect("catalog parses")
}

pub(super) fn memory_repository(fico_score: Option<u32>) -> Arc<InMemoryUnderwritingRepository> {
    let repository = InMemoryUnderwritingRepository::with_catalog(catalog());
    repository
        .add_application(application(fico_score))
        .expect("application stored");
    Arc::new(repository)
}

pub(super) fn build_service() -> (
    UnderwritingService<InMemoryUnderwritingRepository>,
    Arc<InMemoryUnderwritingRepository>,
) {
    let repository = memory_repository(Some(700));
    let service = UnderwritingService::new(repository.clone());
    (service, repository)
}

pub(super) fn underwriting_router_with_service(
    service: UnderwritingService<InMemoryUnderwritingRepository>,
) -> axum::Router {
    underwriting_router(Arc::new(service))
}

/// Evaluator that counts how many rule groups the engine asked it to evaluate.
#[derive(Clone, Default)]
pub(super) struct CountingEvaluator {
    calls: Arc<AtomicUsize>,
}

impl CountingEvaluator {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RuleSetEvaluator for CountingEvaluator {
    fn evaluate_group(&self, group: &RuleGroup, profile: &ApplicationProfile) -> Vec<RuleResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        evaluate_group(group, profile)
    }
}

pub(super) struct UnavailableRepository;

impl UnderwritingRepository for UnavailableRepository {
    fn load_application(
        &self,
        _id: LoanRequestId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn policy_catalog(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_run(&self, _run: MatchRun) -> Result<MatchRun, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_run(&self, _run: &MatchRun) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_run(&self, _id: MatchRunId) -> Result<Option<MatchRun>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_result(&self, _result: MatchResult) -> Result<MatchResult, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn results_for_run(&self, _id: MatchRunId) -> Result<Vec<MatchResult>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Delegates to memory storage but refuses to persist match results.
pub(super) struct ResultsOfflineRepository {
    pub(super) inner: Arc<InMemoryUnderwritingRepository>,
}

impl UnderwritingRepository for ResultsOfflineRepository {
    fn load_application(
        &self,
        id: LoanRequestId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        self.inner.load_application(id)
    }

    fn policy_catalog(&self) -> Result<Vec<CatalogEntry>, RepositoryError> {
        self.inner.policy_catalog()
    }

    fn insert_run(&self, run: MatchRun) -> Result<MatchRun, RepositoryError> {
        self.inner.insert_run(run)
    }

    fn update_run(&self, run: &MatchRun) -> Result<(), RepositoryError> {
        self.inner.update_run(run)
    }

    fn fetch_run(&self, id: MatchRunId) -> Result<Option<MatchRun>, RepositoryError> {
        self.inner.fetch_run(id)
    }

    fn insert_result(&self, _result: MatchResult) -> Result<MatchResult, RepositoryError> {
        Err(RepositoryError::Unavailable("results table locked".to_string()))
    }

    fn results_for_run(&self, id: MatchRunId) -> Result<Vec<MatchResult>, RepositoryError> {
        self.inner.results_for_run(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
