use chrono::NaiveDate;
use lender_match::error::AppError;
use lender_match::workflows::underwriting::{
    Borrower, BusinessCredit, CatalogError, Guarantor, LoanApplication, LoanRequest, LoanRequestId,
    PolicyCatalog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog from `path`, or the bundled sample catalog when no path is configured.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<PolicyCatalog, CatalogError> {
    match path {
        Some(path) => PolicyCatalog::from_path(path),
        None => PolicyCatalog::bundled(),
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Loan request 1: a construction firm financing a used excavator.
pub(crate) fn sample_application(fico_score: u32) -> LoanApplication {
    let created_at = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap_or_default();

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
            created_at,
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
            fico_score: Some(fico_score),
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

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
