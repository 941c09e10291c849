use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::policy::Policy;

/// Identifier wrapper for lenders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LenderId(pub i64);

/// Identifier wrapper for a lender's individual program or tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LenderProgramId(pub i64);

/// Identifier wrapper for a versioned policy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LenderPolicyId(pub i64);

/// Identifier wrapper for submitted loan requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanRequestId(pub i64);

impl fmt::Display for LoanRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lender {
    pub id: LenderId,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Individual product offered by a lender, e.g. "Standard A" or "Medical Tier 1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LenderProgram {
    pub id: LenderProgramId,
    pub lender_id: LenderId,
    pub name: String,
    pub min_amount: i64,
    pub max_amount: i64,
    pub min_term_months: u32,
    pub max_term_months: u32,
}

/// Versioned policy document attached to a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LenderPolicy {
    pub id: LenderPolicyId,
    pub lender_program_id: LenderProgramId,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(alias = "policy_json")]
    pub policy: Policy,
}

/// One row of the policy catalog: the policy plus the program and lender that own it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub lender: Lender,
    pub program: LenderProgram,
    pub policy: LenderPolicy,
}

impl CatalogEntry {
    /// Only policies that are switched on for lenders that are still active take part in a run.
    pub fn is_eligible_for_matching(&self) -> bool {
        self.lender.active && self.policy.is_active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: i64,
    pub business_name: String,
    /// NAICS/SIC style industry label.
    pub industry: String,
    pub state: String,
    pub years_in_business: f64,
    pub annual_revenue: f64,
    #[serde(default)]
    pub paynet_score: Option<u32>,
    #[serde(default)]
    pub medical_license_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantor {
    pub id: i64,
    pub borrower_id: i64,
    pub name: String,
    #[serde(default)]
    pub fico_score: Option<u32>,
    #[serde(default)]
    pub bankruptcy_flag: bool,
    #[serde(default)]
    pub delinquency_flag: bool,
}

/// Commercial bureau snapshot for the borrowing business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCredit {
    pub borrower_id: i64,
    #[serde(default)]
    pub paynet_score: Option<u32>,
    #[serde(default)]
    pub tradelines_count: Option<u32>,
    #[serde(default)]
    pub serious_delinquency_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub id: LoanRequestId,
    pub borrower_id: i64,
    pub amount: f64,
    pub term_months: u32,
    pub equipment_type: String,
    pub equipment_cost: f64,
    #[serde(default)]
    pub equipment_year: Option<i32>,
    #[serde(default)]
    pub equipment_vendor: Option<String>,
    /// `new` or `used`.
    #[serde(default)]
    pub equipment_condition: Option<String>,
    pub created_at: NaiveDate,
}

/// Everything the data store holds about one loan request, gathered for underwriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub loan_request: LoanRequest,
    pub borrower: Borrower,
    #[serde(default)]
    pub guarantors: Vec<Guarantor>,
    #[serde(default)]
    pub business_credit: Option<BusinessCredit>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    1
}
