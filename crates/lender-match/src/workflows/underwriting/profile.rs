use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{Borrower, BusinessCredit, Guarantor, LoanApplication, LoanRequest};

/// Named fields of one sub-record of the profile.
pub type Record = BTreeMap<String, FieldValue>;

/// Scalar (or nested record) stored in an application profile.
///
/// `Null` is kept so placeholder fields such as `derived.foir` are visible in the
/// snapshot, but the resolver treats it exactly like a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Record(Record),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Loose truthiness used by `BOOLEAN_IS_TRUE`: zero, empty text and empty records are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(flag) => *flag,
            FieldValue::Number(value) => *value != 0.0,
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Record(record) => !record.is_empty(),
        }
    }

    /// Convert a JSON policy parameter into a comparable value.
    ///
    /// Arrays have no scalar counterpart and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<FieldValue> {
        match value {
            serde_json::Value::Null => Some(FieldValue::Null),
            serde_json::Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            serde_json::Value::Number(number) => number.as_f64().map(FieldValue::Number),
            serde_json::Value::String(text) => Some(FieldValue::Text(text.clone())),
            serde_json::Value::Object(map) => Some(FieldValue::Record(
                map.iter()
                    .filter_map(|(key, value)| {
                        FieldValue::from_json(value).map(|value| (key.clone(), value))
                    })
                    .collect(),
            )),
            serde_json::Value::Array(_) => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Immutable, namespaced snapshot of one application used as rule-engine input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationProfile {
    pub borrower: Record,
    pub guarantors: Vec<Record>,
    pub business_credit: Option<Record>,
    pub loan_request: Record,
    pub derived: Record,
}

impl ApplicationProfile {
    /// Assemble the profile for `application`, computing derived fields as of `as_of`.
    pub fn build(application: &LoanApplication, as_of: NaiveDate) -> Self {
        let guarantors: Vec<Record> = application
            .guarantors
            .iter()
            .map(guarantor_record)
            .collect();

        let derived = derived_record(application, as_of);

        Self {
            borrower: borrower_record(&application.borrower),
            guarantors,
            business_credit: application
                .business_credit
                .as_ref()
                .map(business_credit_record),
            loan_request: loan_request_record(&application.loan_request),
            derived,
        }
    }

    /// The first guarantor, the only one addressable through `guarantor.primary.`.
    pub fn primary_guarantor(&self) -> Option<&Record> {
        self.guarantors.first()
    }
}

fn borrower_record(borrower: &Borrower) -> Record {
    let mut record = Record::new();
    record.insert(
        "business_name".to_string(),
        borrower.business_name.as_str().into(),
    );
    record.insert("industry".to_string(), borrower.industry.as_str().into());
    record.insert("state".to_string(), borrower.state.as_str().into());
    record.insert(
        "years_in_business".to_string(),
        borrower.years_in_business.into(),
    );
    record.insert("annual_revenue".to_string(), borrower.annual_revenue.into());
    record
}

fn guarantor_record(guarantor: &Guarantor) -> Record {
    let mut record = Record::new();
    record.insert("name".to_string(), guarantor.name.as_str().into());
    record.insert("fico_score".to_string(), guarantor.fico_score.into());
    record.insert(
        "bankruptcy_flag".to_string(),
        guarantor.bankruptcy_flag.into(),
    );
    record.insert(
        "delinquency_flag".to_string(),
        guarantor.delinquency_flag.into(),
    );
    record
}

fn business_credit_record(credit: &BusinessCredit) -> Record {
    let mut record = Record::new();
    record.insert("paynet_score".to_string(), credit.paynet_score.into());
    record.insert(
        "tradelines_count".to_string(),
        credit.tradelines_count.into(),
    );
    record.insert(
        "serious_delinquency_count".to_string(),
        credit.serious_delinquency_count.into(),
    );
    record
}

fn loan_request_record(loan: &LoanRequest) -> Record {
    let mut record = Record::new();
    record.insert("amount".to_string(), loan.amount.into());
    record.insert("term_months".to_string(), loan.term_months.into());
    record.insert(
        "equipment_type".to_string(),
        loan.equipment_type.as_str().into(),
    );
    record.insert("equipment_cost".to_string(), loan.equipment_cost.into());
    record.insert("equipment_year".to_string(), loan.equipment_year.into());
    record.insert(
        "equipment_condition".to_string(),
        loan.equipment_condition.clone().into(),
    );
    record.insert(
        "created_at".to_string(),
        loan.created_at.format("%Y-%m-%d").to_string().into(),
    );
    record
}

fn derived_record(application: &LoanApplication, as_of: NaiveDate) -> Record {
    // A zero year, an unknown year and an out-of-range year are treated alike.
    let equipment_age = application
        .loan_request
        .equipment_year
        .filter(|year| *year != 0)
        .and_then(|year| as_of.year().checked_sub(year));

    // Same for a zero score: it reads as "no score on file".
    let primary_fico = application
        .guarantors
        .first()
        .and_then(|guarantor| guarantor.fico_score)
        .filter(|score| *score != 0);

    let mut record = Record::new();
    record.insert("equipment_age".to_string(), equipment_age.into());
    record.insert("primary_fico".to_string(), primary_fico.into());
    // Reserved: fixed obligation to income ratio is not computed yet.
    record.insert("foir".to_string(), FieldValue::Null);
    record
}
