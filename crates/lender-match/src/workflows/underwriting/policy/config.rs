use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a failing rule disqualifies the program or only costs score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Hard,
    Soft,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Hard => "HARD",
            Severity::Soft => "SOFT",
        }
    }
}

/// Declared combinator of a rule group.
///
/// Carried for schema compatibility only: group results are flattened and gated on
/// severity, so `Any` does not relax a hard group today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupLogic {
    #[default]
    All,
    Any,
}

/// Closed vocabulary of rule types understood by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    MinValue,
    MaxValue,
    InSet,
    NotInSet,
    BooleanIsTrue,
    Range,
    Unknown(String),
}

impl RuleKind {
    /// Case-insensitive lookup; anything outside the vocabulary is kept as `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "MIN_VALUE" => RuleKind::MinValue,
            "MAX_VALUE" => RuleKind::MaxValue,
            "IN_SET" => RuleKind::InSet,
            "NOT_IN_SET" => RuleKind::NotInSet,
            "BOOLEAN_IS_TRUE" => RuleKind::BooleanIsTrue,
            "RANGE" => RuleKind::Range,
            _ => RuleKind::Unknown(raw.to_string()),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::MinValue => f.write_str("MIN_VALUE"),
            RuleKind::MaxValue => f.write_str("MAX_VALUE"),
            RuleKind::InSet => f.write_str("IN_SET"),
            RuleKind::NotInSet => f.write_str("NOT_IN_SET"),
            RuleKind::BooleanIsTrue => f.write_str("BOOLEAN_IS_TRUE"),
            RuleKind::Range => f.write_str("RANGE"),
            RuleKind::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Atomic predicate over one profile field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub severity: Severity,
    pub message: String,
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        RuleKind::parse(&self.rule_type)
    }
}

/// Node of a rule tree: leaf rules first, then nested groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleGroup {
    #[serde(default)]
    pub logic: GroupLogic,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub groups: Option<Vec<RuleGroup>>,
}

impl RuleGroup {
    pub fn rules(&self) -> &[Rule] {
        self.rules.as_deref().unwrap_or_default()
    }

    pub fn groups(&self) -> &[RuleGroup] {
        self.groups.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules().is_empty() && self.groups().is_empty()
    }
}

/// Points removed from the base score when the referenced soft rule fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
    #[serde(rename = "ruleId", alias = "rule_id")]
    pub rule_id: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    #[serde(default = "default_min_accept_score")]
    pub min_accept_score: f64,
    #[serde(default)]
    pub deductions: Vec<Deduction>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            min_accept_score: default_min_accept_score(),
            deductions: Vec::new(),
        }
    }
}

/// Declarative lender policy: a hard-rule gate, optional soft rules and the scoring table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub hard_rules: RuleGroup,
    #[serde(default)]
    pub soft_rules: Option<RuleGroup>,
    #[serde(default)]
    pub scoring_config: ScoringConfig,
}

fn default_base_score() -> f64 {
    100.0
}

fn default_min_accept_score() -> f64 {
    60.0
}
