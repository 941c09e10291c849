use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::super::profile::{ApplicationProfile, FieldValue};
use super::config::{Rule, RuleGroup, RuleKind, Severity};
use super::fields;

/// Evidence for one evaluated rule, kept for audit and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub passed: bool,
    pub severity: Severity,
    /// Empty when the rule passed.
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
    /// Description of the passing condition; only set on failure.
    #[serde(default)]
    pub expected: Option<Value>,
    /// Resolved value at evaluation time, `None` when the field had no value.
    #[serde(default)]
    pub actual: Option<FieldValue>,
}

impl RuleResult {
    pub fn is_hard_failure(&self) -> bool {
        !self.passed && self.severity == Severity::Hard
    }
}

/// Evaluates a rule tree into a flat, ordered list of results.
///
/// This is the seam the policy engine calls through, so alternative evaluators
/// (instrumented or otherwise) can be swapped in.
pub trait RuleSetEvaluator: Send + Sync {
    fn evaluate_group(&self, group: &RuleGroup, profile: &ApplicationProfile) -> Vec<RuleResult>;
}

/// Depth-first evaluator: a group's own rules in order, then each child group in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTreeEvaluator;

impl RuleSetEvaluator for RuleTreeEvaluator {
    fn evaluate_group(&self, group: &RuleGroup, profile: &ApplicationProfile) -> Vec<RuleResult> {
        evaluate_group(group, profile)
    }
}

/// Flatten every leaf result of `group`. The group's `logic` is not applied here;
/// gating happens on severity over the whole flattened list.
pub fn evaluate_group(group: &RuleGroup, profile: &ApplicationProfile) -> Vec<RuleResult> {
    let mut results = Vec::new();
    collect_group(group, profile, &mut results);
    results
}

fn collect_group(group: &RuleGroup, profile: &ApplicationProfile, results: &mut Vec<RuleResult>) {
    results.extend(group.rules().iter().map(|rule| evaluate_rule(rule, profile)));
    for child in group.groups() {
        collect_group(child, profile, results);
    }
}

enum Verdict {
    Pass,
    Fail(Value),
    /// The rule itself cannot be evaluated (unknown type, bad params).
    Invalid(String),
}

/// Evaluate one rule. Never panics or errors: configuration problems come back as a
/// failed result carrying an explanatory message.
pub fn evaluate_rule(rule: &Rule, profile: &ApplicationProfile) -> RuleResult {
    let actual = fields::resolve(profile, rule.field.as_deref());
    let kind = rule.kind();
    let params = &rule.params;

    let verdict = match &kind {
        RuleKind::MinValue => min_value(&kind, params, actual),
        RuleKind::MaxValue => max_value(&kind, params, actual),
        RuleKind::InSet => in_set(&kind, params, actual),
        RuleKind::NotInSet => not_in_set(&kind, params, actual),
        RuleKind::BooleanIsTrue => boolean_is_true(actual),
        RuleKind::Range => range(&kind, params, actual),
        RuleKind::Unknown(raw) => Verdict::Invalid(format!("Unknown rule type {raw}")),
    };

    let actual = actual.cloned();
    match verdict {
        Verdict::Pass => RuleResult {
            rule_id: rule.id.clone(),
            passed: true,
            severity: rule.severity,
            message: String::new(),
            field: rule.field.clone(),
            expected: None,
            actual,
        },
        Verdict::Fail(expected) => RuleResult {
            rule_id: rule.id.clone(),
            passed: false,
            severity: rule.severity,
            message: rule.message.clone(),
            field: rule.field.clone(),
            expected: Some(expected),
            actual,
        },
        Verdict::Invalid(message) => RuleResult {
            rule_id: rule.id.clone(),
            passed: false,
            severity: rule.severity,
            message,
            field: rule.field.clone(),
            expected: None,
            actual,
        },
    }
}

fn min_value(kind: &RuleKind, params: &Map<String, Value>, actual: Option<&FieldValue>) -> Verdict {
    let (raw_min, min) = match number_param(kind, params, "min") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };

    match actual.and_then(FieldValue::as_number) {
        Some(value) if value >= min => Verdict::Pass,
        _ => Verdict::Fail(json!({ ">=": raw_min })),
    }
}

fn max_value(kind: &RuleKind, params: &Map<String, Value>, actual: Option<&FieldValue>) -> Verdict {
    let (raw_max, max) = match number_param(kind, params, "max") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };

    match actual.and_then(FieldValue::as_number) {
        Some(value) if value <= max => Verdict::Pass,
        _ => Verdict::Fail(json!({ "<=": raw_max })),
    }
}

fn in_set(kind: &RuleKind, params: &Map<String, Value>, actual: Option<&FieldValue>) -> Verdict {
    let (raw_allowed, allowed) = match list_param(kind, params, "allowed") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };

    match actual {
        Some(value) if allowed.contains(value) => Verdict::Pass,
        _ => Verdict::Fail(json!({ "in": raw_allowed })),
    }
}

/// Absence counts as "not blocked".
fn not_in_set(kind: &RuleKind, params: &Map<String, Value>, actual: Option<&FieldValue>) -> Verdict {
    let (raw_blocked, blocked) = match list_param(kind, params, "blocked") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };

    match actual {
        Some(value) if blocked.contains(value) => Verdict::Fail(json!({ "not_in": raw_blocked })),
        _ => Verdict::Pass,
    }
}

fn boolean_is_true(actual: Option<&FieldValue>) -> Verdict {
    if actual.map(FieldValue::is_truthy).unwrap_or(false) {
        Verdict::Pass
    } else {
        Verdict::Fail(Value::Bool(true))
    }
}

fn range(kind: &RuleKind, params: &Map<String, Value>, actual: Option<&FieldValue>) -> Verdict {
    let (raw_min, min) = match number_param(kind, params, "min") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };
    let (raw_max, max) = match number_param(kind, params, "max") {
        Ok(param) => param,
        Err(invalid) => return invalid,
    };

    match actual.and_then(FieldValue::as_number) {
        Some(value) if min <= value && value <= max => Verdict::Pass,
        _ => Verdict::Fail(json!({ "between": [raw_min, raw_max] })),
    }
}

fn number_param(
    kind: &RuleKind,
    params: &Map<String, Value>,
    name: &str,
) -> Result<(Value, f64), Verdict> {
    params
        .get(name)
        .and_then(|raw| raw.as_f64().map(|number| (raw.clone(), number)))
        .ok_or_else(|| {
            Verdict::Invalid(format!(
                "Invalid {kind} rule: numeric parameter '{name}' is missing"
            ))
        })
}

fn list_param(
    kind: &RuleKind,
    params: &Map<String, Value>,
    name: &str,
) -> Result<(Value, Vec<FieldValue>), Verdict> {
    params
        .get(name)
        .and_then(|raw| {
            raw.as_array().map(|items| {
                let values = items.iter().filter_map(FieldValue::from_json).collect();
                (raw.clone(), values)
            })
        })
        .ok_or_else(|| {
            Verdict::Invalid(format!(
                "Invalid {kind} rule: list parameter '{name}' is missing"
            ))
        })
}
