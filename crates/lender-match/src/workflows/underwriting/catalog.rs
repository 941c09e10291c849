use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{
    CatalogEntry, Lender, LenderId, LenderPolicy, LenderProgram, LenderProgramId,
};

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Json(serde_json::Error),
    UnknownLender {
        program: LenderProgramId,
        lender: LenderId,
    },
    UnknownProgram {
        program: LenderProgramId,
    },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "failed to read policy catalog: {}", err),
            CatalogError::Json(err) => write!(f, "invalid policy catalog JSON: {}", err),
            CatalogError::UnknownLender { program, lender } => write!(
                f,
                "program {} references unknown lender {}",
                program.0, lender.0
            ),
            CatalogError::UnknownProgram { program } => {
                write!(f, "policy references unknown program {}", program.0)
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Json(err) => Some(err),
            CatalogError::UnknownLender { .. } | CatalogError::UnknownProgram { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

const BUNDLED_CATALOG: &str = include_str!("../../../data/lender_catalog.json");

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    lenders: Vec<Lender>,
    programs: Vec<LenderProgram>,
    policies: Vec<LenderPolicy>,
}

/// Lender policy configuration, flattened to one entry per policy in document order.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    entries: Vec<CatalogEntry>,
}

impl PolicyCatalog {
    /// Sample catalog shipped with the crate, used when no catalog path is configured.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_reader(BUNDLED_CATALOG.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a `{ "lenders", "programs", "policies" }` document. Rule types are not
    /// validated here; unknown ones surface as failed results at evaluation time.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;

        let lenders: HashMap<LenderId, Lender> = document
            .lenders
            .into_iter()
            .map(|lender| (lender.id, lender))
            .collect();

        let mut programs = HashMap::new();
        for program in document.programs {
            if !lenders.contains_key(&program.lender_id) {
                return Err(CatalogError::UnknownLender {
                    program: program.id,
                    lender: program.lender_id,
                });
            }
            programs.insert(program.id, program);
        }

        let mut entries = Vec::with_capacity(document.policies.len());
        for policy in document.policies {
            let program = programs
                .get(&policy.lender_program_id)
                .cloned()
                .ok_or(CatalogError::UnknownProgram {
                    program: policy.lender_program_id,
                })?;
            let lender = lenders
                .get(&program.lender_id)
                .cloned()
                .ok_or(CatalogError::UnknownLender {
                    program: program.id,
                    lender: program.lender_id,
                })?;

            entries.push(CatalogEntry {
                lender,
                program,
                policy,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CATALOG: &str = r#"{
        "lenders": [{ "id": 1, "name": "Apex Equipment Finance" }],
        "programs": [{
            "id": 10, "lender_id": 1, "name": "Standard A",
            "min_amount": 10000, "max_amount": 500000,
            "min_term_months": 24, "max_term_months": 60
        }],
        "policies": [{
            "id": 100, "lender_program_id": 10,
            "policy_json": {
                "hard_rules": {
                    "logic": "ALL",
                    "rules": [{
                        "id": "fico_650", "type": "min_value",
                        "field": "guarantor.primary.fico_score",
                        "params": { "min": 650 }, "severity": "HARD",
                        "message": "FICO must be 650+"
                    }]
                },
                "scoring_config": {
                    "base_score": 100, "min_accept_score": 60,
                    "deductions": [{ "ruleId": "ideal_fico_700", "points": 10 }]
                }
            }
        }]
    }"#;

    #[test]
    fn joins_policies_with_programs_and_lenders() {
        let catalog = PolicyCatalog::from_reader(Cursor::new(CATALOG)).expect("catalog parses");

        assert_eq!(catalog.len(), 1);
        let entry = &catalog.entries()[0];
        assert_eq!(entry.lender.name, "Apex Equipment Finance");
        assert!(entry.lender.active, "lenders default to active");
        assert_eq!(entry.program.name, "Standard A");
        assert_eq!(entry.policy.version, 1);
        assert!(entry.policy.is_active);
        assert_eq!(entry.policy.policy.hard_rules.rules().len(), 1);
        assert_eq!(entry.policy.policy.scoring_config.deductions[0].points, 10.0);
    }

    #[test]
    fn rejects_policies_for_unknown_programs() {
        let raw = CATALOG.replace("\"lender_program_id\": 10", "\"lender_program_id\": 99");

        match PolicyCatalog::from_reader(Cursor::new(raw)) {
            Err(CatalogError::UnknownProgram { program }) => assert_eq!(program.0, 99),
            other => panic!("expected unknown program error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_programs_for_unknown_lenders() {
        let raw = CATALOG.replace("\"lender_id\": 1", "\"lender_id\": 7");

        match PolicyCatalog::from_reader(Cursor::new(raw)) {
            Err(CatalogError::UnknownLender { lender, .. }) => assert_eq!(lender.0, 7),
            other => panic!("expected unknown lender error, got {other:?}"),
        }
    }

    #[test]
    fn bundled_catalog_parses() {
        let catalog = PolicyCatalog::bundled().expect("bundled catalog parses");

        assert_eq!(catalog.len(), 10);
        let matchable = catalog
            .entries()
            .iter()
            .filter(|entry| entry.is_eligible_for_matching())
            .count();
        assert_eq!(matchable, 8);
    }

    #[test]
    fn surfaces_malformed_json() {
        assert!(matches!(
            PolicyCatalog::from_reader(Cursor::new("{ not json")),
            Err(CatalogError::Json(_))
        ));
    }
}
