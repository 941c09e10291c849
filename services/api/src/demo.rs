use crate::infra::{load_catalog, read_json, sample_application};
use chrono::{Local, NaiveDate};
use clap::Args;
use lender_match::error::AppError;
use lender_match::workflows::underwriting::{
    ApplicationProfile, CatalogEntry, InMemoryUnderwritingRepository, LenderId, LenderProgramId,
    LoanApplication, MatchRunView, Policy, PolicyEngine, PolicyEvaluation, RuleResult,
    UnderwritingError, UnderwritingService,
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Policy JSON document (`hard_rules`, `soft_rules`, `scoring_config`)
    #[arg(long)]
    pub(crate) policy: PathBuf,
    /// Loan application JSON document
    #[arg(long)]
    pub(crate) application: PathBuf,
    /// Date used for derived fields such as equipment age (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Lender id echoed in the verdict
    #[arg(long, default_value_t = 0)]
    pub(crate) lender_id: i64,
    /// Lender program id echoed in the verdict
    #[arg(long, default_value_t = 0)]
    pub(crate) program_id: i64,
    /// Print the verdict as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Primary guarantor FICO score for the sample application
    #[arg(long, default_value_t = 712)]
    pub(crate) fico: u32,
    /// Date used for derived fields (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Policy catalog JSON (defaults to the bundled catalog)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        policy,
        application,
        as_of,
        lender_id,
        program_id,
        json,
    } = args;

    let policy: Policy = read_json(&policy)?;
    let application: LoanApplication = read_json(&application)?;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    let profile = ApplicationProfile::build(&application, as_of);
    let evaluation = PolicyEngine::new().evaluate(
        &policy,
        LenderId(lender_id),
        LenderProgramId(program_id),
        &profile,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print!("{}", render_evaluation(&evaluation));
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        fico,
        as_of,
        catalog,
    } = args;

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let catalog = load_catalog(catalog.as_deref())?;
    let entries = catalog.entries().to_vec();

    let repository = Arc::new(InMemoryUnderwritingRepository::with_catalog(catalog));
    let application = sample_application(fico);
    let loan_request_id = application.loan_request.id;
    repository
        .add_application(application)
        .map_err(UnderwritingError::from)?;

    let service = UnderwritingService::new(repository);
    let view = service.run_as_of(loan_request_id, as_of)?;

    println!("Lender matching demo");
    println!(
        "Sample application: Cedar Ridge Construction, $85,000 excavator, guarantor FICO {fico}"
    );
    print!("{}", render_run_report(&view, &entries));
    Ok(())
}

fn program_labels(entries: &[CatalogEntry]) -> HashMap<LenderProgramId, String> {
    entries
        .iter()
        .map(|entry| {
            (
                entry.program.id,
                format!("{} / {}", entry.lender.name, entry.program.name),
            )
        })
        .collect()
}

/// Ranked text report: eligible programs by fit score, then declined programs with reasons.
pub(crate) fn render_run_report(view: &MatchRunView, entries: &[CatalogEntry]) -> String {
    let labels = program_labels(entries);
    let label = |id: LenderProgramId| {
        labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("program {}", id.0))
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\nRun {} for loan request {}: {} ({} of {} programs eligible)",
        view.id,
        view.loan_request_id,
        view.status,
        view.eligible_count,
        view.results.len()
    );

    let ranked = view.ranked_matches();
    if ranked.is_empty() {
        let _ = writeln!(out, "\nNo eligible programs.");
    } else {
        let _ = writeln!(out, "\nEligible programs:");
        for (position, result) in ranked.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {:<45} fit {:>5.1}",
                position + 1,
                label(result.lender_program_id),
                result.fit_score.unwrap_or_default()
            );
            for reason in &result.reasons {
                let _ = writeln!(out, "       - {reason}");
            }
        }
    }

    let declined: Vec<_> = view.results.iter().filter(|result| !result.eligible).collect();
    if !declined.is_empty() {
        let _ = writeln!(out, "\nDeclined programs:");
        for result in declined {
            let _ = writeln!(out, "  - {}", label(result.lender_program_id));
            for reason in &result.reasons {
                let _ = writeln!(out, "       {reason}");
            }
        }
    }

    out
}

pub(crate) fn render_evaluation(evaluation: &PolicyEvaluation) -> String {
    let mut out = String::new();
    let verdict = if evaluation.eligible {
        "ELIGIBLE"
    } else {
        "DECLINED"
    };
    let fit = evaluation
        .fit_score
        .map(|score| format!("{score:.1}"))
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(out, "Verdict: {verdict} (fit score {fit})");

    let _ = writeln!(out, "\nHard rules:");
    render_rule_lines(&mut out, &evaluation.hard_rule_results);
    if !evaluation.soft_rule_results.is_empty() {
        let _ = writeln!(out, "\nSoft rules:");
        render_rule_lines(&mut out, &evaluation.soft_rule_results);
    }

    if !evaluation.reasons.is_empty() {
        let _ = writeln!(out, "\nReasons:");
        for reason in &evaluation.reasons {
            let _ = writeln!(out, "  - {reason}");
        }
    }
    out
}

fn render_rule_lines(out: &mut String, results: &[RuleResult]) {
    for result in results {
        let outcome = if result.passed { "PASS" } else { "FAIL" };
        let field = result.field.as_deref().unwrap_or("-");
        let actual = result
            .actual
            .as_ref()
            .and_then(|value| serde_json::to_string(value).ok())
            .unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            out,
            "  [{outcome}] {:<4} {:<24} {field} = {actual}",
            result.severity.label(),
            result.rule_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lender_match::workflows::underwriting::{LoanRequestId, PolicyCatalog};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn demo_view(fico: u32) -> (MatchRunView, Vec<CatalogEntry>) {
        let catalog = PolicyCatalog::bundled().expect("bundled catalog parses");
        let entries = catalog.entries().to_vec();
        let repository = Arc::new(InMemoryUnderwritingRepository::with_catalog(catalog));
        repository
            .add_application(sample_application(fico))
            .expect("sample stored");
        let view = UnderwritingService::new(repository)
            .run_as_of(LoanRequestId(1), as_of())
            .expect("run completes");
        (view, entries)
    }

    #[test]
    fn run_report_lists_best_fit_first() {
        let (view, entries) = demo_view(712);

        let report = render_run_report(&view, &entries);

        assert!(report.contains("5 of 8 programs eligible"));
        let first = report
            .find("1. Apex Equipment Finance / Standard A")
            .expect("best fit listed first");
        let falcon = report
            .find("Falcon Equipment Finance / Standard Program")
            .expect("falcon listed");
        assert!(first < falcon);
        assert!(report.contains("Ideal PayNet 700+"));
        assert!(report.contains("FICO must be 720+"));
        assert!(!report.contains("Advantage+"));
    }

    #[test]
    fn run_report_handles_no_matches() {
        let (view, entries) = demo_view(600);

        let report = render_run_report(&view, &entries);

        assert!(report.contains("No eligible programs."));
        assert!(report.contains("Declined programs:"));
    }

    #[test]
    fn evaluation_summary_shows_rule_outcomes() {
        let catalog = PolicyCatalog::bundled().expect("bundled catalog parses");
        let entry = catalog
            .entries()
            .iter()
            .find(|entry| entry.program.id == LenderProgramId(14))
            .expect("prime program present");
        let profile = ApplicationProfile::build(&sample_application(712), as_of());

        let evaluation = PolicyEngine::new().evaluate(
            &entry.policy.policy,
            entry.lender.id,
            entry.program.id,
            &profile,
        );
        let summary = render_evaluation(&evaluation);

        assert!(summary.starts_with("Verdict: DECLINED (fit score n/a)"));
        assert!(summary.contains("[FAIL] HARD fico_720"));
        assert!(summary.contains("guarantor.primary.fico_score = 712.0"));
        assert!(summary.contains("  - FICO must be 720+"));
    }
}
