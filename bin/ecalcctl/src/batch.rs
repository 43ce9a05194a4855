//! ---
//! ecalc_section: "04-interfaces"
//! ecalc_subsection: "binary"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Command-line front end for the calculation engine."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ecalc_engine::{
    analyze_batch_with_options, io::load_jobs, model::ComplianceStatus, regulations::Regulations,
    CalcSummary,
};
use ecalc_logging::{log_calc_event, CalcEventOutcome, LogContext};
use serde_json::json;

/// Run every request in a JSON, YAML or JSON-lines file.
#[derive(Debug, Args)]
pub struct BatchCommand {
    /// Request file (`.json`, `.yaml`, `.jsonl`).
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Report directory; defaults to `reports.directory` from configuration.
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Skip writing report files.
    #[arg(long = "no-export", conflicts_with = "output_dir")]
    no_export: bool,

    /// Print every record instead of the counts only.
    #[arg(long)]
    full: bool,

    /// Exit with status 2 unless every job is compliant.
    #[arg(long = "fail-on-noncompliant")]
    fail_on_noncompliant: bool,
}

impl BatchCommand {
    /// Returns `true` when the batch should count as a failure.
    pub fn execute(self, regs: &Regulations, default_output: PathBuf) -> Result<bool> {
        let jobs = load_jobs(&self.file)
            .with_context(|| format!("unable to load requests from {}", self.file.display()))?;

        let output_dir = if self.no_export {
            None
        } else {
            Some(self.output_dir.unwrap_or(default_output))
        };

        let summary = analyze_batch_with_options(&jobs, regs, output_dir.as_deref())
            .context("batch run failed")?;

        report_outcome(&summary);

        let printed = if self.full {
            serde_json::to_value(&summary)?
        } else {
            json!({
                "run_id": summary.run_id,
                "regulations_edition": summary.regulations_edition,
                "counts": summary.counts,
                "reports": output_dir,
            })
        };
        println!("{}", serde_json::to_string_pretty(&printed)?);

        Ok(self.fail_on_noncompliant && summary.worst_status() != ComplianceStatus::Compliant)
    }
}

fn report_outcome(summary: &CalcSummary) {
    let run_id = summary.run_id.to_string();
    let ctx = LogContext::new()
        .with_job(&run_id)
        .with_edition(&summary.regulations_edition);
    let counts = &summary.counts;
    let message = format!(
        "{} job(s): {} compliant, {} review, {} non-compliant, {} rejected",
        counts.total,
        counts.compliant,
        counts.review_required,
        counts.non_compliant,
        counts.rejected
    );
    let outcome = if counts.all_compliant() {
        CalcEventOutcome::Compliant
    } else {
        CalcEventOutcome::Flagged
    };
    log_calc_event(Some(&ctx), "calc.batch", &message, outcome);
}
