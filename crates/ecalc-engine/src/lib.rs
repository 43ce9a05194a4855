//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
pub mod adiabatic;
pub mod api;
pub mod cable_data;
pub mod cable_sizing;
pub mod derating;
pub mod earth_fault_loop;
pub mod errors;
pub mod io;
pub mod model;
pub mod motor_starting;
pub mod regulations;
pub mod reports;
pub mod ring_circuit;
pub mod voltage_drop;

mod validation;

use chrono::{DateTime, Utc};
use ecalc_logging::{calc_debug, calc_warn, LogContext};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    api::{run_request, Calculator},
    model::ComplianceStatus,
    regulations::Regulations,
    reports::ReportExporter,
};

pub use api::{CalcJob, CalcOutcome, CalcRequest};
pub use errors::{CalcEngineError, Result};

/// One job of a batch. `outcome` is absent when the input was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcRecord {
    pub index: usize,
    #[serde(default)]
    pub reference: Option<String>,
    pub calculator: Calculator,
    #[serde(default)]
    pub outcome: Option<CalcOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub compliant: usize,
    pub review_required: usize,
    pub non_compliant: usize,
    pub rejected: usize,
}

impl StatusCounts {
    fn record(&mut self, status: Option<ComplianceStatus>) {
        self.total += 1;
        match status {
            Some(ComplianceStatus::Compliant) => self.compliant += 1,
            Some(ComplianceStatus::ReviewRequired) => self.review_required += 1,
            Some(ComplianceStatus::NonCompliant) => self.non_compliant += 1,
            None => self.rejected += 1,
        }
    }

    /// True when every job ran and every check passed.
    pub fn all_compliant(&self) -> bool {
        self.compliant == self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcSummary {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub regulations_edition: String,
    pub records: Vec<CalcRecord>,
    pub counts: StatusCounts,
}

impl CalcSummary {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }

    /// Worst status across the batch; rejected jobs count as non-compliant.
    pub fn worst_status(&self) -> ComplianceStatus {
        self.records
            .iter()
            .map(|r| {
                r.outcome
                    .as_ref()
                    .map_or(ComplianceStatus::NonCompliant, CalcOutcome::status)
            })
            .max()
            .unwrap_or(ComplianceStatus::Compliant)
    }
}

/// Runs every job without exporting reports.
pub fn analyze_batch(jobs: &[CalcJob], regs: &Regulations) -> Result<CalcSummary> {
    analyze_batch_with_options(jobs, regs, None)
}

/// Runs every job and, when `output_dir` is given, exports one report per
/// calculator family plus a summary into it.
///
/// Jobs with invalid input are recorded as rejected and do not stop the batch.
/// I/O and serialization failures do.
pub fn analyze_batch_with_options(
    jobs: &[CalcJob],
    regs: &Regulations,
    output_dir: Option<&std::path::Path>,
) -> Result<CalcSummary> {
    let run_id = Uuid::new_v4();
    let run_label = run_id.to_string();
    info!(
        "Running {} calculation(s) against {}",
        jobs.len(),
        regs.edition
    );

    let mut records = Vec::with_capacity(jobs.len());
    let mut counts = StatusCounts::default();

    for (index, job) in jobs.iter().enumerate() {
        let calculator = job.request.calculator();
        let calculator_name = calculator.to_string();
        let ctx = LogContext::new()
            .with_job(&run_label)
            .with_circuit(job.reference.as_deref().unwrap_or(""))
            .with_calculator(&calculator_name)
            .with_edition(&regs.edition);

        let record = match run_request(&job.request, regs) {
            Ok(outcome) => {
                calc_debug!(context = ctx, "job {index} {}", outcome.status());
                counts.record(Some(outcome.status()));
                CalcRecord {
                    index,
                    reference: job.reference.clone(),
                    calculator,
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(err) if err.is_input_error() => {
                calc_warn!(context = ctx, "job {index} rejected: {err}");
                counts.record(None);
                CalcRecord {
                    index,
                    reference: job.reference.clone(),
                    calculator,
                    outcome: None,
                    error: Some(err.to_string()),
                }
            }
            Err(err) => return Err(err),
        };
        records.push(record);
    }

    let summary = CalcSummary {
        run_id,
        timestamp: Utc::now(),
        regulations_edition: regs.edition.clone(),
        records,
        counts,
    };

    if let Some(output_dir) = output_dir {
        summary.exporter().export_all(output_dir)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        motor_starting::{MotorStartingInput, StartingMethod},
        ring_circuit::RingCircuitInput,
    };

    fn motor(power_kw: f64) -> CalcRequest {
        CalcRequest::MotorStarting(MotorStartingInput {
            power_kw,
            voltage_v: 400.0,
            phase: model::Phase::Three,
            efficiency: 0.85,
            power_factor: 0.85,
            starting_method: StartingMethod::StarDelta,
            starting_multiplier_override: None,
            start_duration_s: 5.0,
            cable: None,
        })
    }

    #[test]
    fn analyze_batch_pipeline() {
        let jobs = vec![
            CalcJob {
                reference: Some("pump".into()),
                request: motor(15.0),
            },
            CalcJob::from(CalcRequest::RingCircuit(RingCircuitInput {
                r1_end_to_end: 1.2,
                rn_end_to_end: 1.2,
                r2_end_to_end: 1.92,
                live_csa_mm2: None,
                cpc_csa_mm2: None,
                socket_readings: Vec::new(),
                ze_ohm: None,
                device: None,
            })),
            CalcJob::from(motor(-1.0)),
        ];

        let dir = tempfile::tempdir().unwrap();
        let summary =
            analyze_batch_with_options(&jobs, &Regulations::default(), Some(dir.path())).unwrap();

        assert_eq!(summary.counts.total, 3);
        assert_eq!(summary.counts.rejected, 1);
        assert_eq!(summary.records[0].reference.as_deref(), Some("pump"));
        assert!(summary.records[2].error.is_some());
        assert_eq!(summary.worst_status(), ComplianceStatus::NonCompliant);
        assert!(dir.path().join("motor_starting.json").exists());
        assert!(dir.path().join("ring_circuit.json").exists());
        assert!(dir.path().join("summary.json").exists());
        assert!(!dir.path().join("voltage_drop.json").exists());
    }

    #[test]
    fn empty_batch_is_compliant() {
        let summary = analyze_batch(&[], &Regulations::default()).unwrap();
        assert!(summary.counts.all_compliant());
        assert_eq!(summary.worst_status(), ComplianceStatus::Compliant);
    }
}
