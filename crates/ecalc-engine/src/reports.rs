//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::json;
use strum::IntoEnumIterator;
use tracing::info;

use crate::{api::Calculator, errors::Result, CalcRecord, CalcSummary};

#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a CalcSummary,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a CalcSummary) -> Self {
        Self { summary }
    }

    /// Writes one envelope per calculator family present in the batch plus
    /// `summary.json`, returning the paths written.
    pub fn export_all(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.summary.timestamp.to_rfc3339();
        let edition = self.summary.regulations_edition.as_str();
        let mut written = Vec::new();

        for calculator in Calculator::iter() {
            let records: Vec<&CalcRecord> = self
                .summary
                .records
                .iter()
                .filter(|r| r.calculator == calculator)
                .collect();
            if records.is_empty() {
                continue;
            }
            let envelope = ReportEnvelope {
                timestamp: &timestamp,
                run_id: self.summary.run_id.to_string(),
                regulations_edition: edition,
                schema: family_schema(calculator),
                data: &records,
            };
            let path = output_dir.join(format!("{calculator}.json"));
            write_json(&path, &envelope)?;
            written.push(path);
        }

        let summary = ReportEnvelope {
            timestamp: &timestamp,
            run_id: self.summary.run_id.to_string(),
            regulations_edition: edition,
            schema: summary_schema(),
            data: &self.summary.counts,
        };
        let path = output_dir.join("summary.json");
        write_json(&path, &summary)?;
        written.push(path);

        info!(
            "{} reports exported to {}",
            written.len(),
            output_dir.display()
        );
        Ok(written)
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    run_id: String,
    regulations_edition: &'a str,
    schema: serde_json::Value,
    data: &'a T,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn assessment_properties() -> serde_json::Value {
    json!({
        "status": {"enum": ["compliant", "review_required", "non_compliant"]},
        "checks": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "rule": {"type": "string"},
                    "value": {"type": "number"},
                    "threshold": {"type": "number"},
                    "passed": {"type": "boolean"},
                    "severity": {"type": "string"}
                },
                "required": ["rule", "value", "threshold", "passed", "severity"]
            }
        },
        "advisories": {"type": "array", "items": {"type": "string"}}
    })
}

fn family_figures(calculator: Calculator) -> (&'static str, Vec<&'static str>) {
    match calculator {
        Calculator::MotorStarting => (
            "MotorStartingReport",
            vec![
                "full_load_current_a",
                "starting_current_a",
                "running_drop_percent",
                "starting_drop_percent",
            ],
        ),
        Calculator::RingCircuit => (
            "RingCircuitReport",
            vec!["r1_ohm", "rn_ohm", "r2_ohm", "r1_plus_r2_ohm"],
        ),
        Calculator::VoltageDrop => (
            "VoltageDropReport",
            vec!["mv_per_a_per_m", "drop_v", "drop_percent"],
        ),
        Calculator::CableSizing => (
            "CableSizingReport",
            vec!["required_tabulated_a", "factors"],
        ),
        Calculator::Adiabatic => (
            "AdiabaticReport",
            vec!["k", "let_through_i2t", "minimum_csa_mm2"],
        ),
        Calculator::EarthFaultLoop => (
            "EarthFaultLoopReport",
            vec!["zs_ohm", "corrected_max_zs_ohm", "prospective_fault_current_a"],
        ),
    }
}

fn family_schema(calculator: Calculator) -> serde_json::Value {
    let (title, figures) = family_figures(calculator);
    let mut required = figures;
    required.extend(["status", "checks", "advisories"]);
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": title,
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "index": {"type": "integer"},
                "reference": {"type": ["string", "null"]},
                "calculator": {"const": calculator.to_string()},
                "outcome": {
                    "type": ["object", "null"],
                    "properties": assessment_properties(),
                    "required": required
                },
                "error": {"type": ["string", "null"]}
            },
            "required": ["index", "calculator", "outcome"]
        }
    })
}

fn summary_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "CalcSummary",
        "type": "object",
        "properties": {
            "total": {"type": "integer"},
            "compliant": {"type": "integer"},
            "review_required": {"type": "integer"},
            "non_compliant": {"type": "integer"},
            "rejected": {"type": "integer"}
        },
        "required": ["total", "compliant", "review_required", "non_compliant", "rejected"]
    })
}
