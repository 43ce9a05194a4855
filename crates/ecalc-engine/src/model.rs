//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    #[default]
    Single,
    Three,
}

impl Phase {
    /// Factor linking line voltage and current to apparent power.
    pub fn power_factor_multiplier(&self) -> f64 {
        match self {
            Phase::Single => 1.0,
            Phase::Three => 3.0f64.sqrt(),
        }
    }

    /// Scaling applied to tabulated two-core mV/A/m figures.
    pub fn tabulated_drop_multiplier(&self) -> f64 {
        match self {
            Phase::Single => 1.0,
            Phase::Three => 3.0f64.sqrt() / 2.0,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CircuitKind {
    Lighting,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConductorMaterial {
    Copper,
    Aluminium,
}

/// Conductor insulation, named after its maximum operating temperature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Insulation {
    Thermoplastic70,
    Thermosetting90,
}

/// Discrete classification, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    ReviewRequired,
    NonCompliant,
}

impl ComplianceStatus {
    pub fn is_compliant(&self) -> bool {
        matches!(self, ComplianceStatus::Compliant)
    }
}

/// Outcome of one tolerance rule applied to one computed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub rule: String,
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
    /// Status applied to the result when the check fails.
    pub severity: ComplianceStatus,
}

impl CheckOutcome {
    pub fn status(&self) -> ComplianceStatus {
        if self.passed {
            ComplianceStatus::Compliant
        } else {
            self.severity
        }
    }
}

/// Classification half of every calculator result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub status: ComplianceStatus,
    pub checks: Vec<CheckOutcome>,
    pub advisories: Vec<String>,
}

impl Assessment {
    pub fn new(checks: Vec<CheckOutcome>, advisories: Vec<String>) -> Self {
        let status = checks
            .iter()
            .map(CheckOutcome::status)
            .max()
            .unwrap_or(ComplianceStatus::Compliant);
        Self {
            status,
            checks,
            advisories,
        }
    }

    pub fn check(&self, rule: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.rule == rule)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(passed: bool, severity: ComplianceStatus) -> CheckOutcome {
        CheckOutcome {
            rule: "r".into(),
            value: 1.0,
            threshold: 1.0,
            passed,
            severity,
        }
    }

    #[test]
    fn assessment_takes_worst_status() {
        let assessment = Assessment::new(
            vec![
                outcome(true, ComplianceStatus::NonCompliant),
                outcome(false, ComplianceStatus::ReviewRequired),
            ],
            Vec::new(),
        );
        assert_eq!(assessment.status, ComplianceStatus::ReviewRequired);
        assert_eq!(assessment.failed().count(), 1);
    }

    #[test]
    fn empty_assessment_is_compliant() {
        assert!(Assessment::new(Vec::new(), Vec::new())
            .status
            .is_compliant());
    }

    #[test]
    fn three_phase_multipliers() {
        assert!((Phase::Three.power_factor_multiplier() - 1.732_050_8).abs() < 1e-6);
        assert!((Phase::Three.tabulated_drop_multiplier() - 0.866_025_4).abs() < 1e-6);
        assert_eq!(Phase::Single.tabulated_drop_multiplier(), 1.0);
    }
}
