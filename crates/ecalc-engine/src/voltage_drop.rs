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
use tracing::{info, warn};

use crate::{
    cable_data::CableType,
    errors::{CalcEngineError, Result},
    model::{Assessment, CircuitKind, Phase},
    regulations::Regulations,
    validation,
};

/// Where the conductor's mV/A/m figure comes from.
///
/// Explicit figures are used as given; tabulated figures are two-core values
/// and are scaled by √3/2 for three-phase circuits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ConductorDrop {
    Explicit { mv_per_a_per_m: f64 },
    Tabulated { cable_type: CableType, csa_mm2: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropInput {
    pub current_a: f64,
    pub length_m: f64,
    pub voltage_v: f64,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub circuit_kind: CircuitKind,
    pub conductor: ConductorDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropFigures {
    pub mv_per_a_per_m: f64,
    pub drop_v: f64,
    pub drop_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropResult {
    #[serde(flatten)]
    pub figures: VoltageDropFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

/// `mV/A/m × I × L / 1000`, in volts.
pub fn voltage_drop_volts(mv_per_a_per_m: f64, current_a: f64, length_m: f64) -> f64 {
    mv_per_a_per_m * current_a * length_m / 1000.0
}

pub fn drop_percent(drop_v: f64, voltage_v: f64) -> f64 {
    drop_v * 100.0 / voltage_v
}

/// Resolves the effective mV/A/m for the circuit, failing on unknown table entries.
pub fn resolve_mv_per_a_per_m(conductor: &ConductorDrop, phase: Phase) -> Result<f64> {
    match *conductor {
        ConductorDrop::Explicit { mv_per_a_per_m } => {
            validation::positive("conductor.mv_per_a_per_m", mv_per_a_per_m)?;
            Ok(mv_per_a_per_m)
        }
        ConductorDrop::Tabulated {
            cable_type,
            csa_mm2,
        } => cable_type
            .mv_per_a_per_m(csa_mm2)
            .map(|mv| mv * phase.tabulated_drop_multiplier())
            .ok_or(CalcEngineError::UnknownCableSize {
                cable: cable_type,
                csa_mm2,
            }),
    }
}

pub fn validate_voltage_drop_input(input: &VoltageDropInput) -> Result<f64> {
    validation::positive("current_a", input.current_a)?;
    validation::positive("length_m", input.length_m)?;
    validation::positive("voltage_v", input.voltage_v)?;
    resolve_mv_per_a_per_m(&input.conductor, input.phase)
}

pub fn evaluate_voltage_drop(input: &VoltageDropInput, mv_per_a_per_m: f64) -> VoltageDropFigures {
    let drop_v = voltage_drop_volts(mv_per_a_per_m, input.current_a, input.length_m);
    VoltageDropFigures {
        mv_per_a_per_m,
        drop_v,
        drop_percent: drop_percent(drop_v, input.voltage_v),
    }
}

pub fn classify_voltage_drop(
    kind: CircuitKind,
    figures: &VoltageDropFigures,
    regs: &Regulations,
) -> Assessment {
    let check = regs.voltage_drop_rule(kind).check(figures.drop_percent);
    let mut advisories = Vec::new();
    if !check.passed {
        advisories.push(format!(
            "Voltage drop {:.2}% exceeds the {:.1}% limit for {} circuits; increase the conductor size or reduce the run length",
            figures.drop_percent,
            check.threshold,
            kind
        ));
    }
    Assessment::new(vec![check], advisories)
}

pub fn calculate_voltage_drop(
    input: &VoltageDropInput,
    regs: &Regulations,
) -> Result<VoltageDropResult> {
    let mv_per_a_per_m = validate_voltage_drop_input(input)?;
    let figures = evaluate_voltage_drop(input, mv_per_a_per_m);
    let assessment = classify_voltage_drop(input.circuit_kind, &figures, regs);

    info!(
        "Voltage drop {:.2} V ({:.2}%) over {:.1} m at {:.1} A",
        figures.drop_v, figures.drop_percent, input.length_m, input.current_a
    );
    if !assessment.status.is_compliant() {
        warn!("[WARN] {}", assessment.advisories.join(", "));
    }
    Ok(VoltageDropResult {
        figures,
        assessment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComplianceStatus;

    fn lighting(mv: f64) -> VoltageDropInput {
        VoltageDropInput {
            current_a: 10.0,
            length_m: 20.0,
            voltage_v: 230.0,
            phase: Phase::Single,
            circuit_kind: CircuitKind::Lighting,
            conductor: ConductorDrop::Explicit { mv_per_a_per_m: mv },
        }
    }

    #[test]
    fn drop_exactly_at_limit_is_compliant() {
        // 34.5 × 10 × 20 / 1000 = 6.9 V = 3% of 230 V
        let result = calculate_voltage_drop(&lighting(34.5), &Regulations::default()).unwrap();
        assert_eq!(result.figures.drop_percent, 3.0);
        assert_eq!(result.assessment.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn drop_above_lighting_limit_fails() {
        let result = calculate_voltage_drop(&lighting(44.0), &Regulations::default()).unwrap();
        assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
        assert_eq!(result.assessment.advisories.len(), 1);
    }

    #[test]
    fn same_drop_passes_for_other_circuits() {
        let mut input = lighting(44.0);
        input.circuit_kind = CircuitKind::Other;
        let result = calculate_voltage_drop(&input, &Regulations::default()).unwrap();
        assert!(result.assessment.status.is_compliant());
    }

    #[test]
    fn tabulated_three_phase_is_scaled() {
        let input = VoltageDropInput {
            current_a: 32.0,
            length_m: 50.0,
            voltage_v: 400.0,
            phase: Phase::Three,
            circuit_kind: CircuitKind::Other,
            conductor: ConductorDrop::Tabulated {
                cable_type: CableType::SwaXlpe,
                csa_mm2: 6.0,
            },
        };
        let result = calculate_voltage_drop(&input, &Regulations::default()).unwrap();
        assert!((result.figures.mv_per_a_per_m - 7.3 * 0.866_025_4).abs() < 1e-6);
    }

    #[test]
    fn unknown_table_entry_is_rejected() {
        let mut input = lighting(1.0);
        input.conductor = ConductorDrop::Tabulated {
            cable_type: CableType::PvcTwinEarth,
            csa_mm2: 16.0,
        };
        let err = calculate_voltage_drop(&input, &Regulations::default()).unwrap_err();
        assert!(matches!(err, CalcEngineError::UnknownCableSize { .. }));
    }
}
