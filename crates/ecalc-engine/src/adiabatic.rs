//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Adiabatic check of conductor thermal withstand, `S ≥ √(I²t) / k`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    errors::Result,
    model::{Assessment, ConductorMaterial, Insulation},
    regulations::Regulations,
    validation,
};

/// The adiabatic equation only holds for disconnection within 5 s.
const MAX_DISCONNECTION_TIME_S: f64 = 5.0;

/// k for a conductor incorporated in a cable or bunched with cables.
pub fn k_factor(material: ConductorMaterial, insulation: Insulation) -> f64 {
    match (material, insulation) {
        (ConductorMaterial::Copper, Insulation::Thermoplastic70) => 115.0,
        (ConductorMaterial::Copper, Insulation::Thermosetting90) => 143.0,
        (ConductorMaterial::Aluminium, Insulation::Thermoplastic70) => 76.0,
        (ConductorMaterial::Aluminium, Insulation::Thermosetting90) => 94.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdiabaticInput {
    pub fault_current_a: f64,
    pub disconnection_time_s: f64,
    pub csa_mm2: f64,
    pub material: ConductorMaterial,
    pub insulation: Insulation,
    #[serde(default)]
    pub k_override: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdiabaticFigures {
    pub k: f64,
    pub let_through_i2t: f64,
    /// k²S², the energy the conductor withstands.
    pub withstand_k2s2: f64,
    pub minimum_csa_mm2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdiabaticResult {
    #[serde(flatten)]
    pub figures: AdiabaticFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

pub fn validate_adiabatic_input(input: &AdiabaticInput) -> Result<()> {
    validation::positive("fault_current_a", input.fault_current_a)?;
    validation::positive("disconnection_time_s", input.disconnection_time_s)?;
    validation::at_most(
        "disconnection_time_s",
        input.disconnection_time_s,
        MAX_DISCONNECTION_TIME_S,
    )?;
    validation::positive("csa_mm2", input.csa_mm2)?;
    validation::positive_opt("k_override", input.k_override)
}

pub fn evaluate_adiabatic(input: &AdiabaticInput) -> AdiabaticFigures {
    let k = input
        .k_override
        .unwrap_or_else(|| k_factor(input.material, input.insulation));
    let i2t = input.fault_current_a.powi(2) * input.disconnection_time_s;
    AdiabaticFigures {
        k,
        let_through_i2t: i2t,
        withstand_k2s2: (k * input.csa_mm2).powi(2),
        minimum_csa_mm2: i2t.sqrt() / k,
    }
}

pub fn classify_adiabatic(
    input: &AdiabaticInput,
    figures: &AdiabaticFigures,
    regs: &Regulations,
) -> Assessment {
    let check = regs
        .adiabatic_rule(figures.minimum_csa_mm2)
        .check(input.csa_mm2);
    let mut advisories = Vec::new();
    if !check.passed {
        advisories.push(format!(
            "{} mm² cannot withstand {:.0} A²s; at least {:.2} mm² is required",
            input.csa_mm2, figures.let_through_i2t, figures.minimum_csa_mm2
        ));
    }
    Assessment::new(vec![check], advisories)
}

pub fn calculate_adiabatic(input: &AdiabaticInput, regs: &Regulations) -> Result<AdiabaticResult> {
    validate_adiabatic_input(input)?;
    let figures = evaluate_adiabatic(input);
    let assessment = classify_adiabatic(input, &figures, regs);

    info!(
        "Adiabatic: {:.0} A for {} s needs {:.2} mm² (k = {})",
        input.fault_current_a, input.disconnection_time_s, figures.minimum_csa_mm2, figures.k
    );
    if !assessment.status.is_compliant() {
        warn!("[WARN] {}", assessment.advisories.join(", "));
    }
    Ok(AdiabaticResult {
        figures,
        assessment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComplianceStatus;

    fn cpc(csa_mm2: f64) -> AdiabaticInput {
        AdiabaticInput {
            fault_current_a: 1000.0,
            disconnection_time_s: 0.4,
            csa_mm2,
            material: ConductorMaterial::Copper,
            insulation: Insulation::Thermoplastic70,
            k_override: None,
        }
    }

    #[test]
    fn minimum_csa_for_one_kiloamp() {
        let figures = evaluate_adiabatic(&cpc(1.5));
        // √(1000² × 0.4) / 115 = 632.46 / 115
        assert!((figures.minimum_csa_mm2 - 5.4996).abs() < 1e-3);
        assert!((figures.let_through_i2t - 400_000.0).abs() < 1e-6);
    }

    #[test]
    fn undersized_cpc_fails() {
        let result = calculate_adiabatic(&cpc(1.5), &Regulations::default()).unwrap();
        assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
        let result = calculate_adiabatic(&cpc(6.0), &Regulations::default()).unwrap();
        assert!(result.assessment.status.is_compliant());
    }

    #[test]
    fn k_override_wins() {
        let mut input = cpc(6.0);
        input.k_override = Some(143.0);
        assert_eq!(evaluate_adiabatic(&input).k, 143.0);
    }

    #[test]
    fn long_disconnection_rejected() {
        let mut input = cpc(6.0);
        input.disconnection_time_s = 6.0;
        assert!(validate_adiabatic_input(&input).is_err());
    }
}
