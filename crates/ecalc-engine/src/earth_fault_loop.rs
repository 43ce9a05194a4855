//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Earth fault loop impedance against protective device limits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::{info, warn};

use crate::{
    errors::{CalcEngineError, Result},
    model::Assessment,
    regulations::{EarthFaultLimits, Regulations},
    validation,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    /// BS EN 60898 / 61009 Type B.
    McbTypeB,
    McbTypeC,
    McbTypeD,
    /// BS 88 cartridge fuse.
    Bs88Fuse,
    /// BS 3036 semi-enclosed rewireable fuse.
    Bs3036Fuse,
}

impl DeviceKind {
    /// Multiple of In guaranteeing instantaneous disconnection, where one exists.
    pub fn instantaneous_trip_multiple(&self) -> Option<f64> {
        match self {
            DeviceKind::McbTypeB => Some(5.0),
            DeviceKind::McbTypeC => Some(10.0),
            DeviceKind::McbTypeD => Some(20.0),
            DeviceKind::Bs88Fuse | DeviceKind::Bs3036Fuse => None,
        }
    }

    pub fn is_semi_enclosed_fuse(&self) -> bool {
        matches!(self, DeviceKind::Bs3036Fuse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectiveDevice {
    pub kind: DeviceKind,
    pub rating_a: f64,
    /// Tabulated maximum Zs; required for fuses, overrides the formula for MCBs.
    #[serde(default)]
    pub max_zs_ohm: Option<f64>,
}

impl ProtectiveDevice {
    pub fn new(kind: DeviceKind, rating_a: f64) -> Self {
        Self {
            kind,
            rating_a,
            max_zs_ohm: None,
        }
    }

    pub fn validate(&self, field: &str) -> Result<()> {
        validation::positive(&format!("{field}.rating_a"), self.rating_a)?;
        validation::positive_opt(&format!("{field}.max_zs_ohm"), self.max_zs_ohm)?;
        if self.max_zs_ohm.is_none() && self.kind.instantaneous_trip_multiple().is_none() {
            return Err(CalcEngineError::invalid(
                format!("{field}.max_zs_ohm"),
                format!("a tabulated maximum Zs is required for {} devices", self.kind),
            ));
        }
        Ok(())
    }

    /// `Cmin · U0 / Ia`, or the tabulated override. Call after [`ProtectiveDevice::validate`].
    pub fn max_zs(&self, limits: &EarthFaultLimits) -> f64 {
        match (self.max_zs_ohm, self.kind.instantaneous_trip_multiple()) {
            (Some(tabulated), _) => tabulated,
            (None, Some(multiple)) => {
                limits.cmin * limits.nominal_voltage_u0 / (multiple * self.rating_a)
            }
            (None, None) => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthFaultLoopInput {
    pub device: ProtectiveDevice,
    #[serde(default)]
    pub zs_ohm: Option<f64>,
    #[serde(default)]
    pub ze_ohm: Option<f64>,
    #[serde(default)]
    pub r1_plus_r2_ohm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthFaultLoopFigures {
    pub zs_ohm: f64,
    pub tabulated_max_zs_ohm: f64,
    /// Tabulated maximum reduced for readings taken at ambient temperature.
    pub corrected_max_zs_ohm: f64,
    pub prospective_fault_current_a: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthFaultLoopResult {
    #[serde(flatten)]
    pub figures: EarthFaultLoopFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

/// Returns the Zs to assess: the measured value, or `Ze + (R1+R2)`.
pub fn validate_earth_fault_input(input: &EarthFaultLoopInput) -> Result<f64> {
    input.device.validate("device")?;
    validation::positive_opt("zs_ohm", input.zs_ohm)?;
    validation::positive_opt("ze_ohm", input.ze_ohm)?;
    validation::positive_opt("r1_plus_r2_ohm", input.r1_plus_r2_ohm)?;
    match (input.zs_ohm, input.ze_ohm, input.r1_plus_r2_ohm) {
        (Some(zs), _, _) => Ok(zs),
        (None, Some(ze), Some(r1r2)) => Ok(ze + r1r2),
        _ => Err(CalcEngineError::invalid(
            "zs_ohm",
            "provide a measured Zs or both Ze and R1+R2",
        )),
    }
}

pub fn evaluate_earth_fault_loop(
    device: &ProtectiveDevice,
    zs_ohm: f64,
    limits: &EarthFaultLimits,
) -> EarthFaultLoopFigures {
    let tabulated = device.max_zs(limits);
    EarthFaultLoopFigures {
        zs_ohm,
        tabulated_max_zs_ohm: tabulated,
        corrected_max_zs_ohm: tabulated * limits.measured_ratio,
        prospective_fault_current_a: limits.nominal_voltage_u0 / zs_ohm,
    }
}

pub fn classify_earth_fault_loop(
    device: &ProtectiveDevice,
    figures: &EarthFaultLoopFigures,
    regs: &Regulations,
) -> Assessment {
    let check = regs
        .earth_fault_loop_rule(figures.corrected_max_zs_ohm)
        .check(figures.zs_ohm);
    let mut advisories = Vec::new();
    if !check.passed {
        advisories.push(format!(
            "Zs {:.2} Ω exceeds {:.2} Ω for a {} A {}; disconnection time is not assured, consider an RCD or a larger CPC",
            figures.zs_ohm, figures.corrected_max_zs_ohm, device.rating_a, device.kind
        ));
    }
    Assessment::new(vec![check], advisories)
}

pub fn calculate_earth_fault_loop(
    input: &EarthFaultLoopInput,
    regs: &Regulations,
) -> Result<EarthFaultLoopResult> {
    let zs = validate_earth_fault_input(input)?;
    let figures = evaluate_earth_fault_loop(&input.device, zs, &regs.earth_fault);
    let assessment = classify_earth_fault_loop(&input.device, &figures, regs);

    info!(
        "Zs {:.3} Ω against {:.3} Ω ({} {} A)",
        figures.zs_ohm, figures.corrected_max_zs_ohm, input.device.kind, input.device.rating_a
    );
    if !assessment.status.is_compliant() {
        warn!("[WARN] {}", assessment.advisories.join(", "));
    }
    Ok(EarthFaultLoopResult {
        figures,
        assessment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComplianceStatus;

    #[test]
    fn type_b_32_matches_table_41_3() {
        let device = ProtectiveDevice::new(DeviceKind::McbTypeB, 32.0);
        let max = device.max_zs(&EarthFaultLimits::default());
        assert!((max - 1.37).abs() < 0.01);
    }

    #[test]
    fn type_c_is_half_type_b() {
        let limits = EarthFaultLimits::default();
        let b = ProtectiveDevice::new(DeviceKind::McbTypeB, 16.0).max_zs(&limits);
        let c = ProtectiveDevice::new(DeviceKind::McbTypeC, 16.0).max_zs(&limits);
        assert!((b / 2.0 - c).abs() < 1e-12);
    }

    #[test]
    fn ze_plus_r1r2_used_when_zs_absent() {
        let input = EarthFaultLoopInput {
            device: ProtectiveDevice::new(DeviceKind::McbTypeB, 32.0),
            zs_ohm: None,
            ze_ohm: Some(0.35),
            r1_plus_r2_ohm: Some(0.78),
        };
        let result = calculate_earth_fault_loop(&input, &Regulations::default()).unwrap();
        assert!((result.figures.zs_ohm - 1.13).abs() < 1e-9);
        // 0.8 × 1.3656 = 1.0925
        assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn fuse_requires_tabulated_limit() {
        let mut input = EarthFaultLoopInput {
            device: ProtectiveDevice::new(DeviceKind::Bs88Fuse, 32.0),
            zs_ohm: Some(0.5),
            ze_ohm: None,
            r1_plus_r2_ohm: None,
        };
        assert!(calculate_earth_fault_loop(&input, &Regulations::default()).is_err());
        input.device.max_zs_ohm = Some(1.04);
        let result = calculate_earth_fault_loop(&input, &Regulations::default()).unwrap();
        assert!(result.assessment.status.is_compliant());
    }

    #[test]
    fn missing_readings_rejected() {
        let input = EarthFaultLoopInput {
            device: ProtectiveDevice::new(DeviceKind::McbTypeB, 6.0),
            zs_ohm: None,
            ze_ohm: Some(0.2),
            r1_plus_r2_ohm: None,
        };
        assert!(validate_earth_fault_input(&input).is_err());
    }
}
