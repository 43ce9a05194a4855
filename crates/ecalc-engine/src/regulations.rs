//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Versioned regulatory thresholds.
//!
//! Every limit a classifier compares against lives here so that an amended
//! edition can be loaded from a file (see [`crate::io::load_regulations_from_file`])
//! without touching the formulas. Partial files are accepted: missing sections
//! fall back to the built-in BS 7671:2018+A2:2022 values.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    model::{CheckOutcome, CircuitKind, ComplianceStatus, Phase},
    validation,
};

pub const DEFAULT_EDITION: &str = "BS 7671:2018+A2:2022";

pub mod rules {
    pub const VOLTAGE_DROP: &str = "voltage_drop_percent";
    pub const MOTOR_RUNNING_DROP: &str = "motor_running_drop_percent";
    pub const MOTOR_STARTING_DROP: &str = "motor_starting_drop_percent";
    pub const DIRECT_ON_LINE_POWER: &str = "direct_on_line_power_kw";
    pub const CROSS_CONNECTION: &str = "cross_connection_deviation_ohm";
    pub const END_TO_END_SIMILARITY: &str = "line_neutral_end_to_end_difference_ohm";
    pub const CPC_RATIO: &str = "cpc_ratio_deviation";
    pub const EARTH_FAULT_LOOP: &str = "earth_fault_loop_impedance_ohm";
    pub const DESIGN_CURRENT: &str = "design_current_within_device_rating_a";
    pub const CURRENT_CAPACITY: &str = "device_rating_within_capacity_a";
    pub const ADIABATIC: &str = "conductor_csa_mm2";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    LessThan,
    AtMost,
    AtLeast,
    GreaterThan,
}

/// Relative slack applied at a threshold so that values derived from
/// two-decimal instrument readings land on the boundary they denote.
const BOUNDARY_EPSILON: f64 = 1e-9;

impl Comparison {
    /// Compares `value` with `threshold`. Values within a scaled epsilon of the
    /// threshold count as equal to it: they satisfy inclusive comparisons and
    /// fail strict ones.
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        let slack = BOUNDARY_EPSILON * threshold.abs().max(1.0);
        match self {
            Comparison::LessThan => value < threshold - slack,
            Comparison::AtMost => value <= threshold + slack,
            Comparison::AtLeast => value >= threshold - slack,
            Comparison::GreaterThan => value > threshold + slack,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::AtMost => "<=",
            Comparison::AtLeast => ">=",
            Comparison::GreaterThan => ">",
        }
    }
}

/// A threshold and comparison bound to a named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceRule {
    pub name: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub severity: ComplianceStatus,
}

impl ToleranceRule {
    pub fn new(
        name: impl Into<String>,
        threshold: f64,
        comparison: Comparison,
        severity: ComplianceStatus,
    ) -> Self {
        Self {
            name: name.into(),
            threshold,
            comparison,
            severity,
        }
    }

    pub fn check(&self, value: f64) -> CheckOutcome {
        CheckOutcome {
            rule: self.name.clone(),
            value,
            threshold: self.threshold,
            passed: self.comparison.holds(value, self.threshold),
            severity: self.severity,
        }
    }
}

impl std::fmt::Display for ToleranceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name,
            self.comparison.symbol(),
            self.threshold
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageDropLimits {
    pub lighting_percent: f64,
    pub other_percent: f64,
}

impl Default for VoltageDropLimits {
    fn default() -> Self {
        Self {
            lighting_percent: 3.0,
            other_percent: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorLimits {
    pub running_drop_percent: f64,
    pub starting_drop_percent: f64,
    pub direct_on_line_single_phase_max_kw: f64,
    pub direct_on_line_three_phase_max_kw: f64,
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self {
            running_drop_percent: 3.0,
            starting_drop_percent: 10.0,
            direct_on_line_single_phase_max_kw: 2.2,
            direct_on_line_three_phase_max_kw: 7.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingLimits {
    pub cross_connection_tolerance_ohm: f64,
    pub end_to_end_similarity_ohm: f64,
    /// Allowed relative deviation of r2 from `r1 × live/cpc`.
    pub cpc_ratio_tolerance: f64,
}

impl Default for RingLimits {
    fn default() -> Self {
        Self {
            cross_connection_tolerance_ohm: 0.1,
            end_to_end_similarity_ohm: 0.05,
            cpc_ratio_tolerance: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthFaultLimits {
    pub nominal_voltage_u0: f64,
    pub cmin: f64,
    /// Fraction of tabulated maximum Zs applied to readings taken at ambient temperature.
    pub measured_ratio: f64,
}

impl Default for EarthFaultLimits {
    fn default() -> Self {
        Self {
            nominal_voltage_u0: 230.0,
            cmin: 0.95,
            measured_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeratingLimits {
    /// Cf applied when the circuit is protected by a semi-enclosed (BS 3036) fuse.
    pub semi_enclosed_fuse_factor: f64,
}

impl Default for DeratingLimits {
    fn default() -> Self {
        Self {
            semi_enclosed_fuse_factor: 0.725,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Regulations {
    pub edition: String,
    pub voltage_drop: VoltageDropLimits,
    pub motor: MotorLimits,
    pub ring: RingLimits,
    pub earth_fault: EarthFaultLimits,
    pub derating: DeratingLimits,
}

impl Default for Regulations {
    fn default() -> Self {
        Self {
            edition: DEFAULT_EDITION.to_owned(),
            voltage_drop: VoltageDropLimits::default(),
            motor: MotorLimits::default(),
            ring: RingLimits::default(),
            earth_fault: EarthFaultLimits::default(),
            derating: DeratingLimits::default(),
        }
    }
}

impl Regulations {
    /// Rejects thresholds the classifiers cannot use: non-finite or
    /// non-positive limits, and factors outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.edition.trim().is_empty() {
            return Err(CalcEngineError::invalid("edition", "must not be empty"));
        }
        for (field, value) in [
            ("voltage_drop.lighting_percent", self.voltage_drop.lighting_percent),
            ("voltage_drop.other_percent", self.voltage_drop.other_percent),
            ("motor.running_drop_percent", self.motor.running_drop_percent),
            ("motor.starting_drop_percent", self.motor.starting_drop_percent),
        ] {
            validation::positive(field, value)?;
            validation::at_most(field, value, 100.0)?;
        }
        for (field, value) in [
            (
                "motor.direct_on_line_single_phase_max_kw",
                self.motor.direct_on_line_single_phase_max_kw,
            ),
            (
                "motor.direct_on_line_three_phase_max_kw",
                self.motor.direct_on_line_three_phase_max_kw,
            ),
            (
                "ring.cross_connection_tolerance_ohm",
                self.ring.cross_connection_tolerance_ohm,
            ),
            ("ring.end_to_end_similarity_ohm", self.ring.end_to_end_similarity_ohm),
            ("ring.cpc_ratio_tolerance", self.ring.cpc_ratio_tolerance),
            ("earth_fault.nominal_voltage_u0", self.earth_fault.nominal_voltage_u0),
        ] {
            validation::positive(field, value)?;
        }
        validation::fraction("earth_fault.cmin", self.earth_fault.cmin)?;
        validation::fraction("earth_fault.measured_ratio", self.earth_fault.measured_ratio)?;
        validation::fraction(
            "derating.semi_enclosed_fuse_factor",
            self.derating.semi_enclosed_fuse_factor,
        )?;
        Ok(())
    }

    pub fn voltage_drop_rule(&self, kind: CircuitKind) -> ToleranceRule {
        let limit = match kind {
            CircuitKind::Lighting => self.voltage_drop.lighting_percent,
            CircuitKind::Other => self.voltage_drop.other_percent,
        };
        ToleranceRule::new(
            rules::VOLTAGE_DROP,
            limit,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn motor_running_drop_rule(&self) -> ToleranceRule {
        ToleranceRule::new(
            rules::MOTOR_RUNNING_DROP,
            self.motor.running_drop_percent,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn motor_starting_drop_rule(&self) -> ToleranceRule {
        ToleranceRule::new(
            rules::MOTOR_STARTING_DROP,
            self.motor.starting_drop_percent,
            Comparison::AtMost,
            ComplianceStatus::ReviewRequired,
        )
    }

    pub fn direct_on_line_rule(&self, phase: Phase) -> ToleranceRule {
        let limit = match phase {
            Phase::Single => self.motor.direct_on_line_single_phase_max_kw,
            Phase::Three => self.motor.direct_on_line_three_phase_max_kw,
        };
        ToleranceRule::new(
            rules::DIRECT_ON_LINE_POWER,
            limit,
            Comparison::AtMost,
            ComplianceStatus::ReviewRequired,
        )
    }

    /// Strict: a deviation equal to the tolerance fails.
    pub fn cross_connection_rule(&self) -> ToleranceRule {
        ToleranceRule::new(
            rules::CROSS_CONNECTION,
            self.ring.cross_connection_tolerance_ohm,
            Comparison::LessThan,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn end_to_end_similarity_rule(&self) -> ToleranceRule {
        ToleranceRule::new(
            rules::END_TO_END_SIMILARITY,
            self.ring.end_to_end_similarity_ohm,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn cpc_ratio_rule(&self) -> ToleranceRule {
        ToleranceRule::new(
            rules::CPC_RATIO,
            self.ring.cpc_ratio_tolerance,
            Comparison::AtMost,
            ComplianceStatus::ReviewRequired,
        )
    }

    pub fn earth_fault_loop_rule(&self, max_zs_ohm: f64) -> ToleranceRule {
        ToleranceRule::new(
            rules::EARTH_FAULT_LOOP,
            max_zs_ohm,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn adiabatic_rule(&self, minimum_csa_mm2: f64) -> ToleranceRule {
        ToleranceRule::new(
            rules::ADIABATIC,
            minimum_csa_mm2,
            Comparison::AtLeast,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn design_current_rule(&self, device_rating_a: f64) -> ToleranceRule {
        ToleranceRule::new(
            rules::DESIGN_CURRENT,
            device_rating_a,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }

    pub fn current_capacity_rule(&self, capacity_a: f64) -> ToleranceRule {
        ToleranceRule::new(
            rules::CURRENT_CAPACITY,
            capacity_a,
            Comparison::AtMost,
            ComplianceStatus::NonCompliant,
        )
    }
}
