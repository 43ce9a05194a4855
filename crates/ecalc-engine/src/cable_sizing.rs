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
use tracing::{debug, info, warn};

use crate::{
    cable_data::{CableRow, CableType, ReferenceMethod},
    derating::{
        ambient_temperature_factor, grouping_factor, thermal_insulation_factor, DeratingFactors,
    },
    earth_fault_loop::DeviceKind,
    errors::{CalcEngineError, Result},
    model::{Assessment, CircuitKind, Phase},
    regulations::Regulations,
    validation,
    voltage_drop::{drop_percent, voltage_drop_volts},
};

fn default_ambient() -> f64 {
    30.0
}

fn default_grouped_circuits() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSizingInput {
    pub design_current_a: f64,
    pub device_kind: DeviceKind,
    pub device_rating_a: f64,
    pub cable_type: CableType,
    pub reference_method: ReferenceMethod,
    #[serde(default = "default_ambient")]
    pub ambient_temp_c: f64,
    #[serde(default = "default_grouped_circuits")]
    pub grouped_circuits: u32,
    /// Length of run surrounded by thermal insulation; zero when none.
    #[serde(default)]
    pub thermal_insulation_mm: f64,
    pub length_m: f64,
    pub voltage_v: f64,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub circuit_kind: CircuitKind,
    /// Verify this size instead of selecting one.
    #[serde(default)]
    pub csa_mm2: Option<f64>,
}

/// Which requirement fixed the recommended size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SizingConstraint {
    CurrentCapacity,
    VoltageDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSizingFigures {
    pub factors: DeratingFactors,
    pub required_tabulated_a: f64,
    pub recommended_csa_mm2: Option<f64>,
    pub governed_by: Option<SizingConstraint>,
    /// Size the figures below describe: the verified size, else the recommendation.
    pub csa_mm2: Option<f64>,
    pub tabulated_capacity_a: Option<f64>,
    pub effective_capacity_a: Option<f64>,
    pub mv_per_a_per_m: Option<f64>,
    pub drop_v: Option<f64>,
    pub drop_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSizingResult {
    #[serde(flatten)]
    pub figures: CableSizingFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

/// Validates the input and resolves the rating factors that apply to it.
pub fn validate_cable_sizing_input(
    input: &CableSizingInput,
    regs: &Regulations,
) -> Result<DeratingFactors> {
    validation::positive("design_current_a", input.design_current_a)?;
    validation::positive("device_rating_a", input.device_rating_a)?;
    validation::positive("length_m", input.length_m)?;
    validation::positive("voltage_v", input.voltage_v)?;
    validation::non_negative("thermal_insulation_mm", input.thermal_insulation_mm)?;
    validation::finite("ambient_temp_c", input.ambient_temp_c)?;
    if input.grouped_circuits == 0 {
        return Err(CalcEngineError::invalid(
            "grouped_circuits",
            "must count at least the circuit being sized",
        ));
    }
    if !input.cable_type.supports(input.reference_method) {
        return Err(CalcEngineError::invalid(
            "reference_method",
            format!(
                "{} is not rated for method {} (rated methods: {})",
                input.cable_type,
                input.reference_method,
                input
                    .cable_type
                    .supported_methods()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }
    if let Some(csa_mm2) = input.csa_mm2 {
        if input
            .cable_type
            .capacity(input.reference_method, csa_mm2)
            .is_none()
        {
            return Err(CalcEngineError::UnknownCableSize {
                cable: input.cable_type,
                csa_mm2,
            });
        }
    }

    Ok(DeratingFactors {
        ambient: ambient_temperature_factor(input.cable_type.insulation(), input.ambient_temp_c)?,
        grouping: grouping_factor(input.grouped_circuits),
        thermal_insulation: thermal_insulation_factor(input.thermal_insulation_mm),
        fuse: if input.device_kind.is_semi_enclosed_fuse() {
            regs.derating.semi_enclosed_fuse_factor
        } else {
            1.0
        },
    })
}

fn row_drop_percent(input: &CableSizingInput, row: &CableRow) -> f64 {
    let mv = row.mv_per_a_per_m * input.phase.tabulated_drop_multiplier();
    drop_percent(
        voltage_drop_volts(mv, input.design_current_a, input.length_m),
        input.voltage_v,
    )
}

/// Smallest size meeting capacity and voltage drop. When capacity can be met
/// but voltage drop cannot, the largest tabulated size is returned.
fn select_size(
    input: &CableSizingInput,
    required_tabulated_a: f64,
    drop_limit_percent: f64,
) -> Option<(&'static CableRow, SizingConstraint)> {
    let first = input
        .cable_type
        .smallest_for(input.reference_method, required_tabulated_a)?;
    let capable: Vec<&'static CableRow> = input
        .cable_type
        .rows()
        .iter()
        .filter(|r| {
            r.csa_mm2 >= first.csa_mm2
                && r.capacity(input.reference_method)
                    .is_some_and(|c| c >= required_tabulated_a)
        })
        .collect();

    match capable
        .iter()
        .find(|r| row_drop_percent(input, r) <= drop_limit_percent)
    {
        Some(row) if std::ptr::eq(*row, first) => Some((first, SizingConstraint::CurrentCapacity)),
        Some(row) => Some((*row, SizingConstraint::VoltageDrop)),
        None => capable.last().map(|r| (*r, SizingConstraint::VoltageDrop)),
    }
}

pub fn evaluate_cable_sizing(
    input: &CableSizingInput,
    factors: DeratingFactors,
    regs: &Regulations,
) -> CableSizingFigures {
    let required_tabulated_a = input.device_rating_a / factors.combined();
    let drop_limit = regs.voltage_drop_rule(input.circuit_kind).threshold;
    let selected = select_size(input, required_tabulated_a, drop_limit);

    let assessed = match input.csa_mm2 {
        Some(csa) => input.cable_type.row(csa),
        None => selected.map(|(row, _)| row),
    };

    let tabulated = assessed.and_then(|r| r.capacity(input.reference_method));
    let mv = assessed.map(|r| r.mv_per_a_per_m * input.phase.tabulated_drop_multiplier());
    let drop_v = mv.map(|mv| voltage_drop_volts(mv, input.design_current_a, input.length_m));

    CableSizingFigures {
        factors,
        required_tabulated_a,
        recommended_csa_mm2: selected.map(|(row, _)| row.csa_mm2),
        governed_by: selected.map(|(_, constraint)| constraint),
        csa_mm2: assessed.map(|r| r.csa_mm2),
        tabulated_capacity_a: tabulated,
        effective_capacity_a: tabulated.map(|t| t * factors.combined()),
        mv_per_a_per_m: mv,
        drop_v,
        drop_percent: drop_v.map(|v| drop_percent(v, input.voltage_v)),
    }
}

pub fn classify_cable_sizing(
    input: &CableSizingInput,
    figures: &CableSizingFigures,
    regs: &Regulations,
) -> Assessment {
    let mut checks = Vec::new();
    let mut advisories = Vec::new();

    let design = regs
        .design_current_rule(input.device_rating_a)
        .check(input.design_current_a);
    if !design.passed {
        advisories.push(format!(
            "Design current {:.1} A exceeds the {:.0} A device rating; select a larger device",
            input.design_current_a, input.device_rating_a
        ));
    }
    checks.push(design);

    let capacity = regs
        .current_capacity_rule(figures.effective_capacity_a.unwrap_or(0.0))
        .check(input.device_rating_a);
    if !capacity.passed {
        match (figures.csa_mm2, figures.recommended_csa_mm2) {
            (Some(csa), Some(recommended)) if csa < recommended => advisories.push(format!(
                "{csa} mm² is undersized after derating; use at least {recommended} mm²"
            )),
            (None, _) | (_, None) => advisories.push(format!(
                "No {} size for method {} carries the required {:.1} A; consider another installation method or parallel cables",
                input.cable_type, input.reference_method, figures.required_tabulated_a
            )),
            _ => advisories.push(format!(
                "Capacity {:.1} A is below the {:.0} A device rating",
                figures.effective_capacity_a.unwrap_or(0.0),
                input.device_rating_a
            )),
        }
    }
    checks.push(capacity);

    if let Some(percent) = figures.drop_percent {
        let drop = regs.voltage_drop_rule(input.circuit_kind).check(percent);
        if !drop.passed {
            advisories.push(format!(
                "Voltage drop {:.2}% exceeds {:.1}% over {:.1} m",
                percent, drop.threshold, input.length_m
            ));
        }
        checks.push(drop);
    }

    if figures.factors.combined() < 1.0 {
        advisories.push(format!(
            "Derated by {:.3} (Ca {:.2}, Cg {:.2}, Ci {:.2}, Cf {:.3})",
            figures.factors.combined(),
            figures.factors.ambient,
            figures.factors.grouping,
            figures.factors.thermal_insulation,
            figures.factors.fuse
        ));
    }

    Assessment::new(checks, advisories)
}

fn failure_summary(input: &CableSizingInput, assessment: &Assessment) -> String {
    format!(
        "Cable {} method {} failed {}: {}",
        input.cable_type,
        input.reference_method,
        assessment
            .failed()
            .map(|c| c.rule.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        assessment.advisories.join("; ")
    )
}

pub fn calculate_cable_sizing(
    input: &CableSizingInput,
    regs: &Regulations,
) -> Result<CableSizingResult> {
    let factors = validate_cable_sizing_input(input, regs)?;
    debug!(?factors, "rating factors resolved");
    let figures = evaluate_cable_sizing(input, factors, regs);
    let assessment = classify_cable_sizing(input, &figures, regs);

    info!(
        "Cable {} method {}: It {:.1} A, size {:?} mm² ({})",
        input.cable_type,
        input.reference_method,
        figures.required_tabulated_a,
        figures.csa_mm2,
        assessment.status
    );
    if !assessment.status.is_compliant() {
        warn!("[WARN] {}", failure_summary(input, &assessment));
    }

    Ok(CableSizingResult {
        figures,
        assessment,
    })
}
