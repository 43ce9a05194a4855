//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Motor full-load and starting current.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::{debug, info, warn};

use crate::{
    errors::Result,
    model::{Assessment, Phase},
    regulations::Regulations,
    validation,
    voltage_drop::{drop_percent, voltage_drop_volts},
};

const DIRECT_ON_LINE_MULTIPLIER: f64 = 7.0;
const SOFT_STARTER_MULTIPLIER: f64 = 3.0;
const VARIABLE_FREQUENCY_DRIVE_MULTIPLIER: f64 = 1.5;
/// Auto-transformer tap as a fraction of line voltage.
const AUTO_TRANSFORMER_TAP: f64 = 0.65;
const DEFAULT_START_DURATION_S: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StartingMethod {
    DirectOnLine,
    StarDelta,
    SoftStarter,
    VariableFrequencyDrive,
    AutoTransformer,
}

impl StartingMethod {
    /// Typical starting current as a multiple of full-load current.
    pub fn current_multiplier(&self) -> f64 {
        match self {
            StartingMethod::DirectOnLine => DIRECT_ON_LINE_MULTIPLIER,
            StartingMethod::StarDelta => DIRECT_ON_LINE_MULTIPLIER / 3.0,
            StartingMethod::SoftStarter => SOFT_STARTER_MULTIPLIER,
            StartingMethod::VariableFrequencyDrive => VARIABLE_FREQUENCY_DRIVE_MULTIPLIER,
            StartingMethod::AutoTransformer => {
                AUTO_TRANSFORMER_TAP * AUTO_TRANSFORMER_TAP * DIRECT_ON_LINE_MULTIPLIER
            }
        }
    }
}

/// Supply cable, with mV/A/m taken as the figure for this circuit arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorCable {
    pub length_m: f64,
    pub mv_per_a_per_m: f64,
}

fn default_start_duration() -> f64 {
    DEFAULT_START_DURATION_S
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorStartingInput {
    pub power_kw: f64,
    pub voltage_v: f64,
    #[serde(default = "default_phase")]
    pub phase: Phase,
    pub efficiency: f64,
    pub power_factor: f64,
    pub starting_method: StartingMethod,
    #[serde(default)]
    pub starting_multiplier_override: Option<f64>,
    #[serde(default = "default_start_duration")]
    pub start_duration_s: f64,
    #[serde(default)]
    pub cable: Option<MotorCable>,
}

fn default_phase() -> Phase {
    Phase::Three
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorStartingFigures {
    pub full_load_current_a: f64,
    pub starting_multiplier: f64,
    pub starting_current_a: f64,
    pub running_kva: f64,
    pub starting_kva: f64,
    /// I²t let through during the start, in A²s.
    pub starting_thermal_stress_a2s: f64,
    pub running_drop_v: Option<f64>,
    pub running_drop_percent: Option<f64>,
    pub starting_drop_v: Option<f64>,
    pub starting_drop_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorStartingResult {
    #[serde(flatten)]
    pub figures: MotorStartingFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

pub fn validate_motor_input(input: &MotorStartingInput) -> Result<()> {
    validation::positive("power_kw", input.power_kw)?;
    validation::positive("voltage_v", input.voltage_v)?;
    validation::fraction("efficiency", input.efficiency)?;
    validation::fraction("power_factor", input.power_factor)?;
    validation::positive_opt(
        "starting_multiplier_override",
        input.starting_multiplier_override,
    )?;
    validation::positive("start_duration_s", input.start_duration_s)?;
    if let Some(cable) = &input.cable {
        validation::positive("cable.length_m", cable.length_m)?;
        validation::positive("cable.mv_per_a_per_m", cable.mv_per_a_per_m)?;
    }
    Ok(())
}

/// `P / (k·V·η·cosφ)` with `k = √3` for three-phase supplies.
pub fn full_load_current(
    power_kw: f64,
    voltage_v: f64,
    phase: Phase,
    efficiency: f64,
    power_factor: f64,
) -> f64 {
    (power_kw * 1000.0)
        / (phase.power_factor_multiplier() * voltage_v * efficiency * power_factor)
}

fn apparent_power_kva(voltage_v: f64, current_a: f64, phase: Phase) -> f64 {
    phase.power_factor_multiplier() * voltage_v * current_a / 1000.0
}

pub fn evaluate_motor_starting(input: &MotorStartingInput) -> MotorStartingFigures {
    let flc = full_load_current(
        input.power_kw,
        input.voltage_v,
        input.phase,
        input.efficiency,
        input.power_factor,
    );
    let multiplier = input
        .starting_multiplier_override
        .unwrap_or_else(|| input.starting_method.current_multiplier());
    let starting_current = flc * multiplier;

    let running_drop_v = input
        .cable
        .map(|c| voltage_drop_volts(c.mv_per_a_per_m, flc, c.length_m));
    let starting_drop_v = input
        .cable
        .map(|c| voltage_drop_volts(c.mv_per_a_per_m, starting_current, c.length_m));

    MotorStartingFigures {
        full_load_current_a: flc,
        starting_multiplier: multiplier,
        starting_current_a: starting_current,
        running_kva: apparent_power_kva(input.voltage_v, flc, input.phase),
        starting_kva: apparent_power_kva(input.voltage_v, starting_current, input.phase),
        starting_thermal_stress_a2s: starting_current.powi(2) * input.start_duration_s,
        running_drop_v,
        running_drop_percent: running_drop_v.map(|v| drop_percent(v, input.voltage_v)),
        starting_drop_v,
        starting_drop_percent: starting_drop_v.map(|v| drop_percent(v, input.voltage_v)),
    }
}

pub fn classify_motor_starting(
    input: &MotorStartingInput,
    figures: &MotorStartingFigures,
    regs: &Regulations,
) -> Assessment {
    let mut checks = Vec::new();
    let mut advisories = Vec::new();

    if let (Some(running), Some(starting)) =
        (figures.running_drop_percent, figures.starting_drop_percent)
    {
        let running_check = regs.motor_running_drop_rule().check(running);
        if !running_check.passed {
            advisories.push(format!(
                "Running voltage drop {:.2}% exceeds {:.1}%; increase the conductor size or shorten the run",
                running, running_check.threshold
            ));
        }
        checks.push(running_check);

        let starting_check = regs.motor_starting_drop_rule().check(starting);
        if !starting_check.passed {
            advisories.push(format!(
                "Starting voltage dip {:.2}% exceeds {:.1}% and may disturb other equipment; consider reduced-voltage starting",
                starting, starting_check.threshold
            ));
        }
        checks.push(starting_check);
    } else {
        advisories.push(
            "Provide cable length and mV/A/m to assess running and starting voltage drop".into(),
        );
    }

    if input.starting_method == StartingMethod::DirectOnLine {
        let dol_check = regs.direct_on_line_rule(input.phase).check(input.power_kw);
        if !dol_check.passed {
            advisories.push(format!(
                "Direct-on-line start above {:.1} kW usually needs DNO agreement; consider star-delta, soft starter or VFD",
                dol_check.threshold
            ));
        }
        checks.push(dol_check);
        advisories.push(format!(
            "Use a Type D MCB or motor-rated fuse to ride through the {:.1} A starting current",
            figures.starting_current_a
        ));
    }

    Assessment::new(checks, advisories)
}

pub fn calculate_motor_starting(
    input: &MotorStartingInput,
    regs: &Regulations,
) -> Result<MotorStartingResult> {
    validate_motor_input(input)?;
    let figures = evaluate_motor_starting(input);
    debug!(
        flc = figures.full_load_current_a,
        starting = figures.starting_current_a,
        "motor figures evaluated"
    );
    let assessment = classify_motor_starting(input, &figures, regs);

    info!(
        "Motor {:.2} kW {} start: FLC {:.2} A, starting {:.2} A ({})",
        input.power_kw,
        input.starting_method,
        figures.full_load_current_a,
        figures.starting_current_a,
        assessment.status
    );
    if !assessment.status.is_compliant() {
        warn!("Motor start assessment: {}", assessment.advisories.join("; "));
    }

    Ok(MotorStartingResult {
        figures,
        assessment,
    })
}
