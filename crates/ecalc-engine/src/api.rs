//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Request and outcome envelopes shared by the batch runner and the CLI.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    adiabatic::{calculate_adiabatic, AdiabaticInput, AdiabaticResult},
    cable_sizing::{calculate_cable_sizing, CableSizingInput, CableSizingResult},
    earth_fault_loop::{calculate_earth_fault_loop, EarthFaultLoopInput, EarthFaultLoopResult},
    errors::Result,
    model::{Assessment, ComplianceStatus},
    motor_starting::{calculate_motor_starting, MotorStartingInput, MotorStartingResult},
    regulations::Regulations,
    ring_circuit::{calculate_ring_circuit, RingCircuitInput, RingCircuitResult},
    voltage_drop::{calculate_voltage_drop, VoltageDropInput, VoltageDropResult},
};

/// Calculator families, also used to name exported report files.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display,
    EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Calculator {
    MotorStarting,
    RingCircuit,
    VoltageDrop,
    CableSizing,
    Adiabatic,
    EarthFaultLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "calculator", rename_all = "snake_case")]
pub enum CalcRequest {
    MotorStarting(MotorStartingInput),
    RingCircuit(RingCircuitInput),
    VoltageDrop(VoltageDropInput),
    CableSizing(CableSizingInput),
    Adiabatic(AdiabaticInput),
    EarthFaultLoop(EarthFaultLoopInput),
}

impl CalcRequest {
    pub fn calculator(&self) -> Calculator {
        match self {
            CalcRequest::MotorStarting(_) => Calculator::MotorStarting,
            CalcRequest::RingCircuit(_) => Calculator::RingCircuit,
            CalcRequest::VoltageDrop(_) => Calculator::VoltageDrop,
            CalcRequest::CableSizing(_) => Calculator::CableSizing,
            CalcRequest::Adiabatic(_) => Calculator::Adiabatic,
            CalcRequest::EarthFaultLoop(_) => Calculator::EarthFaultLoop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "calculator", rename_all = "snake_case")]
pub enum CalcOutcome {
    MotorStarting(MotorStartingResult),
    RingCircuit(RingCircuitResult),
    VoltageDrop(VoltageDropResult),
    CableSizing(CableSizingResult),
    Adiabatic(AdiabaticResult),
    EarthFaultLoop(EarthFaultLoopResult),
}

impl CalcOutcome {
    pub fn assessment(&self) -> &Assessment {
        match self {
            CalcOutcome::MotorStarting(r) => &r.assessment,
            CalcOutcome::RingCircuit(r) => &r.assessment,
            CalcOutcome::VoltageDrop(r) => &r.assessment,
            CalcOutcome::CableSizing(r) => &r.assessment,
            CalcOutcome::Adiabatic(r) => &r.assessment,
            CalcOutcome::EarthFaultLoop(r) => &r.assessment,
        }
    }

    pub fn status(&self) -> ComplianceStatus {
        self.assessment().status
    }
}

/// One entry of a request file: an optional circuit reference plus the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(flatten)]
    pub request: CalcRequest,
}

impl From<CalcRequest> for CalcJob {
    fn from(request: CalcRequest) -> Self {
        Self {
            reference: None,
            request,
        }
    }
}

pub fn run_request(request: &CalcRequest, regs: &Regulations) -> Result<CalcOutcome> {
    let outcome = match request {
        CalcRequest::MotorStarting(input) => {
            CalcOutcome::MotorStarting(calculate_motor_starting(input, regs)?)
        }
        CalcRequest::RingCircuit(input) => {
            CalcOutcome::RingCircuit(calculate_ring_circuit(input, regs)?)
        }
        CalcRequest::VoltageDrop(input) => {
            CalcOutcome::VoltageDrop(calculate_voltage_drop(input, regs)?)
        }
        CalcRequest::CableSizing(input) => {
            CalcOutcome::CableSizing(calculate_cable_sizing(input, regs)?)
        }
        CalcRequest::Adiabatic(input) => CalcOutcome::Adiabatic(calculate_adiabatic(input, regs)?),
        CalcRequest::EarthFaultLoop(input) => {
            CalcOutcome::EarthFaultLoop(calculate_earth_fault_loop(input, regs)?)
        }
    };
    Ok(outcome)
}
