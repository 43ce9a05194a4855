//! ---
//! ecalc_section: "04-interfaces"
//! ecalc_subsection: "binary"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Command-line front end for the calculation engine."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use ecalc_common::DefaultsConfig;
use ecalc_engine::{
    adiabatic::AdiabaticInput,
    cable_data::{CableType, ReferenceMethod},
    cable_sizing::CableSizingInput,
    earth_fault_loop::{DeviceKind, EarthFaultLoopInput, ProtectiveDevice},
    model::{CircuitKind, ConductorMaterial, Insulation, Phase},
    motor_starting::{MotorCable, MotorStartingInput, StartingMethod},
    ring_circuit::{RingCircuitInput, SocketReading},
    voltage_drop::{ConductorDrop, VoltageDropInput},
    CalcRequest,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PhaseArg {
    Single,
    Three,
}

impl From<PhaseArg> for Phase {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Single => Phase::Single,
            PhaseArg::Three => Phase::Three,
        }
    }
}

fn supply_voltage(explicit: Option<f64>, phase: Phase, defaults: &DefaultsConfig) -> f64 {
    explicit.unwrap_or(match phase {
        Phase::Single => defaults.single_phase_voltage_v,
        Phase::Three => defaults.three_phase_voltage_v,
    })
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StartingMethodArg {
    Dol,
    StarDelta,
    SoftStarter,
    Vfd,
    AutoTransformer,
}

impl From<StartingMethodArg> for StartingMethod {
    fn from(value: StartingMethodArg) -> Self {
        match value {
            StartingMethodArg::Dol => StartingMethod::DirectOnLine,
            StartingMethodArg::StarDelta => StartingMethod::StarDelta,
            StartingMethodArg::SoftStarter => StartingMethod::SoftStarter,
            StartingMethodArg::Vfd => StartingMethod::VariableFrequencyDrive,
            StartingMethodArg::AutoTransformer => StartingMethod::AutoTransformer,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CircuitKindArg {
    Lighting,
    Other,
}

impl From<CircuitKindArg> for CircuitKind {
    fn from(value: CircuitKindArg) -> Self {
        match value {
            CircuitKindArg::Lighting => CircuitKind::Lighting,
            CircuitKindArg::Other => CircuitKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DeviceArg {
    McbB,
    McbC,
    McbD,
    Bs88,
    Bs3036,
}

impl From<DeviceArg> for DeviceKind {
    fn from(value: DeviceArg) -> Self {
        match value {
            DeviceArg::McbB => DeviceKind::McbTypeB,
            DeviceArg::McbC => DeviceKind::McbTypeC,
            DeviceArg::McbD => DeviceKind::McbTypeD,
            DeviceArg::Bs88 => DeviceKind::Bs88Fuse,
            DeviceArg::Bs3036 => DeviceKind::Bs3036Fuse,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MaterialArg {
    Copper,
    Aluminium,
}

impl From<MaterialArg> for ConductorMaterial {
    fn from(value: MaterialArg) -> Self {
        match value {
            MaterialArg::Copper => ConductorMaterial::Copper,
            MaterialArg::Aluminium => ConductorMaterial::Aluminium,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InsulationArg {
    /// 70 °C thermoplastic (PVC).
    Pvc,
    /// 90 °C thermosetting (XLPE).
    Xlpe,
}

impl From<InsulationArg> for Insulation {
    fn from(value: InsulationArg) -> Self {
        match value {
            InsulationArg::Pvc => Insulation::Thermoplastic70,
            InsulationArg::Xlpe => Insulation::Thermosetting90,
        }
    }
}

fn parse_cable_type(raw: &str) -> Result<CableType> {
    CableType::from_str(raw).map_err(|_| {
        anyhow!("unknown cable type '{raw}' (expected pvc-twin-earth, pvc-single or swa-xlpe)")
    })
}

fn parse_reference_method(raw: &str) -> Result<ReferenceMethod> {
    ReferenceMethod::from_str(&raw.to_ascii_uppercase())
        .map_err(|_| anyhow!("unknown reference method '{raw}'"))
}

/// Parses `LABEL:LINE_NEUTRAL:LINE_CPC`; either reading may be left empty.
fn parse_socket(raw: &str) -> Result<SocketReading> {
    let mut parts = raw.split(':');
    let label = parts
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| anyhow!("socket '{raw}' is missing a label"))?;
    let mut reading = |name: &str| -> Result<Option<f64>> {
        match parts.next().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .with_context(|| format!("socket '{raw}' has an invalid {name} reading")),
        }
    };
    let line_neutral = reading("line-neutral")?;
    let line_cpc = reading("line-cpc")?;
    if parts.next().is_some() {
        return Err(anyhow!("socket '{raw}' has more than three fields"));
    }
    Ok(SocketReading {
        label: label.trim().to_owned(),
        line_neutral,
        line_cpc,
    })
}

/// Motor full-load and starting current.
#[derive(Debug, Args)]
pub struct MotorArgs {
    /// Rated output power (kW).
    #[arg(long = "power-kw")]
    power_kw: f64,
    /// Supply voltage; defaults from configuration by phase.
    #[arg(long)]
    voltage: Option<f64>,
    #[arg(long, value_enum, default_value_t = PhaseArg::Three)]
    phase: PhaseArg,
    #[arg(long, default_value_t = 0.85)]
    efficiency: f64,
    #[arg(long = "power-factor", default_value_t = 0.85)]
    power_factor: f64,
    #[arg(long, value_enum, default_value_t = StartingMethodArg::Dol)]
    method: StartingMethodArg,
    /// Override the method's typical starting multiple.
    #[arg(long)]
    multiplier: Option<f64>,
    #[arg(long = "start-seconds", default_value_t = 5.0)]
    start_seconds: f64,
    /// Supply cable run length (m); requires --mv-per-a-per-m.
    #[arg(long = "cable-length", requires = "mv_per_a_per_m")]
    cable_length: Option<f64>,
    #[arg(long = "mv-per-a-per-m", requires = "cable_length")]
    mv_per_a_per_m: Option<f64>,
}

impl MotorArgs {
    pub fn into_request(self, defaults: &DefaultsConfig) -> CalcRequest {
        let phase = Phase::from(self.phase);
        CalcRequest::MotorStarting(MotorStartingInput {
            power_kw: self.power_kw,
            voltage_v: supply_voltage(self.voltage, phase, defaults),
            phase,
            efficiency: self.efficiency,
            power_factor: self.power_factor,
            starting_method: self.method.into(),
            starting_multiplier_override: self.multiplier,
            start_duration_s: self.start_seconds,
            cable: self
                .cable_length
                .zip(self.mv_per_a_per_m)
                .map(|(length_m, mv_per_a_per_m)| MotorCable {
                    length_m,
                    mv_per_a_per_m,
                }),
        })
    }
}

/// Ring final circuit continuity from end-to-end readings.
#[derive(Debug, Args)]
pub struct RingArgs {
    /// Line conductor end-to-end (Ω).
    #[arg(long)]
    r1: f64,
    /// Neutral conductor end-to-end (Ω).
    #[arg(long)]
    rn: f64,
    /// CPC end-to-end (Ω).
    #[arg(long)]
    r2: f64,
    #[arg(long = "live-csa")]
    live_csa: Option<f64>,
    #[arg(long = "cpc-csa")]
    cpc_csa: Option<f64>,
    /// Cross-connected socket reading as LABEL:LINE_NEUTRAL:LINE_CPC.
    #[arg(long = "socket", value_name = "READING")]
    sockets: Vec<String>,
    /// External earth fault loop impedance (Ω).
    #[arg(long)]
    ze: Option<f64>,
    #[arg(long, value_enum, requires = "rating")]
    device: Option<DeviceArg>,
    #[arg(long, requires = "device")]
    rating: Option<f64>,
    /// Tabulated maximum Zs, required for fuses.
    #[arg(long = "max-zs")]
    max_zs: Option<f64>,
}

fn device(
    kind: Option<DeviceArg>,
    rating: Option<f64>,
    max_zs: Option<f64>,
) -> Option<ProtectiveDevice> {
    kind.zip(rating).map(|(kind, rating_a)| ProtectiveDevice {
        kind: kind.into(),
        rating_a,
        max_zs_ohm: max_zs,
    })
}

impl RingArgs {
    pub fn into_request(self) -> Result<CalcRequest> {
        let socket_readings = self
            .sockets
            .iter()
            .map(|raw| parse_socket(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(CalcRequest::RingCircuit(RingCircuitInput {
            r1_end_to_end: self.r1,
            rn_end_to_end: self.rn,
            r2_end_to_end: self.r2,
            live_csa_mm2: self.live_csa,
            cpc_csa_mm2: self.cpc_csa,
            socket_readings,
            ze_ohm: self.ze,
            device: device(self.device, self.rating, self.max_zs),
        }))
    }
}

/// Voltage drop along a run.
#[derive(Debug, Args)]
pub struct VoltageDropArgs {
    #[arg(long)]
    current: f64,
    #[arg(long)]
    length: f64,
    #[arg(long)]
    voltage: Option<f64>,
    #[arg(long, value_enum, default_value_t = PhaseArg::Single)]
    phase: PhaseArg,
    #[arg(long, value_enum, default_value_t = CircuitKindArg::Other)]
    kind: CircuitKindArg,
    /// Use this mV/A/m as given.
    #[arg(long = "mv-per-a-per-m", conflicts_with_all = ["cable", "csa"])]
    mv_per_a_per_m: Option<f64>,
    /// Look mV/A/m up for this cable type; requires --csa.
    #[arg(long, value_parser = parse_cable_type, requires = "csa")]
    cable: Option<CableType>,
    #[arg(long, requires = "cable")]
    csa: Option<f64>,
}

impl VoltageDropArgs {
    pub fn into_request(self, defaults: &DefaultsConfig) -> Result<CalcRequest> {
        let phase = Phase::from(self.phase);
        let conductor = match (self.mv_per_a_per_m, self.cable, self.csa) {
            (Some(mv_per_a_per_m), _, _) => ConductorDrop::Explicit { mv_per_a_per_m },
            (None, Some(cable_type), Some(csa_mm2)) => ConductorDrop::Tabulated {
                cable_type,
                csa_mm2,
            },
            _ => {
                return Err(anyhow!(
                    "provide --mv-per-a-per-m or both --cable and --csa"
                ))
            }
        };
        Ok(CalcRequest::VoltageDrop(VoltageDropInput {
            current_a: self.current,
            length_m: self.length,
            voltage_v: supply_voltage(self.voltage, phase, defaults),
            phase,
            circuit_kind: self.kind.into(),
            conductor,
        }))
    }
}

/// Select or verify a cable size.
#[derive(Debug, Args)]
pub struct CableArgs {
    /// Design current Ib (A).
    #[arg(long = "design-current")]
    design_current: f64,
    #[arg(long, value_enum, default_value_t = DeviceArg::McbB)]
    device: DeviceArg,
    /// Device rating In (A).
    #[arg(long)]
    rating: f64,
    #[arg(long, value_parser = parse_cable_type, default_value = "pvc-twin-earth")]
    cable: CableType,
    #[arg(long, value_parser = parse_reference_method, default_value = "C")]
    method: ReferenceMethod,
    #[arg(long)]
    ambient: Option<f64>,
    #[arg(long, default_value_t = 1)]
    grouped: u32,
    /// Length of run enclosed in thermal insulation (mm).
    #[arg(long = "insulation-mm", default_value_t = 0.0)]
    insulation_mm: f64,
    #[arg(long)]
    length: f64,
    #[arg(long)]
    voltage: Option<f64>,
    #[arg(long, value_enum, default_value_t = PhaseArg::Single)]
    phase: PhaseArg,
    #[arg(long, value_enum, default_value_t = CircuitKindArg::Other)]
    kind: CircuitKindArg,
    /// Verify this size instead of selecting one.
    #[arg(long)]
    csa: Option<f64>,
}

impl CableArgs {
    pub fn into_request(self, defaults: &DefaultsConfig) -> CalcRequest {
        let phase = Phase::from(self.phase);
        CalcRequest::CableSizing(CableSizingInput {
            design_current_a: self.design_current,
            device_kind: self.device.into(),
            device_rating_a: self.rating,
            cable_type: self.cable,
            reference_method: self.method,
            ambient_temp_c: self.ambient.unwrap_or(defaults.ambient_temp_c),
            grouped_circuits: self.grouped,
            thermal_insulation_mm: self.insulation_mm,
            length_m: self.length,
            voltage_v: supply_voltage(self.voltage, phase, defaults),
            phase,
            circuit_kind: self.kind.into(),
            csa_mm2: self.csa,
        })
    }
}

/// Adiabatic check of a conductor's fault withstand.
#[derive(Debug, Args)]
pub struct AdiabaticArgs {
    /// Prospective fault current (A).
    #[arg(long = "fault-current")]
    fault_current: f64,
    /// Disconnection time (s), at most 5.
    #[arg(long)]
    time: f64,
    #[arg(long)]
    csa: f64,
    #[arg(long, value_enum, default_value_t = MaterialArg::Copper)]
    material: MaterialArg,
    #[arg(long, value_enum, default_value_t = InsulationArg::Pvc)]
    insulation: InsulationArg,
    #[arg(long)]
    k: Option<f64>,
}

impl AdiabaticArgs {
    pub fn into_request(self) -> CalcRequest {
        CalcRequest::Adiabatic(AdiabaticInput {
            fault_current_a: self.fault_current,
            disconnection_time_s: self.time,
            csa_mm2: self.csa,
            material: self.material.into(),
            insulation: self.insulation.into(),
            k_override: self.k,
        })
    }
}

/// Earth fault loop impedance against the protective device.
#[derive(Debug, Args)]
pub struct ZsArgs {
    #[arg(long, value_enum)]
    device: DeviceArg,
    #[arg(long)]
    rating: f64,
    /// Measured Zs (Ω).
    #[arg(long)]
    zs: Option<f64>,
    #[arg(long)]
    ze: Option<f64>,
    #[arg(long = "r1r2")]
    r1_plus_r2: Option<f64>,
    #[arg(long = "max-zs")]
    max_zs: Option<f64>,
}

impl ZsArgs {
    pub fn into_request(self) -> CalcRequest {
        CalcRequest::EarthFaultLoop(EarthFaultLoopInput {
            device: ProtectiveDevice {
                kind: self.device.into(),
                rating_a: self.rating,
                max_zs_ohm: self.max_zs,
            },
            zs_ohm: self.zs,
            ze_ohm: self.ze,
            r1_plus_r2_ohm: self.r1_plus_r2,
        })
    }
}
