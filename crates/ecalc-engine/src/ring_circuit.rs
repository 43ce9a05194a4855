//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Ring final circuit continuity: end-to-end readings, leg resistances and
//! cross-connection checks at each socket-outlet.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    earth_fault_loop::{classify_earth_fault_loop, evaluate_earth_fault_loop, ProtectiveDevice},
    errors::{CalcEngineError, Result},
    model::{Assessment, CheckOutcome},
    regulations::Regulations,
    validation,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketReading {
    pub label: String,
    /// Measured with line and neutral cross-connected.
    #[serde(default)]
    pub line_neutral: Option<f64>,
    /// Measured with line and CPC cross-connected.
    #[serde(default)]
    pub line_cpc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingCircuitInput {
    pub r1_end_to_end: f64,
    pub rn_end_to_end: f64,
    pub r2_end_to_end: f64,
    #[serde(default)]
    pub live_csa_mm2: Option<f64>,
    #[serde(default)]
    pub cpc_csa_mm2: Option<f64>,
    #[serde(default)]
    pub socket_readings: Vec<SocketReading>,
    #[serde(default)]
    pub ze_ohm: Option<f64>,
    /// When present with `ze_ohm`, the estimated Zs is checked against it.
    #[serde(default)]
    pub device: Option<ProtectiveDevice>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrossConnection {
    LineNeutral,
    LineCpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossConnectionCheck {
    pub label: String,
    pub connection: CrossConnection,
    pub measured_ohm: f64,
    pub expected_ohm: f64,
    pub deviation_ohm: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingCircuitFigures {
    pub r1_ohm: f64,
    pub rn_ohm: f64,
    pub r2_ohm: f64,
    pub expected_line_neutral_ohm: f64,
    pub expected_line_cpc_ohm: f64,
    /// Highest measured line-CPC reading, else the computed value.
    pub r1_plus_r2_ohm: f64,
    pub end_to_end_difference_ohm: f64,
    pub expected_r2_end_to_end: Option<f64>,
    pub estimated_zs_ohm: Option<f64>,
    pub cross_connections: Vec<CrossConnectionCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingCircuitResult {
    #[serde(flatten)]
    pub figures: RingCircuitFigures,
    #[serde(flatten)]
    pub assessment: Assessment,
}

pub fn validate_ring_input(input: &RingCircuitInput) -> Result<()> {
    validation::positive("r1_end_to_end", input.r1_end_to_end)?;
    validation::positive("rn_end_to_end", input.rn_end_to_end)?;
    validation::positive("r2_end_to_end", input.r2_end_to_end)?;
    validation::positive_opt("live_csa_mm2", input.live_csa_mm2)?;
    validation::positive_opt("cpc_csa_mm2", input.cpc_csa_mm2)?;
    validation::positive_opt("ze_ohm", input.ze_ohm)?;
    for (idx, socket) in input.socket_readings.iter().enumerate() {
        if socket.label.trim().is_empty() {
            return Err(CalcEngineError::invalid(
                format!("socket_readings[{idx}].label"),
                "must not be empty",
            ));
        }
        validation::positive_opt(
            &format!("socket_readings[{idx}].line_neutral"),
            socket.line_neutral,
        )?;
        validation::positive_opt(&format!("socket_readings[{idx}].line_cpc"), socket.line_cpc)?;
    }
    if let Some(device) = &input.device {
        device.validate("device")?;
    }
    Ok(())
}

fn cross_check(
    label: &str,
    connection: CrossConnection,
    measured_ohm: f64,
    expected_ohm: f64,
    regs: &Regulations,
) -> CrossConnectionCheck {
    let deviation_ohm = (measured_ohm - expected_ohm).abs();
    CrossConnectionCheck {
        label: label.to_owned(),
        connection,
        measured_ohm,
        expected_ohm,
        deviation_ohm,
        passed: regs.cross_connection_rule().check(deviation_ohm).passed,
    }
}

pub fn evaluate_ring_circuit(input: &RingCircuitInput, regs: &Regulations) -> RingCircuitFigures {
    let r1 = input.r1_end_to_end / 4.0;
    let rn = input.rn_end_to_end / 4.0;
    let r2 = input.r2_end_to_end / 4.0;
    let expected_ln = r1 + rn;
    let expected_lc = r1 + r2;

    let mut cross_connections = Vec::new();
    for socket in &input.socket_readings {
        if let Some(measured) = socket.line_neutral {
            cross_connections.push(cross_check(
                &socket.label,
                CrossConnection::LineNeutral,
                measured,
                expected_ln,
                regs,
            ));
        }
        if let Some(measured) = socket.line_cpc {
            cross_connections.push(cross_check(
                &socket.label,
                CrossConnection::LineCpc,
                measured,
                expected_lc,
                regs,
            ));
        }
    }

    let r1_plus_r2 = input
        .socket_readings
        .iter()
        .filter_map(|s| s.line_cpc)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(expected_lc);

    let expected_r2_end_to_end = match (input.live_csa_mm2, input.cpc_csa_mm2) {
        (Some(live), Some(cpc)) => Some(input.r1_end_to_end * live / cpc),
        _ => None,
    };

    RingCircuitFigures {
        r1_ohm: r1,
        rn_ohm: rn,
        r2_ohm: r2,
        expected_line_neutral_ohm: expected_ln,
        expected_line_cpc_ohm: expected_lc,
        r1_plus_r2_ohm: r1_plus_r2,
        end_to_end_difference_ohm: (input.r1_end_to_end - input.rn_end_to_end).abs(),
        expected_r2_end_to_end,
        estimated_zs_ohm: input.ze_ohm.map(|ze| ze + r1_plus_r2),
        cross_connections,
    }
}

pub fn classify_ring_circuit(
    input: &RingCircuitInput,
    figures: &RingCircuitFigures,
    regs: &Regulations,
) -> Assessment {
    let mut checks: Vec<CheckOutcome> = Vec::new();
    let mut advisories = Vec::new();

    let similarity = regs
        .end_to_end_similarity_rule()
        .check(figures.end_to_end_difference_ohm);
    if !similarity.passed {
        advisories.push(format!(
            "Line and neutral end-to-end readings differ by {:.3} Ω; check for a break or loose termination",
            figures.end_to_end_difference_ohm
        ));
    }
    checks.push(similarity);

    if let Some(expected_r2) = figures.expected_r2_end_to_end {
        let deviation = (input.r2_end_to_end - expected_r2).abs() / expected_r2;
        let ratio = regs.cpc_ratio_rule().check(deviation);
        if !ratio.passed {
            advisories.push(format!(
                "CPC end-to-end {:.3} Ω departs from the expected {:.3} Ω for the conductor sizes",
                input.r2_end_to_end, expected_r2
            ));
        }
        checks.push(ratio);
    }

    // One check per reading; the worst deviation is what the status reflects.
    for cross in &figures.cross_connections {
        if !cross.passed {
            advisories.push(format!(
                "Socket {} reads {:.3} Ω against {:.3} Ω expected; possible interconnection or spur",
                cross.label, cross.measured_ohm, cross.expected_ohm
            ));
        }
        checks.push(regs.cross_connection_rule().check(cross.deviation_ohm));
    }

    if let (Some(device), Some(zs)) = (&input.device, figures.estimated_zs_ohm) {
        let earth_fault = evaluate_earth_fault_loop(device, zs, &regs.earth_fault);
        let assessment = classify_earth_fault_loop(device, &earth_fault, regs);
        checks.extend(assessment.checks);
        advisories.extend(assessment.advisories);
    }

    Assessment::new(checks, advisories)
}

pub fn calculate_ring_circuit(
    input: &RingCircuitInput,
    regs: &Regulations,
) -> Result<RingCircuitResult> {
    validate_ring_input(input)?;
    let figures = evaluate_ring_circuit(input, regs);
    debug!(
        sockets = input.socket_readings.len(),
        "ring cross-connection readings evaluated"
    );
    let assessment = classify_ring_circuit(input, &figures, regs);

    info!(
        "Ring legs R1 {:.3} Ω, Rn {:.3} Ω, R2 {:.3} Ω; R1+R2 {:.3} Ω ({})",
        figures.r1_ohm, figures.rn_ohm, figures.r2_ohm, figures.r1_plus_r2_ohm, assessment.status
    );
    if !assessment.status.is_compliant() {
        warn!("[WARN] Ring continuity: {}", assessment.advisories.join(", "));
    }
    Ok(RingCircuitResult {
        figures,
        assessment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        earth_fault_loop::DeviceKind,
        model::ComplianceStatus,
        regulations::rules,
    };

    fn ring() -> RingCircuitInput {
        RingCircuitInput {
            r1_end_to_end: 1.20,
            rn_end_to_end: 1.20,
            r2_end_to_end: 1.92,
            live_csa_mm2: None,
            cpc_csa_mm2: None,
            socket_readings: Vec::new(),
            ze_ohm: None,
            device: None,
        }
    }

    fn socket(label: &str, line_neutral: Option<f64>, line_cpc: Option<f64>) -> SocketReading {
        SocketReading {
            label: label.to_owned(),
            line_neutral,
            line_cpc,
        }
    }

    #[test]
    fn legs_are_quarter_of_end_to_end() {
        let result = calculate_ring_circuit(&ring(), &Regulations::default()).unwrap();
        let f = &result.figures;
        assert!((f.r1_ohm - 0.30).abs() < 1e-12);
        assert!((f.rn_ohm - 0.30).abs() < 1e-12);
        assert!((f.r2_ohm - 0.48).abs() < 1e-12);
        assert!((f.r1_plus_r2_ohm - 0.78).abs() < 1e-12);
        assert!((f.expected_line_neutral_ohm - 0.60).abs() < 1e-12);
        assert_eq!(result.assessment.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn cpc_ratio_matches_twin_and_earth() {
        let mut input = ring();
        input.live_csa_mm2 = Some(2.5);
        input.cpc_csa_mm2 = Some(1.5);
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        assert!((result.figures.expected_r2_end_to_end.unwrap() - 2.0).abs() < 1e-12);
        assert!(result.assessment.check(rules::CPC_RATIO).unwrap().passed);

        input.r2_end_to_end = 2.6;
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        assert_eq!(result.assessment.status, ComplianceStatus::ReviewRequired);
    }

    #[test]
    fn dissimilar_end_to_end_fails() {
        let mut input = ring();
        input.rn_end_to_end = 1.30;
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn end_to_end_difference_of_exactly_limit_passes() {
        for (r1, rn) in [(1.25, 1.20), (0.55, 0.50), (0.85, 0.80)] {
            let mut input = ring();
            input.r1_end_to_end = r1;
            input.rn_end_to_end = rn;
            let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
            let similarity = result.assessment.check(rules::END_TO_END_SIMILARITY).unwrap();
            assert!(similarity.passed, "{r1}/{rn} should be within 0.05 Ω");
            assert_ne!(result.assessment.status, ComplianceStatus::NonCompliant);
        }
    }

    #[test]
    fn cross_connection_deviation_of_exactly_limit_fails() {
        for measured in [0.68, 0.88] {
            let mut input = ring();
            input.socket_readings = vec![socket("hall", None, Some(measured))];
            let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
            assert!(
                !result.figures.cross_connections[0].passed,
                "{measured} against 0.78 should fail"
            );
            assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
        }
    }

    #[test]
    fn socket_readings_drive_r1_plus_r2() {
        let mut input = ring();
        input.socket_readings = vec![
            socket("kitchen 1", Some(0.61), Some(0.79)),
            socket("kitchen 2", Some(0.60), Some(0.82)),
        ];
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        assert!((result.figures.r1_plus_r2_ohm - 0.82).abs() < 1e-12);
        assert_eq!(result.figures.cross_connections.len(), 4);
        assert!(result.figures.cross_connections.iter().all(|c| c.passed));
    }

    #[test]
    fn spur_reading_fails_cross_connection() {
        let mut input = ring();
        input.socket_readings = vec![socket("landing", None, Some(0.95))];
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        let check = &result.figures.cross_connections[0];
        assert!(!check.passed);
        assert!((check.deviation_ohm - 0.17).abs() < 1e-9);
        assert_eq!(result.assessment.status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn estimated_zs_checked_against_device() {
        let mut input = ring();
        input.ze_ohm = Some(0.35);
        input.device = Some(ProtectiveDevice::new(DeviceKind::McbTypeB, 32.0));
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        assert!((result.figures.estimated_zs_ohm.unwrap() - 1.13).abs() < 1e-9);
        assert!(!result.assessment.check(rules::EARTH_FAULT_LOOP).unwrap().passed);
    }

    #[test]
    fn zero_reading_rejected() {
        let mut input = ring();
        input.r2_end_to_end = 0.0;
        assert!(calculate_ring_circuit(&input, &Regulations::default()).is_err());
    }
}
