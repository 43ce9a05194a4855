//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::fs;

use ecalc_engine::{
    analyze_batch_with_options,
    api::run_request,
    earth_fault_loop::{DeviceKind, EarthFaultLoopInput, ProtectiveDevice},
    io::{load_jobs, load_regulations_from_file},
    model::{CircuitKind, ComplianceStatus, Phase},
    motor_starting::{
        calculate_motor_starting, full_load_current, MotorCable, MotorStartingInput,
        StartingMethod,
    },
    regulations::{rules, Regulations},
    ring_circuit::{calculate_ring_circuit, RingCircuitInput, SocketReading},
    voltage_drop::{calculate_voltage_drop, ConductorDrop, VoltageDropInput},
    CalcRequest,
};
use proptest::prelude::*;
use rstest::rstest;
use tempfile::tempdir;

fn ring(r1: f64, rn: f64, r2: f64) -> RingCircuitInput {
    RingCircuitInput {
        r1_end_to_end: r1,
        rn_end_to_end: rn,
        r2_end_to_end: r2,
        live_csa_mm2: None,
        cpc_csa_mm2: None,
        socket_readings: Vec::new(),
        ze_ohm: None,
        device: None,
    }
}

fn motor(power_kw: f64, method: StartingMethod) -> MotorStartingInput {
    MotorStartingInput {
        power_kw,
        voltage_v: 400.0,
        phase: Phase::Three,
        efficiency: 0.85,
        power_factor: 0.85,
        starting_method: method,
        starting_multiplier_override: None,
        start_duration_s: 5.0,
        cable: Some(MotorCable {
            length_m: 25.0,
            mv_per_a_per_m: 2.8,
        }),
    }
}

#[test]
fn fifteen_kilowatt_motor_full_load_current() {
    let flc = full_load_current(15.0, 400.0, Phase::Three, 0.85, 0.85);
    assert!((flc - 29.97).abs() < 0.01);
}

#[test]
fn large_direct_on_line_motor_needs_review() {
    let result =
        calculate_motor_starting(&motor(15.0, StartingMethod::DirectOnLine), &Regulations::default())
            .unwrap();
    let dol = result.assessment.check(rules::DIRECT_ON_LINE_POWER).unwrap();
    assert!(!dol.passed);
    assert_ne!(result.assessment.status, ComplianceStatus::Compliant);
}

#[test]
fn ring_scenario_legs() {
    let result = calculate_ring_circuit(&ring(1.20, 1.20, 1.92), &Regulations::default()).unwrap();
    assert!((result.figures.r1_ohm - 0.30).abs() < 1e-9);
    assert!((result.figures.rn_ohm - 0.30).abs() < 1e-9);
    assert!((result.figures.r2_ohm - 0.48).abs() < 1e-9);
    assert!((result.figures.r1_plus_r2_ohm - 0.78).abs() < 1e-9);
}

#[rstest]
#[case(CircuitKind::Lighting, 34.5, 20.0, ComplianceStatus::Compliant)]
#[case(CircuitKind::Lighting, 35.0, 20.0, ComplianceStatus::NonCompliant)]
#[case(CircuitKind::Other, 35.0, 20.0, ComplianceStatus::Compliant)]
#[case(CircuitKind::Other, 18.0, 70.0, ComplianceStatus::NonCompliant)]
fn voltage_drop_limits_by_circuit_kind(
    #[case] kind: CircuitKind,
    #[case] mv_per_a_per_m: f64,
    #[case] length_m: f64,
    #[case] expected: ComplianceStatus,
) {
    let input = VoltageDropInput {
        current_a: 10.0,
        length_m,
        voltage_v: 230.0,
        phase: Phase::Single,
        circuit_kind: kind,
        conductor: ConductorDrop::Explicit { mv_per_a_per_m },
    };
    let result = calculate_voltage_drop(&input, &Regulations::default()).unwrap();
    assert_eq!(result.assessment.status, expected);
}

#[rstest]
#[case(DeviceKind::McbTypeB, 6.0, 7.28)]
#[case(DeviceKind::McbTypeB, 32.0, 1.37)]
#[case(DeviceKind::McbTypeC, 32.0, 0.68)]
#[case(DeviceKind::McbTypeD, 32.0, 0.34)]
fn tabulated_max_zs_for_mcbs(#[case] kind: DeviceKind, #[case] rating_a: f64, #[case] max: f64) {
    let got = ProtectiveDevice::new(kind, rating_a).max_zs(&Regulations::default().earth_fault);
    assert!((got - max).abs() < 0.01, "{kind} {rating_a} A: {got}");
}

#[test]
fn edition_override_changes_classification() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("amended.toml");
    fs::write(
        &path,
        "edition = \"site rules\"\n[voltage_drop]\nlighting_percent = 4.0\n",
    )
    .unwrap();
    let regs = load_regulations_from_file(&path).unwrap();

    let input = VoltageDropInput {
        current_a: 10.0,
        length_m: 20.0,
        voltage_v: 230.0,
        phase: Phase::Single,
        circuit_kind: CircuitKind::Lighting,
        conductor: ConductorDrop::Explicit {
            mv_per_a_per_m: 40.0,
        },
    };
    assert_eq!(
        calculate_voltage_drop(&input, &Regulations::default())
            .unwrap()
            .assessment
            .status,
        ComplianceStatus::NonCompliant
    );
    assert!(calculate_voltage_drop(&input, &regs)
        .unwrap()
        .assessment
        .status
        .is_compliant());
}

#[test]
fn batch_file_exports_reports() {
    let dir = tempdir().unwrap();
    let jobs_path = dir.path().join("jobs.json");
    fs::write(
        &jobs_path,
        r#"[
            {"reference": "DB1/1", "calculator": "ring_circuit",
             "r1_end_to_end": 1.2, "rn_end_to_end": 1.2, "r2_end_to_end": 1.92,
             "socket_readings": [{"label": "lounge", "line_cpc": 0.80}]},
            {"reference": "DB1/2", "calculator": "earth_fault_loop",
             "device": {"kind": "mcb_type_b", "rating_a": 6}, "zs_ohm": 1.2},
            {"calculator": "voltage_drop", "current_a": 0, "length_m": 10, "voltage_v": 230,
             "conductor": {"source": "explicit", "mv_per_a_per_m": 18}}
        ]"#,
    )
    .unwrap();

    let jobs = load_jobs(&jobs_path).unwrap();
    let out = dir.path().join("reports");
    let summary = analyze_batch_with_options(&jobs, &Regulations::default(), Some(&out)).unwrap();

    assert_eq!(summary.counts.total, 3);
    assert_eq!(summary.counts.compliant, 2);
    assert_eq!(summary.counts.rejected, 1);

    let ring_report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("ring_circuit.json")).unwrap()).unwrap();
    assert_eq!(ring_report["regulations_edition"], "BS 7671:2018+A2:2022");
    assert_eq!(ring_report["data"][0]["reference"], "DB1/1");
    assert_eq!(ring_report["data"][0]["outcome"]["r1_plus_r2_ohm"], 0.8);
    assert_eq!(ring_report["schema"]["title"], "RingCircuitReport");

    let counts: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(counts["data"]["rejected"], 1);
    assert_eq!(counts["run_id"], summary.run_id.to_string());
}

#[test]
fn identical_requests_give_identical_outcomes() {
    let request = CalcRequest::EarthFaultLoop(EarthFaultLoopInput {
        device: ProtectiveDevice::new(DeviceKind::McbTypeC, 20.0),
        zs_ohm: None,
        ze_ohm: Some(0.35),
        r1_plus_r2_ohm: Some(0.41),
    });
    let regs = Regulations::default();
    let first = serde_json::to_string(&run_request(&request, &regs).unwrap()).unwrap();
    let second = serde_json::to_string(&run_request(&request, &regs).unwrap()).unwrap();
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn flc_scales_linearly_with_power(
        power in 0.1f64..200.0,
        factor in 1.0f64..10.0,
        voltage in 100.0f64..690.0,
        eff in 0.5f64..1.0,
        pf in 0.5f64..1.0,
    ) {
        let base = full_load_current(power, voltage, Phase::Three, eff, pf);
        let scaled = full_load_current(power * factor, voltage, Phase::Three, eff, pf);
        prop_assert!((scaled - base * factor).abs() <= 1e-9 * scaled.max(1.0));

        let higher_voltage = full_load_current(power, voltage * factor, Phase::Three, eff, pf);
        prop_assert!((higher_voltage - base / factor).abs() <= 1e-9 * base.max(1.0));
    }

    #[test]
    fn ring_legs_are_quarter_end_to_end(
        r1 in 0.05f64..5.0,
        rn in 0.05f64..5.0,
        r2 in 0.05f64..8.0,
    ) {
        let result = calculate_ring_circuit(&ring(r1, rn, r2), &Regulations::default()).unwrap();
        prop_assert!((result.figures.r1_ohm - r1 / 4.0).abs() < 1e-12);
        prop_assert!((result.figures.rn_ohm - rn / 4.0).abs() < 1e-12);
        prop_assert!((result.figures.r2_ohm - r2 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn cross_connection_passes_only_within_tolerance(
        r1 in 0.1f64..3.0,
        r2 in 0.1f64..5.0,
        offset in -0.5f64..0.5,
    ) {
        let mut input = ring(r1, r1, r2);
        let expected = r1 / 4.0 + r2 / 4.0;
        input.socket_readings = vec![SocketReading {
            label: "s1".into(),
            line_neutral: None,
            line_cpc: Some(expected + offset),
        }];
        prop_assume!(expected + offset > 0.0);
        prop_assume!((offset.abs() - 0.1).abs() > 1e-6);
        let result = calculate_ring_circuit(&input, &Regulations::default()).unwrap();
        let check = &result.figures.cross_connections[0];
        prop_assert!((check.expected_ohm - expected).abs() < 1e-12);
        prop_assert_eq!(check.passed, check.deviation_ohm < 0.1);
    }
}
