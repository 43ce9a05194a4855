//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Rating factors applied to tabulated current-carrying capacity.
//!
//! Lookups step to the next more onerous table row instead of interpolating.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    model::Insulation,
};

/// (ambient °C, factor) for 70 °C thermoplastic insulation, reference 30 °C.
const AMBIENT_THERMOPLASTIC_70: &[(f64, f64)] = &[
    (10.0, 1.22),
    (15.0, 1.17),
    (20.0, 1.12),
    (25.0, 1.06),
    (30.0, 1.00),
    (35.0, 0.94),
    (40.0, 0.87),
    (45.0, 0.79),
    (50.0, 0.71),
    (55.0, 0.61),
    (60.0, 0.50),
];

const AMBIENT_THERMOSETTING_90: &[(f64, f64)] = &[
    (10.0, 1.15),
    (15.0, 1.12),
    (20.0, 1.08),
    (25.0, 1.04),
    (30.0, 1.00),
    (35.0, 0.96),
    (40.0, 0.91),
    (45.0, 0.87),
    (50.0, 0.82),
    (55.0, 0.76),
    (60.0, 0.71),
    (65.0, 0.65),
    (70.0, 0.58),
    (75.0, 0.50),
    (80.0, 0.41),
];

/// (circuits, factor) for cables bunched or enclosed.
const GROUPING_BUNCHED: &[(u32, f64)] = &[
    (1, 1.00),
    (2, 0.80),
    (3, 0.70),
    (4, 0.65),
    (5, 0.60),
    (6, 0.57),
    (7, 0.54),
    (8, 0.52),
    (9, 0.50),
    (12, 0.45),
    (16, 0.41),
    (20, 0.38),
];

/// (mm of run surrounded by insulation, factor); beyond the last row 0.5 applies.
const THERMAL_INSULATION: &[(f64, f64)] = &[
    (50.0, 0.88),
    (100.0, 0.78),
    (200.0, 0.63),
    (400.0, 0.51),
];
const FULLY_SURROUNDED_FACTOR: f64 = 0.50;

fn ambient_table(insulation: Insulation) -> &'static [(f64, f64)] {
    match insulation {
        Insulation::Thermoplastic70 => AMBIENT_THERMOPLASTIC_70,
        Insulation::Thermosetting90 => AMBIENT_THERMOSETTING_90,
    }
}

/// Highest ambient temperature with a tabulated factor for this insulation.
pub fn max_ambient_temperature(insulation: Insulation) -> f64 {
    ambient_table(insulation)
        .last()
        .map(|(t, _)| *t)
        .unwrap_or(30.0)
}

/// Ca. Fails above the highest tabulated ambient for the insulation.
pub fn ambient_temperature_factor(insulation: Insulation, ambient_c: f64) -> Result<f64> {
    let table = ambient_table(insulation);
    table
        .iter()
        .find(|(t, _)| ambient_c <= *t)
        .map(|(_, f)| *f)
        .ok_or_else(|| {
            CalcEngineError::invalid(
                "ambient_temp_c",
                format!(
                    "{ambient_c} °C exceeds the {} °C limit for {insulation} insulation",
                    max_ambient_temperature(insulation)
                ),
            )
        })
}

/// Cg for `circuits` bunched circuits (1 = no grouping).
pub fn grouping_factor(circuits: u32) -> f64 {
    GROUPING_BUNCHED
        .iter()
        .find(|(n, _)| circuits <= *n)
        .map(|(_, f)| *f)
        .unwrap_or(0.38)
}

/// Ci for a cable run through `insulated_mm` of thermal insulation.
pub fn thermal_insulation_factor(insulated_mm: f64) -> f64 {
    if insulated_mm <= 0.0 {
        return 1.0;
    }
    THERMAL_INSULATION
        .iter()
        .find(|(mm, _)| insulated_mm <= *mm)
        .map(|(_, f)| *f)
        .unwrap_or(FULLY_SURROUNDED_FACTOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeratingFactors {
    pub ambient: f64,
    pub grouping: f64,
    pub thermal_insulation: f64,
    pub fuse: f64,
}

impl DeratingFactors {
    pub fn combined(&self) -> f64 {
        self.ambient * self.grouping * self.thermal_insulation * self.fuse
    }
}

impl Default for DeratingFactors {
    fn default() -> Self {
        Self {
            ambient: 1.0,
            grouping: 1.0,
            thermal_insulation: 1.0,
            fuse: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_ambient_is_unity() {
        assert_eq!(
            ambient_temperature_factor(Insulation::Thermoplastic70, 30.0).unwrap(),
            1.0
        );
        assert_eq!(
            ambient_temperature_factor(Insulation::Thermosetting90, 30.0).unwrap(),
            1.0
        );
    }

    #[test]
    fn ambient_steps_to_hotter_row() {
        assert_eq!(
            ambient_temperature_factor(Insulation::Thermoplastic70, 31.0).unwrap(),
            0.94
        );
        assert_eq!(
            ambient_temperature_factor(Insulation::Thermoplastic70, -5.0).unwrap(),
            1.22
        );
    }

    #[test]
    fn ambient_beyond_table_is_invalid() {
        assert!(ambient_temperature_factor(Insulation::Thermoplastic70, 65.0).is_err());
        assert!(ambient_temperature_factor(Insulation::Thermosetting90, 65.0).is_ok());
    }

    #[test]
    fn grouping_rounds_up_circuit_count() {
        assert_eq!(grouping_factor(1), 1.0);
        assert_eq!(grouping_factor(3), 0.70);
        assert_eq!(grouping_factor(10), 0.45);
        assert_eq!(grouping_factor(40), 0.38);
    }

    #[test]
    fn thermal_insulation_rows() {
        assert_eq!(thermal_insulation_factor(0.0), 1.0);
        assert_eq!(thermal_insulation_factor(50.0), 0.88);
        assert_eq!(thermal_insulation_factor(150.0), 0.63);
        assert_eq!(thermal_insulation_factor(600.0), 0.50);
    }

    #[test]
    fn combined_is_product() {
        let factors = DeratingFactors {
            ambient: 0.94,
            grouping: 0.8,
            thermal_insulation: 1.0,
            fuse: 0.725,
        };
        assert!((factors.combined() - 0.94 * 0.8 * 0.725).abs() < 1e-12);
    }
}
