//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Tabulated current-carrying capacities (A) and two-core voltage drop
//! (mV/A/m) for copper cables, per BS 7671 Appendix 4 reference methods.
//! A capacity of zero means the installation method does not apply.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::model::Insulation;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CableType {
    /// 6242Y flat twin and earth.
    PvcTwinEarth,
    /// 6491X single-core thermoplastic.
    PvcSingle,
    /// 6944X steel wire armoured, thermosetting.
    SwaXlpe,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
)]
pub enum ReferenceMethod {
    A1,
    A2,
    B1,
    B2,
    C,
    D1,
    D2,
    E,
    F,
    G,
}

impl ReferenceMethod {
    fn column(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CableRow {
    pub csa_mm2: f64,
    capacities: [f64; 10],
    pub mv_per_a_per_m: f64,
}

impl CableRow {
    pub fn capacity(&self, method: ReferenceMethod) -> Option<f64> {
        let rating = self.capacities[method.column()];
        (rating > 0.0).then_some(rating)
    }
}

const fn row(csa_mm2: f64, capacities: [f64; 10], mv_per_a_per_m: f64) -> CableRow {
    CableRow {
        csa_mm2,
        capacities,
        mv_per_a_per_m,
    }
}

//                       A1     A2     B1     B2     C      D1     D2     E      F      G
const PVC_TWIN_EARTH: &[CableRow] = &[
    row(1.0, [11.0, 13.0, 13.0, 16.0, 20.0, 0.0, 0.0, 22.0, 0.0, 0.0], 44.0),
    row(1.5, [14.0, 16.0, 17.0, 20.0, 26.0, 0.0, 0.0, 29.0, 0.0, 0.0], 29.0),
    row(2.5, [18.0, 21.0, 23.0, 27.0, 36.0, 0.0, 0.0, 39.0, 0.0, 0.0], 18.0),
    row(4.0, [24.0, 28.0, 30.0, 36.0, 49.0, 0.0, 0.0, 53.0, 0.0, 0.0], 11.0),
    row(6.0, [31.0, 36.0, 38.0, 46.0, 62.0, 0.0, 0.0, 69.0, 0.0, 0.0], 7.3),
    row(10.0, [42.0, 50.0, 52.0, 63.0, 85.0, 0.0, 0.0, 94.0, 0.0, 0.0], 4.4),
];

const PVC_SINGLE: &[CableRow] = &[
    row(1.0, [13.0, 15.0, 16.0, 19.0, 24.0, 0.0, 0.0, 26.0, 25.0, 28.0], 44.0),
    row(1.5, [16.0, 19.0, 20.0, 24.0, 31.0, 0.0, 0.0, 34.0, 32.0, 36.0], 29.0),
    row(2.5, [22.0, 26.0, 28.0, 33.0, 42.0, 0.0, 0.0, 46.0, 44.0, 49.0], 18.0),
    row(4.0, [29.0, 34.0, 37.0, 44.0, 56.0, 0.0, 0.0, 61.0, 58.0, 65.0], 11.0),
    row(6.0, [37.0, 44.0, 47.0, 56.0, 71.0, 0.0, 0.0, 78.0, 74.0, 83.0], 7.3),
    row(10.0, [51.0, 60.0, 64.0, 76.0, 96.0, 0.0, 0.0, 105.0, 100.0, 112.0], 4.4),
    row(16.0, [68.0, 80.0, 85.0, 101.0, 128.0, 0.0, 0.0, 140.0, 133.0, 149.0], 2.8),
    row(25.0, [89.0, 105.0, 112.0, 133.0, 168.0, 0.0, 0.0, 184.0, 175.0, 196.0], 1.75),
    row(35.0, [110.0, 130.0, 138.0, 164.0, 207.0, 0.0, 0.0, 227.0, 216.0, 242.0], 1.25),
    row(50.0, [134.0, 158.0, 168.0, 200.0, 252.0, 0.0, 0.0, 276.0, 263.0, 294.0], 0.93),
    row(70.0, [171.0, 203.0, 216.0, 257.0, 324.0, 0.0, 0.0, 355.0, 338.0, 378.0], 0.64),
    row(95.0, [209.0, 247.0, 263.0, 312.0, 393.0, 0.0, 0.0, 431.0, 410.0, 458.0], 0.46),
    row(120.0, [241.0, 285.0, 304.0, 361.0, 454.0, 0.0, 0.0, 498.0, 474.0, 530.0], 0.37),
    row(150.0, [275.0, 325.0, 347.0, 412.0, 519.0, 0.0, 0.0, 569.0, 542.0, 606.0], 0.30),
    row(185.0, [314.0, 371.0, 396.0, 470.0, 593.0, 0.0, 0.0, 650.0, 619.0, 692.0], 0.24),
    row(240.0, [364.0, 430.0, 459.0, 545.0, 687.0, 0.0, 0.0, 754.0, 717.0, 802.0], 0.18),
    row(300.0, [419.0, 495.0, 528.0, 627.0, 792.0, 0.0, 0.0, 868.0, 826.0, 924.0], 0.145),
    row(400.0, [486.0, 574.0, 613.0, 727.0, 918.0, 0.0, 0.0, 1007.0, 958.0, 1072.0], 0.113),
];

const SWA_XLPE: &[CableRow] = &[
    row(1.5, [0.0, 0.0, 0.0, 0.0, 32.0, 25.0, 27.0, 36.0, 34.0, 38.0], 29.0),
    row(2.5, [0.0, 0.0, 0.0, 0.0, 43.0, 33.0, 36.0, 48.0, 46.0, 51.0], 18.0),
    row(4.0, [0.0, 0.0, 0.0, 0.0, 57.0, 44.0, 48.0, 64.0, 61.0, 68.0], 11.0),
    row(6.0, [0.0, 0.0, 0.0, 0.0, 73.0, 56.0, 61.0, 82.0, 78.0, 87.0], 7.3),
    row(10.0, [0.0, 0.0, 0.0, 0.0, 98.0, 75.0, 81.0, 110.0, 105.0, 117.0], 4.4),
    row(16.0, [0.0, 0.0, 0.0, 0.0, 131.0, 100.0, 108.0, 147.0, 140.0, 156.0], 2.8),
    row(25.0, [0.0, 0.0, 0.0, 0.0, 168.0, 128.0, 138.0, 189.0, 180.0, 200.0], 1.75),
    row(35.0, [0.0, 0.0, 0.0, 0.0, 201.0, 153.0, 165.0, 226.0, 215.0, 239.0], 1.25),
    row(50.0, [0.0, 0.0, 0.0, 0.0, 242.0, 184.0, 198.0, 272.0, 259.0, 288.0], 0.93),
    row(70.0, [0.0, 0.0, 0.0, 0.0, 310.0, 236.0, 254.0, 348.0, 331.0, 368.0], 0.64),
    row(95.0, [0.0, 0.0, 0.0, 0.0, 375.0, 285.0, 307.0, 421.0, 400.0, 445.0], 0.46),
    row(120.0, [0.0, 0.0, 0.0, 0.0, 431.0, 328.0, 353.0, 484.0, 460.0, 512.0], 0.37),
    row(150.0, [0.0, 0.0, 0.0, 0.0, 491.0, 374.0, 402.0, 551.0, 524.0, 583.0], 0.30),
    row(185.0, [0.0, 0.0, 0.0, 0.0, 557.0, 424.0, 456.0, 625.0, 594.0, 661.0], 0.24),
    row(240.0, [0.0, 0.0, 0.0, 0.0, 641.0, 488.0, 525.0, 720.0, 684.0, 762.0], 0.18),
    row(300.0, [0.0, 0.0, 0.0, 0.0, 738.0, 562.0, 605.0, 829.0, 788.0, 877.0], 0.145),
    row(400.0, [0.0, 0.0, 0.0, 0.0, 855.0, 651.0, 701.0, 960.0, 912.0, 1015.0], 0.113),
];

impl CableType {
    pub fn rows(&self) -> &'static [CableRow] {
        match self {
            CableType::PvcTwinEarth => PVC_TWIN_EARTH,
            CableType::PvcSingle => PVC_SINGLE,
            CableType::SwaXlpe => SWA_XLPE,
        }
    }

    pub fn insulation(&self) -> Insulation {
        match self {
            CableType::PvcTwinEarth | CableType::PvcSingle => Insulation::Thermoplastic70,
            CableType::SwaXlpe => Insulation::Thermosetting90,
        }
    }

    pub fn row(&self, csa_mm2: f64) -> Option<&'static CableRow> {
        self.rows()
            .iter()
            .find(|r| (r.csa_mm2 - csa_mm2).abs() < 1e-9)
    }

    pub fn capacity(&self, method: ReferenceMethod, csa_mm2: f64) -> Option<f64> {
        self.row(csa_mm2).and_then(|r| r.capacity(method))
    }

    pub fn mv_per_a_per_m(&self, csa_mm2: f64) -> Option<f64> {
        self.row(csa_mm2).map(|r| r.mv_per_a_per_m)
    }

    pub fn supports(&self, method: ReferenceMethod) -> bool {
        self.rows().iter().any(|r| r.capacity(method).is_some())
    }

    pub fn supported_methods(&self) -> Vec<ReferenceMethod> {
        ReferenceMethod::iter().filter(|m| self.supports(*m)).collect()
    }

    /// Smallest size whose tabulated capacity for `method` is at least `current_a`.
    pub fn smallest_for(&self, method: ReferenceMethod, current_a: f64) -> Option<&'static CableRow> {
        self.rows()
            .iter()
            .find(|r| r.capacity(method).is_some_and(|c| c >= current_a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn twin_and_earth_clipped_direct() {
        assert_eq!(
            CableType::PvcTwinEarth.capacity(ReferenceMethod::C, 2.5),
            Some(36.0)
        );
        assert_eq!(CableType::PvcTwinEarth.mv_per_a_per_m(2.5), Some(18.0));
    }

    #[test]
    fn unsupported_method_has_no_capacity() {
        assert_eq!(CableType::PvcTwinEarth.capacity(ReferenceMethod::D1, 2.5), None);
        assert!(!CableType::SwaXlpe.supports(ReferenceMethod::A1));
        assert_eq!(
            CableType::PvcTwinEarth.supported_methods(),
            vec![
                ReferenceMethod::A1,
                ReferenceMethod::A2,
                ReferenceMethod::B1,
                ReferenceMethod::B2,
                ReferenceMethod::C,
                ReferenceMethod::E
            ]
        );
    }

    #[test]
    fn smallest_size_search() {
        let row = CableType::PvcTwinEarth
            .smallest_for(ReferenceMethod::C, 30.0)
            .unwrap();
        assert_eq!(row.csa_mm2, 2.5);
        assert!(CableType::PvcTwinEarth
            .smallest_for(ReferenceMethod::C, 200.0)
            .is_none());
    }

    #[test]
    fn single_core_and_armoured_reach_400() {
        for cable in [CableType::PvcSingle, CableType::SwaXlpe] {
            assert_eq!(cable.rows().last().map(|r| r.csa_mm2), Some(400.0));
        }
        assert_eq!(CableType::PvcSingle.capacity(ReferenceMethod::E, 400.0), Some(1007.0));
        assert_eq!(CableType::SwaXlpe.mv_per_a_per_m(300.0), Some(0.145));
        let row = CableType::SwaXlpe
            .smallest_for(ReferenceMethod::C, 400.0)
            .unwrap();
        assert_eq!(row.csa_mm2, 120.0);
    }

    #[test]
    fn tables_ascend() {
        for cable in CableType::iter() {
            assert!(cable
                .rows()
                .windows(2)
                .all(|w| w[0].csa_mm2 < w[1].csa_mm2 && w[0].mv_per_a_per_m > w[1].mv_per_a_per_m));
        }
    }

    #[test]
    fn parses_kebab_case_names() {
        assert_eq!(CableType::from_str("swa-xlpe").unwrap(), CableType::SwaXlpe);
        assert_eq!(CableType::PvcTwinEarth.to_string(), "pvc-twin-earth");
        assert_eq!(ReferenceMethod::from_str("B2").unwrap(), ReferenceMethod::B2);
    }
}
