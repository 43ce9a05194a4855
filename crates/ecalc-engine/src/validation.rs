//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Shared range checks used by every calculator's validation stage.
//!
//! Formulas downstream divide by these values, so a check that passes here is
//! what makes the evaluators total.

use crate::errors::{CalcEngineError, Result};

pub(crate) fn finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalcEngineError::invalid(field, "must be a finite number"))
    }
}

pub(crate) fn positive(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(CalcEngineError::invalid(
            field,
            format!("must be greater than zero (got {value})"),
        ))
    }
}

pub(crate) fn non_negative(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(CalcEngineError::invalid(
            field,
            format!("must not be negative (got {value})"),
        ))
    }
}

/// Accepts values in the half-open interval (0, 1].
pub(crate) fn fraction(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CalcEngineError::invalid(
            field,
            format!("must be within (0, 1] (got {value})"),
        ))
    }
}

pub(crate) fn at_most(field: &str, value: f64, max: f64) -> Result<()> {
    finite(field, value)?;
    if value <= max {
        Ok(())
    } else {
        Err(CalcEngineError::invalid(
            field,
            format!("must not exceed {max} (got {value})"),
        ))
    }
}

pub(crate) fn positive_opt(field: &str, value: Option<f64>) -> Result<()> {
    value.map_or(Ok(()), |v| positive(field, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan_and_infinity() {
        assert!(positive("power_kw", f64::NAN).is_err());
        assert!(non_negative("length_m", f64::INFINITY).is_err());
    }

    #[test]
    fn fraction_bounds() {
        assert!(fraction("efficiency", 1.0).is_ok());
        assert!(fraction("efficiency", 0.0).is_err());
        assert!(fraction("efficiency", 1.01).is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = positive("voltage_v", -1.0).unwrap_err();
        assert!(err.to_string().contains("voltage_v"));
        assert!(err.is_input_error());
    }
}
