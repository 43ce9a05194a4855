//! ---
//! ecalc_section: "02-calculation-engine"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "BS 7671 calculation, validation and compliance routines."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::{fs, io::BufRead, path::Path};

use serde::Deserialize;

use crate::{
    api::CalcJob,
    errors::{CalcEngineError, Result},
    regulations::Regulations,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum JobFile {
    Many(Vec<CalcJob>),
    One(CalcJob),
}

impl From<JobFile> for Vec<CalcJob> {
    fn from(file: JobFile) -> Self {
        match file {
            JobFile::Many(jobs) => jobs,
            JobFile::One(job) => vec![job],
        }
    }
}

fn looks_like_json(data: &str) -> bool {
    matches!(data.trim_start().chars().next(), Some('{') | Some('['))
}

/// Loads a JSON or YAML request file holding a single job or a list of jobs.
pub fn load_jobs_from_file(path: impl AsRef<Path>) -> Result<Vec<CalcJob>> {
    let data = fs::read_to_string(path)?;
    let file: JobFile = if looks_like_json(&data) {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(CalcEngineError::YamlSerializationFailed)?
    };
    Ok(file.into())
}

/// One JSON job per line; blank lines are skipped.
pub fn load_jobs_from_jsonl(path: impl AsRef<Path>) -> Result<Vec<CalcJob>> {
    let file = fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut jobs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        jobs.push(serde_json::from_str(&line)?);
    }
    Ok(jobs)
}

/// Dispatches on extension: `.jsonl` is line-delimited, anything else goes
/// through [`load_jobs_from_file`].
pub fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<CalcJob>> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") | Some("ndjson") => load_jobs_from_jsonl(path),
        _ => load_jobs_from_file(path),
    }
}

/// Loads an edition override from TOML, YAML or JSON, chosen by extension.
/// Sections left out of the file keep their built-in values; the merged
/// thresholds are validated before they are returned.
pub fn load_regulations_from_file(path: impl AsRef<Path>) -> Result<Regulations> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    let regs: Regulations = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&data)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&data)?,
        Some("json") => serde_json::from_str(&data)?,
        _ if looks_like_json(&data) => serde_json::from_str(&data)?,
        _ => toml::from_str(&data)?,
    };
    regs.validate()?;
    Ok(regs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Calculator;
    use std::io::Write;

    #[test]
    fn yaml_single_job() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "reference: lighting\ncalculator: voltage_drop\ncurrent_a: 10\nlength_m: 20\nvoltage_v: 230\ncircuit_kind: lighting\nconductor:\n  source: explicit\n  mv_per_a_per_m: 18"
        )
        .unwrap();
        let jobs = load_jobs(file.path()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request.calculator(), Calculator::VoltageDrop);
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(
            file,
            r#"{{"calculator":"adiabatic","fault_current_a":1000,"disconnection_time_s":0.4,"csa_mm2":6,"material":"copper","insulation":"thermoplastic70"}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        let jobs = load_jobs(file.path()).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn regulations_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "motor:\n  starting_drop_percent: 15").unwrap();
        let regs = load_regulations_from_file(file.path()).unwrap();
        assert_eq!(regs.motor.starting_drop_percent, 15.0);
        assert_eq!(regs.motor.running_drop_percent, 3.0);
    }

    #[test]
    fn regulations_with_zero_fuse_factor_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[derating]\nsemi_enclosed_fuse_factor = 0.0").unwrap();
        let err = load_regulations_from_file(file.path()).unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("semi_enclosed_fuse_factor"));
    }

    #[test]
    fn regulations_with_nan_tolerance_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[ring]\nend_to_end_similarity_ohm = nan").unwrap();
        assert!(load_regulations_from_file(file.path()).is_err());
    }
}
