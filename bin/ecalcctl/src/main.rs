//! ---
//! ecalc_section: "04-interfaces"
//! ecalc_subsection: "binary"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Command-line front end for the calculation engine."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ecalc_common::{config::AppConfig, init_tracing, LogFormat};
use ecalc_engine::{
    api::run_request, io::load_regulations_from_file, regulations::Regulations, CalcRequest,
};
use ecalc_logging::{log_calc_event, CalcEventOutcome, LogContext};
use tracing::debug;

mod batch;
mod calc;

const CONFIG_CANDIDATES: &[&str] = &["ecalc.toml", "configs/ecalc.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "BS 7671 electrical design calculations",
    long_about = None
)]
struct Cli {
    /// Configuration file; otherwise ECALC_CONFIG, then ./ecalc.toml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Regulations override (TOML, YAML or JSON); wins over the configured path.
    #[arg(long, global = true, value_name = "FILE")]
    regulations: Option<PathBuf>,

    /// Console log format.
    #[arg(long = "log-format", global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Disable the rolling log file.
    #[arg(long = "no-log-file", global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Motor full-load and starting current.
    Motor(calc::MotorArgs),
    /// Ring final circuit continuity.
    Ring(calc::RingArgs),
    /// Voltage drop along a run.
    VoltageDrop(calc::VoltageDropArgs),
    /// Cable selection with derating.
    Cable(calc::CableArgs),
    /// Adiabatic conductor withstand.
    Adiabatic(calc::AdiabaticArgs),
    /// Earth fault loop impedance.
    Zs(calc::ZsArgs),
    /// Run a request file and export reports.
    Batch(batch::BatchCommand),
    /// Print the effective regulations as TOML.
    Regulations,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    StructuredJson,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::StructuredJson => LogFormat::StructuredJson,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::load_with_source(CONFIG_CANDIDATES)?.config,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    if cli.no_log_file {
        config.logging.file_enabled = false;
    }
    Ok(config)
}

fn load_regulations(cli: &Cli, config: &AppConfig) -> Result<Regulations> {
    match cli.regulations.as_ref().or(config.regulations.path.as_ref()) {
        Some(path) => load_regulations_from_file(path)
            .with_context(|| format!("unable to load regulations from {}", path.display())),
        None => Ok(Regulations::default()),
    }
}

fn run_single(request: CalcRequest, regs: &Regulations) -> Result<()> {
    let calculator = request.calculator().to_string();
    let ctx = LogContext::new()
        .with_calculator(&calculator)
        .with_edition(&regs.edition);

    let outcome = match run_request(&request, regs) {
        Ok(outcome) => outcome,
        Err(err) => {
            log_calc_event(
                Some(&ctx),
                "calc.run",
                &err.to_string(),
                CalcEventOutcome::Failed,
            );
            return Err(err.into());
        }
    };

    let status = outcome.status();
    log_calc_event(
        Some(&ctx),
        "calc.run",
        &status.to_string(),
        if status.is_compliant() {
            CalcEventOutcome::Compliant
        } else {
            CalcEventOutcome::Flagged
        },
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing("ecalcctl", &config.logging)?;
    let regs = load_regulations(&cli, &config)?;
    debug!(edition = %regs.edition, "regulations loaded");

    let defaults = &config.defaults;
    match cli.command {
        Commands::Motor(args) => run_single(args.into_request(defaults), &regs)?,
        Commands::Ring(args) => run_single(args.into_request()?, &regs)?,
        Commands::VoltageDrop(args) => run_single(args.into_request(defaults)?, &regs)?,
        Commands::Cable(args) => run_single(args.into_request(defaults), &regs)?,
        Commands::Adiabatic(args) => run_single(args.into_request(), &regs)?,
        Commands::Zs(args) => run_single(args.into_request(), &regs)?,
        Commands::Batch(cmd) => {
            if cmd.execute(&regs, config.reports.directory.clone())? {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Regulations => {
            print!(
                "{}",
                toml::to_string_pretty(&regs).context("unable to render regulations")?
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
