//! ---
//! ecalc_section: "03-logging"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Structured calculation logging helpers."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-carrying logging for calculation runs.

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Batch or job reference the event belongs to.
    pub job: Option<&'a str>,
    /// Circuit reference, e.g. a distribution board way.
    pub circuit: Option<&'a str>,
    /// Calculator family name.
    pub calculator: Option<&'a str>,
    /// Regulations edition in force.
    pub edition: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a job reference.
    pub fn with_job(mut self, job: &'a str) -> Self {
        self.job = Some(job);
        self
    }

    /// Attach a circuit reference.
    pub fn with_circuit(mut self, circuit: &'a str) -> Self {
        self.circuit = Some(circuit);
        self
    }

    /// Attach the calculator family.
    pub fn with_calculator(mut self, calculator: &'a str) -> Self {
        self.calculator = Some(calculator);
        self
    }

    /// Attach the regulations edition.
    pub fn with_edition(mut self, edition: &'a str) -> Self {
        self.edition = Some(edition);
        self
    }
}

/// Outcome recorded when a calculation or batch finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcEventOutcome {
    /// Completed and every check passed.
    Compliant,
    /// Completed with at least one failed check.
    Flagged,
    /// Input was rejected or the run aborted.
    Failed,
}

impl CalcEventOutcome {
    /// Stable lowercase name written to the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcEventOutcome::Compliant => "compliant",
            CalcEventOutcome::Flagged => "flagged",
            CalcEventOutcome::Failed => "failed",
        }
    }
}

/// Emit a standardized calculation event; the level follows the outcome.
pub fn log_calc_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: CalcEventOutcome,
) {
    let ctx = context.copied().unwrap_or_default();
    match outcome {
        CalcEventOutcome::Compliant => {
            calc_info!(context = ctx, "{event} [{}] {message}", outcome.as_str())
        }
        CalcEventOutcome::Flagged => {
            calc_warn!(context = ctx, "{event} [{}] {message}", outcome.as_str())
        }
        CalcEventOutcome::Failed => tracing::error!(
            job = ctx.job.unwrap_or(""),
            circuit = ctx.circuit.unwrap_or(""),
            calculator = ctx.calculator.unwrap_or(""),
            edition = ctx.edition.unwrap_or(""),
            outcome = outcome.as_str(),
            "{event} {message}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .finish(),
        )
    }

    #[test]
    fn macros_emit_without_panic() {
        let _guard = capture();
        let ctx = LogContext::new()
            .with_job("batch-1")
            .with_circuit("DB1/4");
        calc_info!(context = ctx, "ring continuity evaluated");
        calc_debug!("debug message");
        calc_warn!(context = ctx.with_calculator("voltage_drop"), "drop {:.2}%", 5.2);
    }

    #[test]
    fn calc_event_helper_emits() {
        let _guard = capture();
        let ctx = LogContext::new().with_edition("BS 7671:2018+A2:2022");
        log_calc_event(
            Some(&ctx),
            "calc.run",
            "all checks passed",
            CalcEventOutcome::Compliant,
        );
        log_calc_event(None, "calc.run", "input rejected", CalcEventOutcome::Failed);
    }

    #[test]
    fn outcome_names_are_stable() {
        assert_eq!(CalcEventOutcome::Flagged.as_str(), "flagged");
    }
}
