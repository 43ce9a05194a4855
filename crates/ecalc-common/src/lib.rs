//! ---
//! ecalc_section: "01-core-functionality"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Shared configuration and tracing setup."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
//! Configuration loading and tracing initialisation shared by the ecalc
//! binaries. The calculation engine itself depends on neither.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, DefaultsConfig, LoadedAppConfig, LoggingConfig, RegulationsConfig, ReportsConfig,
};
pub use logging::{init_tracing, LogFormat};
