//! ---
//! ecalc_section: "03-logging"
//! ecalc_subsection: "module"
//! ecalc_type: "source"
//! ecalc_scope: "code"
//! ecalc_description: "Structured calculation logging helpers."
//! ecalc_version: "v0.1.0"
//! ecalc_owner: "tbd"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __calc_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        $crate::__tracing::event!(
            $level,
            job = ctx.job.unwrap_or(""),
            circuit = ctx.circuit.unwrap_or(""),
            calculator = ctx.calculator.unwrap_or(""),
            edition = ctx.edition.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with calculation context.
#[macro_export]
macro_rules! calc_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with calculation context.
#[macro_export]
macro_rules! calc_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with calculation context.
#[macro_export]
macro_rules! calc_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__calc_event!($crate::__tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
