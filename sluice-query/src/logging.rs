//! Opt-in subscriber setup for the engine's `tracing` output.
//!
//! The engine itself only emits events: optimizer selection and pushdown
//! rewrites at `debug`, resource-release failures at `warn`. Embedders
//! with their own subscriber can ignore this module entirely; binaries
//! that want output without wiring `tracing-subscriber` themselves call
//! [`init`] once at startup and control it through the environment:
//!
//! - `SLUICE_DEBUG=1|true|yes` turns on debug-level output
//! - `SLUICE_LOG_LEVEL=trace|debug|info|warn|error` overrides the level
//! - `SLUICE_LOG_FORMAT=json|pretty|compact` picks the format (default json)
//!
//! With neither `SLUICE_DEBUG` nor `SLUICE_LOG_LEVEL` set, [`init`] does
//! nothing. The subscriber itself is only available with the `logging`
//! feature.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn debug_requested() -> bool {
    env::var("SLUICE_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// The level the environment asks for: a valid `SLUICE_LOG_LEVEL` wins,
/// otherwise `debug` under `SLUICE_DEBUG` and `warn` without it.
fn effective_level() -> &'static str {
    let fallback = if debug_requested() { "debug" } else { "warn" };
    match env::var("SLUICE_LOG_LEVEL") {
        Ok(v) => LEVELS
            .iter()
            .find(|l| v.eq_ignore_ascii_case(l))
            .copied()
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}

/// Install the global subscriber, once.
///
/// A no-op unless the environment asks for output, and on every call
/// after the first.
pub fn init() {
    INIT.call_once(|| {
        if !debug_requested() && env::var("SLUICE_LOG_LEVEL").is_err() {
            return;
        }
        install_subscriber();
    });
}

/// Install the global subscriber at an explicit level, once.
///
/// # Safety
///
/// Sets `SLUICE_LOG_LEVEL` in the process environment, which is unsound
/// while other threads run. Call at startup, before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented contract; the caller invokes this before any
    // threads exist.
    unsafe {
        env::set_var("SLUICE_LOG_LEVEL", level);
    }
    init();
}

#[cfg(feature = "logging")]
fn install_subscriber() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = effective_level();
    let filter = EnvFilter::try_new(format!(
        "sluice_query={level},sluice_runtime={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match env::var("SLUICE_LOG_FORMAT").as_deref() {
        Ok("pretty") => registry.with(fmt::layer().pretty()).init(),
        Ok("compact") => registry.with(fmt::layer().compact()).init(),
        _ => registry.with(fmt::layer().json()).init(),
    }

    tracing::info!(level, "sluice logging initialized");
}

#[cfg(not(feature = "logging"))]
fn install_subscriber() {
    // without the feature the host application owns the subscriber
}

#[cfg(test)]
mod tests {
    use super::*;

    // one sequential test: these share process-global environment state
    #[test]
    fn test_level_resolution() {
        unsafe {
            env::remove_var("SLUICE_DEBUG");
            env::remove_var("SLUICE_LOG_LEVEL");
        }
        assert!(!debug_requested());
        assert_eq!(effective_level(), "warn");

        unsafe {
            env::set_var("SLUICE_DEBUG", "yes");
        }
        assert!(debug_requested());
        assert_eq!(effective_level(), "debug");

        unsafe {
            env::set_var("SLUICE_LOG_LEVEL", "TRACE");
        }
        assert_eq!(effective_level(), "trace");

        // an unrecognized level falls back
        unsafe {
            env::set_var("SLUICE_LOG_LEVEL", "verbose");
        }
        assert_eq!(effective_level(), "debug");

        unsafe {
            env::remove_var("SLUICE_DEBUG");
            env::remove_var("SLUICE_LOG_LEVEL");
        }
    }
}
