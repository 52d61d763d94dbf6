// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging macros shared by the pulsegen crates.
//!
//! All records go through the `log` facade with a `pulsegen.rust::<module>` target,
//! so that a single logger configuration (e.g. `pyo3-log` on the Python side)
//! can route them.

use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        pulsegen_log::_log::info!(target: concat!("pulsegen.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        pulsegen_log::_log::info!(target: concat!("pulsegen.rust::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        pulsegen_log::_log::warn!(target: concat!("pulsegen.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        pulsegen_log::_log::warn!(target: concat!("pulsegen.rust::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at info level if diagnostics logging is enabled.
///
/// Diagnostics are per-pulse details (window bounds, clipping, resolution order)
/// that are too verbose for regular runs.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if pulsegen_log::is_diagnostics_enabled() {
            pulsegen_log::_log::info!(target: concat!("pulsegen.rust::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if pulsegen_log::is_diagnostics_enabled() {
            pulsegen_log::_log::info!(target: concat!("pulsegen.rust::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Initialize the logging.
///
/// Meant to be called once at start-up. No concrete logger is installed here;
/// the host (the Python extension through `pyo3-log`) owns the logger. This only
/// toggles whether diagnostics are emitted.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}
