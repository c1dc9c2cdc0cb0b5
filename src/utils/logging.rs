//! Logger setup plus conditional logging macros gated on a module-level
//! `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("This will log if ENABLE_LOGS is true");
//! ```

use std::env;

use log::LevelFilter;

pub const DEBUG_ENV: &str = "DESKLAMP_DEBUG";

/// Stdout carries native-messaging frames, so all logging goes to stderr.
/// `RUST_LOG` wins; otherwise `info`, or `debug` when `DESKLAMP_DEBUG` is set.
pub fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder
        .target(env_logger::Target::Stderr)
        .filter_level(default_level(env::var(DEBUG_ENV).ok().as_deref()))
        .parse_default_env();

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

fn default_level(debug_flag: Option<&str>) -> LevelFilter {
    match debug_flag.map(str::trim) {
        Some("") | Some("0") | Some("false") | None => LevelFilter::Info,
        Some(_) => LevelFilter::Debug,
    }
}

/// Conditional info logging; the calling module must define `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging; the calling module must define `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging; the calling module must define `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
