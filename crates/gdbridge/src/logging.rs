// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging setup and engine console forwarding.
//!
//! Diagnostics go through the `log` facade. Errors raised while the engine is
//! calling into the extension are also printed through the engine's own
//! `print_error` entry so they show up in the editor's output panel.

use std::ffi::CString;
use std::panic::Location;

use crate::abi::{FALSE, TRUE};
use crate::config::config;
use crate::host;

/// Install a console logger at `level`.
///
/// Returns `false` if a logger was already installed.
pub fn init(level: log::LevelFilter) -> bool {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Install a console logger honoring `RUST_LOG`, falling back to the configured
/// `GDBRIDGE_LOG_LEVEL`.
pub fn init_from_env() -> bool {
    let default_level = config().log_level;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.to_string()),
    )
    .format_timestamp_millis()
    .try_init()
    .is_ok()
}

fn c_text(text: &str) -> CString {
    CString::new(text.replace('\0', " ")).unwrap_or_default()
}

/// Report an error to the log and, when loaded, the engine console.
#[track_caller]
pub fn report_error(message: &str) {
    let location = Location::caller();
    log::error!("{message} ({}:{})", location.file(), location.line());
    if let Some(host) = host::try_host() {
        let description = c_text(message);
        let function = c_text("gdbridge");
        let file = c_text(location.file());
        unsafe {
            (host.abi.print_error)(
                description.as_ptr(),
                function.as_ptr(),
                file.as_ptr(),
                location.line() as i32,
                TRUE,
            );
        }
    }
}

/// Report a warning; mirrored to the engine only with `GDBRIDGE_ENGINE_WARNINGS=1`.
#[track_caller]
pub fn report_warning(message: &str) {
    let location = Location::caller();
    log::warn!("{message}");
    if !config().engine_warnings {
        return;
    }
    if let Some(host) = host::try_host() {
        let description = c_text(message);
        let function = c_text("gdbridge");
        let file = c_text(location.file());
        unsafe {
            (host.abi.print_warning)(
                description.as_ptr(),
                function.as_ptr(),
                file.as_ptr(),
                location.line() as i32,
                FALSE,
            );
        }
    }
}

/// Report a contract violation and stop.
///
/// Panicking inside an `extern "C"` callback aborts the process, which is the
/// intended outcome for authoring mistakes discovered at runtime.
#[track_caller]
pub fn fatal(message: &str) -> ! {
    report_error(message);
    panic!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_nul_does_not_drop_message() {
        assert_eq!(c_text("a\0b").to_str().expect("utf8"), "a b");
    }

    #[test]
    fn second_init_is_rejected() {
        let _ = init(log::LevelFilter::Debug);
        assert!(!init(log::LevelFilter::Debug));
    }
}
