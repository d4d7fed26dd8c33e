//! Hand gesture recognition for remote device control.
//!
//! Clients post webcam frames to `POST /gesture`. Each frame is decoded, searched for a hand, and
//! the number of extended fingers on that hand is turned into one [`Command`]:
//!
//! ```text
//! data URL ── decode ──▶ Image ── HandDetector ──▶ HandObservation ── classify ──▶ Command
//! ```
//!
//! # Environment Variables
//!
//! * `HANDCTL_MODEL`: path to the ONNX hand landmark network (same as `--model`).
//! * `HANDCTL_HOST`, `HANDCTL_PORT`: address to listen on (defaults to `0.0.0.0:5000`).
//! * `RUST_LOG`: overrides the log filter set up by [`init_logger!`].
//!
//! [`Command`]: gesture::Command

use log::LevelFilter;

pub mod config;
pub mod detector;
pub mod error;
pub mod gesture;
pub mod hand;
pub mod landmark;
pub mod nn;
pub mod pipeline;
pub mod server;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("handctl_image"), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and handctl will log at *debug*
/// level. Otherwise, they will log at *info* level, which includes one line per detected gesture.
///
/// `tract` always logs at *warn* level. `RUST_LOG` overrides all of these.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
