use crate::payload::decoder::{DecodeSummary, DecodedField, FrameEnd};
use log::{debug, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Initializes `env_logger` with `default_filter` used when `RUST_LOG` is
/// unset. Safe to call more than once; later calls are ignored.
pub fn init_logger_with_default(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        debug!("Logger already initialized");
    }
}

/// Logs one decoded field at debug level.
pub fn log_field(field: &DecodedField) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    match (&field.error, &field.text) {
        (Some(error), _) => debug!("{}: error: {error}", field.name),
        (None, Some(text)) => debug!("{} = {text:?}", field.name),
        (None, None) => debug!("{} = {}", field.name, field.value),
    }
}

/// Logs how a frame decode ended. Anything other than a clean end is a warning.
pub fn log_decode_summary(summary: &DecodeSummary) {
    match summary.end {
        FrameEnd::Exhausted { .. } | FrameEnd::EndMarker if summary.errors == 0 => {
            info!("Decoded {} fields", summary.fields)
        }
        FrameEnd::UnknownKey(key) => warn!(
            "Decoding stopped at unassigned key {key} after {} fields",
            summary.fields
        ),
        end => warn!(
            "Decoded {} fields with {} errors, ended {end:?}",
            summary.fields, summary.errors
        ),
    }
}
