use std::sync::OnceLock;

use thiserror::Error;

/// Labels the fallback implementations in telemetry emitted by consumers
/// that also run accelerated backends.
pub const BACKEND: &str = "fallback";

/// Hook signature: algorithm, operation, backend, success.
pub type TelemetryHook = fn(&'static str, &'static str, &'static str, bool);

static TELEMETRY_HOOK: OnceLock<TelemetryHook> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TelemetryHookError {
    #[error("crypto fallback telemetry hook already installed")]
    AlreadyInstalled,
}

/// Install a process-wide observer for key-derivation outcomes. The hook
/// can be installed once; later calls fail.
pub fn install_telemetry_hook(hook: TelemetryHook) -> Result<(), TelemetryHookError> {
    TELEMETRY_HOOK
        .set(hook)
        .map_err(|_| TelemetryHookError::AlreadyInstalled)
}

pub(crate) fn record(algorithm: &'static str, operation: &'static str, success: bool) {
    if let Some(hook) = TELEMETRY_HOOK.get() {
        hook(algorithm, operation, BACKEND, success);
    }
}
