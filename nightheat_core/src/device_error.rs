//! Maps `Box<dyn Error>` from trait boundaries to typed `ThermoError`.
//!
//! The traits in `nightheat_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts device errors to our typed enum,
//! with an optional feature-gated path for `nightheat_device::DeviceError`
//! downcasting.

use crate::error::ThermoError;

/// Map a device-call error to a typed `ThermoError`.
///
/// Attempts to downcast known device error types first, then falls back
/// to string-based heuristics. Validation failures map to `DeviceRejected`
/// (never retried); everything else is a transient `DeviceApi`.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> ThermoError {
    // Feature-gated: try to downcast to DeviceError for precise mapping
    #[cfg(feature = "device-errors")]
    {
        use nightheat_device::error::DeviceError;
        if let Some(de) = e.downcast_ref::<DeviceError>() {
            return match de {
                DeviceError::Rejected(msg) => ThermoError::DeviceRejected(msg.clone()),
                DeviceError::Status { code, .. } if (400..500).contains(code) && *code != 429 => {
                    ThermoError::DeviceRejected(de.to_string())
                }
                other => ThermoError::DeviceApi(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("rejected") || lower.contains("out of range") {
        ThermoError::DeviceRejected(s)
    } else {
        ThermoError::DeviceApi(s)
    }
}
