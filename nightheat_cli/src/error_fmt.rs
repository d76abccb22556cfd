//! Human-readable error descriptions and structured JSON error formatting.

use nightheat_core::error::{BuildError, ThermoError};

/// Errors raised by the CLI itself before the core is involved.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("profile store check failed: {0}")]
    Profiles(String),
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing file, a typo, or an out-of-range value in the TOML.\nHow to fix: Edit the config file (see etc/nightheat.toml), then rerun."
            ),
            CliError::Profiles(msg) => format!(
                "What happened: Some stored profiles are unusable ({msg}).\nLikely causes: Malformed HH:MM times or unknown timezone names.\nHow to fix: Correct the listed profiles in the profile store."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: The controller could not be assembled ({be}).\nLikely causes: Invalid [runner] or [retry] values.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(te) = err.downcast_ref::<ThermoError>() {
        return match te {
            ThermoError::Persistence(msg) => format!(
                "What happened: The profile store could not be read ({msg}).\nLikely causes: store.profiles_path points to a missing or malformed file.\nHow to fix: Check the path and the file contents, then rerun."
            ),
            ThermoError::InvalidTimeFormat(msg) => format!(
                "What happened: A clock time is invalid ({msg}).\nHow to fix: Use 24-hour HH:MM, e.g. 22:30."
            ),
            ThermoError::InvalidTimezone(msg) => format!(
                "What happened: Unknown timezone ({msg}).\nHow to fix: Use an IANA name such as Europe/Berlin or America/New_York."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes.
///
/// 2 profile fetch failure, 3 invalid config, 4 invalid time or timezone input,
/// 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<CliError>().is_some_and(|e| matches!(e, CliError::Config(_)))
        || err.downcast_ref::<BuildError>().is_some()
    {
        return 3;
    }
    match err.downcast_ref::<ThermoError>() {
        Some(ThermoError::Persistence(_)) => 2,
        Some(ThermoError::InvalidTimeFormat(_) | ThermoError::InvalidTimezone(_)) => 4,
        _ => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => "InvalidConfig",
            CliError::Profiles(_) => "InvalidProfiles",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<ThermoError>() {
        Some(ThermoError::InvalidTimeFormat(_)) => "InvalidTimeFormat",
        Some(ThermoError::InvalidTimezone(_)) => "InvalidTimezone",
        Some(ThermoError::Auth(_)) => "Auth",
        Some(ThermoError::DeviceApi(_)) => "DeviceApi",
        Some(ThermoError::DeviceRejected(_)) => "DeviceRejected",
        Some(ThermoError::Persistence(_)) => "Persistence",
        Some(ThermoError::DeadlineExceeded(_)) => "DeadlineExceeded",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(ThermoError::Persistence("gone".into())), 2, "Persistence")]
    #[case(eyre::Report::new(CliError::Config("bad".into())), 3, "InvalidConfig")]
    #[case(eyre::Report::new(BuildError::MissingStore), 3, "InvalidConfig")]
    #[case(eyre::Report::new(ThermoError::InvalidTimezone("X".into())), 4, "InvalidTimezone")]
    #[case(eyre::Report::new(ThermoError::InvalidTimeFormat("25:00".into())), 4, "InvalidTimeFormat")]
    #[case(eyre::eyre!("boom"), 1, "Error")]
    fn codes_and_reasons(#[case] err: eyre::Report, #[case] code: i32, #[case] reason: &str) {
        assert_eq!(exit_code_for_error(&err), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], reason);
        assert!(v["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}
