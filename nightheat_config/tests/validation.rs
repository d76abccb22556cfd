use nightheat_config::{DeviceBackend, TriggerMode, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[schedule]
lead_time_minutes = 180
mid_stage_offset_minutes = 60
final_stage_lead_minutes = 120
warming_enabled = true
warming_lead_minutes = 30
warming_level = 2
trigger_mode = "proximity"
proximity_window_minutes = 15

[retry]
max_attempts = 3
base_delay_ms = 1000

[runner]
concurrency = 8
profile_deadline_ms = 20000

[store]
profiles_path = "/var/lib/nightheat/profiles.toml"

[logging]
file = "/var/log/nightheat.log"
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.schedule.lead_time_minutes, 180);
    assert!(cfg.schedule.warming_enabled);
    assert_eq!(cfg.schedule.trigger_mode, TriggerMode::Proximity);
    assert_eq!(cfg.runner.concurrency, 8);
    assert_eq!(cfg.device.backend, DeviceBackend::Simulated);
}

#[rstest]
#[case("[schedule]\nlead_time_minutes = 0", "lead_time_minutes must be >= 1")]
#[case("[schedule]\nlead_time_minutes = 721", "lead_time_minutes must be <= 720")]
#[case("[schedule]\nmid_stage_offset_minutes = 0", "mid_stage_offset_minutes")]
#[case(
    "[schedule]\nwarming_enabled = true\nwarming_lead_minutes = 120\nfinal_stage_lead_minutes = 120",
    "warming_lead_minutes must be <"
)]
#[case("[schedule]\nwarming_level = 101", "warming_level must be in")]
#[case(
    "[schedule]\ntrigger_mode = \"proximity\"\nproximity_window_minutes = 0",
    "proximity_window_minutes"
)]
#[case("[retry]\nmax_attempts = 0", "retry.max_attempts")]
#[case("[runner]\nconcurrency = 0", "runner.concurrency")]
#[case("[store]\nprofiles_path = \"  \"", "store.profiles_path")]
#[case("[device]\nbackend = \"http\"", "device.api_base_url is required")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_out_of_range(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected),
        "unexpected message: {err}"
    );
}

#[test]
fn http_backend_with_urls_is_valid() {
    let cfg = load_toml(
        r#"
[device]
backend = "http"
api_base_url = "https://api.example.test/v1"
auth_base_url = "https://auth.example.test/v1"
"#,
    )
    .expect("parse TOML");
    cfg.validate().expect("http backend with urls should pass");
}

#[test]
fn unknown_trigger_mode_fails_to_parse() {
    let err = load_toml("[schedule]\ntrigger_mode = \"edge\"").expect_err("bad enum");
    assert!(format!("{err}").contains("trigger_mode") || format!("{err}").contains("variant"));
}
