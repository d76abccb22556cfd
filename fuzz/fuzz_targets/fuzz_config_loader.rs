#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<nightheat_config::Config>(data) {
        if cfg.validate().is_ok() {
            let _ = nightheat_core::ControllerCfg::from(&cfg);
        }
    }
});
