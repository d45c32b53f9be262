#![no_main]

use libfuzzer_sys::fuzz_target;
use meshguard_core::HardeningConfig;
use meshguard_runtime::Hardening;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    // Anything that parses and validates must build a working layer
    if let Ok(config) = HardeningConfig::from_json_str(json) {
        let hardening = Hardening::new(config).expect("validated config");
        let _ = hardening.get_stats();
    }
});
