#![no_main]

use libfuzzer_sys::fuzz_target;
use meshguard_runtime::{Hardening, HardeningSnapshot};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(snapshot) = HardeningSnapshot::from_json(json) else {
        return;
    };

    let hardening = Hardening::default();
    if hardening.restore(snapshot).is_ok() {
        for profile in hardening.snapshot().profiles {
            assert!((0.0..=1.0).contains(&profile.reputation));
            assert!(!(profile.manually_blocked && profile.manually_trusted));
        }
    }
});
