#![no_main]
use libfuzzer_sys::fuzz_target;

use checkpoint_core::policy::ReconcilePolicy;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = checkpoint_core::schema::check(&value, "fuzz.json", true, &ReconcilePolicy::default());
    }
});
