#![no_main]
use libfuzzer_sys::fuzz_target;
use modkit::module::registry::Manifest;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON manifests must normalize or fail cleanly
    let Ok(Value::Object(raw)) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("fuzz")
        .to_string();

    if let Ok(manifest) = Manifest::normalize(&name, &raw, true) {
        // Whatever normalized once must survive the round trip
        let again = Manifest::normalize(&name, &manifest.to_map(), manifest.enabled)
            .expect("normalized manifest must normalize again");
        assert_eq!(again, manifest);
    }
});
