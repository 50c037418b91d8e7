#![no_main]
use libfuzzer_sys::fuzz_target;
use modkit::module::validation::version::{is_newer_than, satisfies, stability};

fuzz_target!(|data: &[u8]| {
    // Constraint checking must be total: malformed input yields false, never a panic
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // First line is the version, the rest is the constraint
    let (version, constraint) = text.split_once('\n').unwrap_or((text, "*"));

    let _ = satisfies(version, constraint);
    let _ = satisfies(constraint, version);
    let _ = is_newer_than(version, constraint);
    let _ = stability(version);

    // Combined forms
    let _ = satisfies(version, &format!("{} || {}", constraint, constraint));
    let _ = satisfies(version, &format!("{}, <{}", constraint, version));
});
