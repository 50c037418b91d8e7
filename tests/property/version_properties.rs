//! Property tests for version constraints
//!
//! Constraint checking is total: any input yields a boolean, never a panic.

use proptest::prelude::*;

use modkit::module::validation::version::{is_newer_than, satisfies, stability};

fn version() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..50, 0u64..50, 0u64..50)
}

proptest! {
    #[test]
    fn test_satisfies_never_panics(v in ".{0,24}", c in ".{0,32}") {
        let _ = satisfies(&v, &c);
        let _ = is_newer_than(&v, &c);
        let _ = stability(&v);
    }

    #[test]
    fn test_satisfies_never_panics_on_operator_soup(
        v in "[v0-9.\\-a-z]{0,12}",
        c in "[<>=!^~*| ,0-9.xv\\-]{0,24}",
    ) {
        let _ = satisfies(&v, &c);
    }

    #[test]
    fn test_exact_and_caret_accept_self((major, minor, patch) in version()) {
        let v = format!("{}.{}.{}", major, minor, patch);
        prop_assert!(satisfies(&v, &v));
        let caret = format!("^{}", v);
        let tilde = format!("~{}", v);
        let gte = format!(">={}", v);
        let gt = format!(">{}", v);
        prop_assert!(satisfies(&v, &caret));
        prop_assert!(satisfies(&v, &tilde));
        prop_assert!(satisfies(&v, &gte));
        prop_assert!(!satisfies(&v, &gt));
        prop_assert!(satisfies(&v, "*"));
    }

    #[test]
    fn test_newer_than_is_a_strict_order(a in version(), b in version()) {
        let a = format!("{}.{}.{}", a.0, a.1, a.2);
        let b = format!("{}.{}.{}", b.0, b.1, b.2);
        prop_assert!(!(is_newer_than(&a, &b) && is_newer_than(&b, &a)));
        prop_assert!(!is_newer_than(&a, &a));
        if is_newer_than(&a, &b) {
            let gt_b = format!(">{}", b);
            prop_assert!(satisfies(&a, &gt_b));
        }
    }
}
