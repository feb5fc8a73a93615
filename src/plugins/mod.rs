//! Built-in detectors.
//!
//! Each module contributes [`Test`] descriptors; `builtin()` assembles the
//! registry the manager and tracer run with.

pub mod blacklist;
pub mod nosql_injection;
pub mod server_side_injection;
pub mod sql_injection;

use crate::core::registry::Test;

/// All built-in tests, in stable registration order.
pub fn builtin() -> Vec<Test> {
    let mut tests = Vec::new();
    tests.extend(server_side_injection::tests());
    tests.extend(sql_injection::tests());
    tests.extend(nosql_injection::tests());
    tests.extend(blacklist::tests());
    tests
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_ids_are_well_formed() {
        for test in builtin() {
            let mut chars = test.id.chars();
            assert!(chars.next().is_some_and(|c| c.is_ascii_uppercase()), "{}", test.id);
            assert!(chars.all(|c| c.is_ascii_digit()), "{}", test.id);
            assert!(!test.checks.is_empty(), "{} checks nothing", test.name);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let tests = builtin();
        let names: HashSet<&str> = tests.iter().map(|test| test.name).collect();
        assert_eq!(names.len(), tests.len());
    }
}
