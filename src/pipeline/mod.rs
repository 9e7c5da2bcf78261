//! Pipeline orchestration for fleet comparisons.
//!
//! Loading of catalogs, deltas and overviews from disk, parallel comparison
//! of many hosts with serialized merging, and output handling shared by the
//! command-line front end.

mod fleet;
mod output;
mod parse;

pub use fleet::{
    compare_and_merge, load_fleet, FleetOutcome, HostError, HostInput, HostJob, BASELINE_FILE,
    BASELINE_LOG_FILE, PREVIEW_FILE, PREVIEW_LOG_FILE,
};
pub use output::{should_use_color, write_output, OutputTarget};
pub use parse::{load_catalog, load_compile_log, load_delta, load_overview};

/// Process exit codes of the command-line front end.
///
/// A successful `diff` exits with the severity code of its delta
/// (0 equal, 4 compliant, 5 different).
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// An error occurred
    pub const ERROR: i32 = 1;
    /// Some hosts of a fleet run failed
    pub const PARTIAL: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overview::Severity;

    #[test]
    fn test_exit_codes_do_not_collide_with_severities() {
        for code in [exit_codes::ERROR, exit_codes::PARTIAL] {
            assert!(Severity::from_exit_code(code).is_none());
        }
        assert_eq!(Severity::from_exit_code(exit_codes::SUCCESS), Some(Severity::Equal));
    }
}
