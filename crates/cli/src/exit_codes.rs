//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `dbrecon` exit codes.
//! Exit codes are part of the shell contract: schedulers and CI jobs branch on them.
//!
//! | Code | Meaning                                                         |
//! |------|-----------------------------------------------------------------|
//! | 0    | Every job ran and matched perfectly                             |
//! | 1    | Every job ran; at least one found differences                   |
//! | 2    | Usage error (bad arguments, unreadable config or log file)      |
//! | 3    | Invalid configuration (parse or validation failure)             |
//! | 4    | At least one job failed to execute (takes precedence over 1)    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above

/// Success - all jobs executed, no differences.
pub const EXIT_SUCCESS: u8 = 0;

/// All jobs executed, but differences or one-sided rows were found.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing config file, unwritable log file.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// One or more jobs failed during execution.
pub const EXIT_JOB_FAILED: u8 = 4;

/// Batch outcome → exit code. Failures win over differences.
pub fn batch_exit_code(failed_jobs: usize, jobs_with_differences: usize) -> u8 {
    if failed_jobs > 0 {
        EXIT_JOB_FAILED
    } else if jobs_with_differences > 0 {
        EXIT_DIFFERENCES
    } else {
        EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_take_precedence() {
        assert_eq!(batch_exit_code(1, 3), EXIT_JOB_FAILED);
        assert_eq!(batch_exit_code(0, 3), EXIT_DIFFERENCES);
        assert_eq!(batch_exit_code(0, 0), EXIT_SUCCESS);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_DIFFERENCES, EXIT_USAGE, EXIT_INVALID_CONFIG, EXIT_JOB_FAILED];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
