//! Per-target error kinds
//!
//! A failure while counting one target never stops the run; it is recorded as
//! that target's outcome and reported once all workers have finished.

use std::io;
use thiserror::Error;

/// Why a single target could not be counted
#[derive(Debug, Error)]
pub enum CountError {
    /// The target could not be opened (missing, permission denied, broken link)
    #[error("cannot open {name}: {source}")]
    TargetUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Opening succeeded but reading (or stat/mapping) failed afterwards
    #[error("read failed on {name}: {source}")]
    ReadFailure {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The whole-buffer strategy could not allocate room for the file
    #[error("cannot allocate {size} bytes to buffer {name}")]
    AllocationFailure { name: String, size: u64 },

    /// No worker was left to claim the target
    #[error("{name} was not processed: no worker available")]
    WorkerUnavailable { name: String },
}

impl CountError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TargetUnavailable { .. } => "target-unavailable",
            Self::ReadFailure { .. } => "read-failure",
            Self::AllocationFailure { .. } => "allocation-failure",
            Self::WorkerUnavailable { .. } => "worker-unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_open_error_message_and_source() {
        let err = CountError::TargetUnavailable {
            name: "missing.txt".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };

        assert_eq!(
            err.to_string(),
            "cannot open missing.txt: No such file or directory"
        );
        assert!(err.source().is_some());
        assert_eq!(err.kind(), "target-unavailable");
    }

    #[test]
    fn test_allocation_error_message() {
        let err = CountError::AllocationFailure {
            name: "huge.bin".to_string(),
            size: 1 << 40,
        };

        assert_eq!(err.to_string(), "cannot allocate 1099511627776 bytes to buffer huge.bin");
        assert!(err.source().is_none());
    }
}
