//! Core error types for taxkit

use std::path::PathBuf;
use thiserror::Error;

use crate::taxonomy::types::TaxonId;

/// Main error type for taxkit operations
#[derive(Error, Debug)]
pub enum TaxkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Malformed record in {file}:{line}: {reason}")]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Inconsistent taxonomy: {0}")]
    InconsistentTaxonomy(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No free taxid for {rank} \"{name}\" after {probes} probes")]
    CollisionExhausted {
        rank: String,
        name: String,
        probes: u32,
    },

    #[error("Cycle detected above taxid {taxid} after {hops} hops")]
    CycleDetected { taxid: TaxonId, hops: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for taxkit operations
pub type TaxkitResult<T> = Result<T, TaxkitError>;

impl TaxkitError {
    pub fn malformed(file: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        TaxkitError::MalformedRecord {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TaxkitError {
    fn from(err: serde_json::Error) -> Self {
        TaxkitError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for TaxkitError {
    fn from(err: csv::Error) -> Self {
        TaxkitError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for TaxkitError {
    fn from(err: anyhow::Error) -> Self {
        TaxkitError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = TaxkitError::malformed("nodes.dmp", 12, "non-numeric taxid: abc");
        assert_eq!(
            format!("{}", err),
            "Malformed record in nodes.dmp:12: non-numeric taxid: abc"
        );

        let err = TaxkitError::CollisionExhausted {
            rank: "species".to_string(),
            name: "Foo bar".to_string(),
            probes: 8,
        };
        assert_eq!(
            format!("{}", err),
            "No free taxid for species \"Foo bar\" after 8 probes"
        );

        let err = TaxkitError::CycleDetected {
            taxid: TaxonId(42),
            hops: 7,
        };
        assert_eq!(format!("{}", err), "Cycle detected above taxid 42 after 7 hops");

        let err = TaxkitError::Configuration("missing field".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: TaxkitError = io_err.into();

        match err {
            TaxkitError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let err: TaxkitError = anyhow::anyhow!("custom error message").into();
        match err {
            TaxkitError::Other(msg) => assert_eq!(msg, "custom error message"),
            _ => panic!("Expected Other error variant"),
        }
    }
}
