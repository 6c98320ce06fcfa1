//! Error types for fleetgen
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for fleetgen operations
pub type Result<T> = std::result::Result<T, FleetError>;

/// Main error type for fleetgen operations
#[derive(Error, Debug)]
pub enum FleetError {
    /// Configuration error (fatal, pre-generation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema contract error (fatal, in-unit)
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invariant violation (implementation bug)
    #[error("Logic error: {0}")]
    Logic(#[from] LogicError),

    /// Dataset validation failure
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FleetError {
    /// Process exit code for this error class.
    ///
    /// 0 = success, 2 = config error, 3 = validation failure, 1 = other.
    pub fn exit_code(&self) -> i32 {
        match self {
            FleetError::Config(_) => 2,
            FleetError::Validation(_) => 3,
            _ => 1,
        }
    }
}

/// Errors in generator configuration or constant tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A sampled parameter range has lo > hi
    #[error("Inconsistent range for {name}: [{lo}, {hi}]")]
    InconsistentRange { name: String, lo: f64, hi: f64 },

    /// Transition matrix row does not sum to 1
    #[error("Transition matrix row {row} sums to {sum}, expected 1.0")]
    BadTransitionRow { row: usize, sum: f64 },

    /// Train/val/test split does not cover the fleet
    #[error("Split sizes {train}/{val}/{test} incompatible with fleet of {fleet}")]
    BadSplit {
        train: usize,
        val: usize,
        test: usize,
        fleet: usize,
    },

    /// Empty fleet or zero-day horizon
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// Requested truck not in fleet
    #[error("Unknown truck id: {0}")]
    UnknownTruck(u32),
}

/// Errors violating the output schema contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Assembled feature vector has the wrong length
    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    /// A label field is missing from a row
    #[error("Missing label field: {0}")]
    MissingLabel(String),

    /// A fault-mode string is not FM-01..FM-08 or HEALTHY
    #[error("Unknown fault mode: {0}")]
    UnknownFaultMode(String),

    /// Parsed row has the wrong column count
    #[error("Column count mismatch at row {row}: expected {expected}, got {actual}")]
    ColumnCount {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Invariant violations; these indicate a bug, not bad input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogicError {
    /// A named invariant failed at a checkpoint
    #[error("Invariant {name} violated: {detail}")]
    Invariant { name: &'static str, detail: String },
}

impl LogicError {
    pub fn invariant(name: &'static str, detail: impl Into<String>) -> Self {
        LogicError::Invariant {
            name,
            detail: detail.into(),
        }
    }
}

/// Dataset-level validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A label class share fell outside its allowed band
    #[error("Class {class} share {share:.4} outside [{lo}, {hi}]")]
    ClassShare {
        class: String,
        share: f64,
        lo: f64,
        hi: f64,
    },

    /// Repair duration statistics out of bounds
    #[error("Repair durations out of bounds: {0}")]
    RepairDuration(String),

    /// No data found to validate
    #[error("No output rows found under {0}")]
    NoData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = FleetError::Config(ConfigError::InvalidDimension("trucks=0".into()));
        assert_eq!(config.exit_code(), 2);

        let validation = FleetError::Validation(ValidationError::NoData("out/".into()));
        assert_eq!(validation.exit_code(), 3);

        let schema = FleetError::Schema(SchemaError::FeatureCount {
            expected: 221,
            actual: 220,
        });
        assert_eq!(schema.exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::FeatureCount {
            expected: 221,
            actual: 219,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("221"));
        assert!(msg.contains("219"));
    }

    #[test]
    fn test_error_conversion() {
        let logic = LogicError::invariant("feature-count", "vector length 220");
        let top: FleetError = logic.into();
        assert!(matches!(top, FleetError::Logic(_)));
    }
}
