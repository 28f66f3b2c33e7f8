//! Structural input failures.
//!
//! Row-level arithmetic problems never surface here; they are represented as
//! absent values or spread diagnostics. A `CarryError` means the whole cycle
//! must be abandoned.

use std::fmt;

/// Which input dataset a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Futures,
    Underlying,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Futures => write!(f, "futures"),
            Dataset::Underlying => write!(f, "underlying"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CarryError {
    #[error("Empty {0} dataset")]
    EmptyDataset(Dataset),

    #[error("Duplicate {dataset} code in snapshot: {code}")]
    DuplicateCode { dataset: Dataset, code: String },
}
