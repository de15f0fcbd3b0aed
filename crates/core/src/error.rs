use std::path::PathBuf;

use thiserror::Error;

/// The four error kinds a partitioner run can raise.
///
/// `DegenerateInput` is the one variant that is routinely just logged and
/// not necessarily propagated as an `Err` — the caller decides, but the
/// variant exists so that call sites which do want to bubble it up don't
/// need to invent their own wrapper.
#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("i/o error")]
    IoFatal {
        #[from]
        source: std::io::Error,
    },

    #[error("invariant violated: {what}")]
    InvariantViolated { what: String },

    #[error("malformed input at {path:?}: {reason}")]
    InputMalformed { path: PathBuf, reason: String },

    #[error("self-loop dropped at vertex {vertex}")]
    DegenerateInput { vertex: u32 },
}

impl PartitionError {
    pub fn invariant(what: impl Into<String>) -> Self {
        PartitionError::InvariantViolated { what: what.into() }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PartitionError::InputMalformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PartitionError>;
