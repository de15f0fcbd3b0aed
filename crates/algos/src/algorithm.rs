//! Tagged dispatch over the three partitioners, for the CLI.

use std::path::PathBuf;

use partition_core::{Config, PartitionError};

use crate::dbh::DbhPartitioner;
use crate::hdrf::HdrfPartitioner;
use crate::report::Report;
use crate::sne::SnePartitioner;

/// One partitioning decision per edge (and, for HDRF/SNE, per vertex),
/// produced by running an edge stream to completion.
pub trait Partitioner {
    fn split(self) -> Result<Report, PartitionError>;
}

impl Partitioner for DbhPartitioner {
    fn split(self) -> Result<Report, PartitionError> {
        DbhPartitioner::split(self)
    }
}

impl Partitioner for HdrfPartitioner {
    fn split(self) -> Result<Report, PartitionError> {
        HdrfPartitioner::split(self)
    }
}

impl Partitioner for SnePartitioner {
    fn split(self) -> Result<Report, PartitionError> {
        SnePartitioner::split(self)
    }
}

/// Which streaming partitioner to run, selected by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Dbh,
    Hdrf,
    Sne,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Dbh => "dbh",
            Algorithm::Hdrf => "hdrf",
            Algorithm::Sne => "sne",
        }
    }

    /// Build and run the selected partitioner against `base`, logging its
    /// report under its own name.
    pub fn run(self, base: impl Into<PathBuf>, config: Config) -> Result<Report, PartitionError> {
        let base = base.into();
        let report = match self {
            Algorithm::Dbh => DbhPartitioner::new(base, config)?.split()?,
            Algorithm::Hdrf => HdrfPartitioner::new(base, config)?.split()?,
            Algorithm::Sne => SnePartitioner::new(base, config)?.split()?,
        };
        report.log(self.name());
        Ok(report)
    }
}

impl std::str::FromStr for Algorithm {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dbh" => Ok(Algorithm::Dbh),
            "hdrf" => Ok(Algorithm::Hdrf),
            "sne" => Ok(Algorithm::Sne),
            other => Err(PartitionError::invariant(format!(
                "unknown algorithm '{other}', expected one of dbh, hdrf, sne"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_case_insensitively() {
        assert_eq!("DBH".parse::<Algorithm>().unwrap(), Algorithm::Dbh);
        assert_eq!("hdrf".parse::<Algorithm>().unwrap(), Algorithm::Hdrf);
        assert_eq!("Sne".parse::<Algorithm>().unwrap(), Algorithm::Sne);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("louvain".parse::<Algorithm>().is_err());
    }
}
