//! Streaming vertex-cut edge partitioners: DBH, HDRF and SNE.

pub mod algorithm;
pub mod dbh;
pub mod hdrf;
pub mod report;
pub mod sne;

pub use algorithm::{Algorithm, Partitioner};
pub use dbh::DbhPartitioner;
pub use hdrf::HdrfPartitioner;
pub use report::Report;
pub use sne::SnePartitioner;
