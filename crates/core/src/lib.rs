//! Out-of-core streaming substrate shared by the edge partitioners.
//!
//! This crate provides the building blocks a streaming vertex-cut
//! partitioner needs but that are not specific to any one partitioning
//! heuristic: a dense [`bitset::BitSet`] for per-partition vertex
//! membership, an addressable [`heap::MinHeap`] over vertex ids, a
//! shrinkable [`adj_slab::AdjSlab`] adjacency built from a sample window of
//! edges, the binary edgelist on-disk format together with its mapped and
//! batched readers in [`edgelist`], an external-memory chunked
//! [`shuffler::Shuffler`], and the append-only [`writer::AssignmentWriter`].
//!
//! None of these types know about DBH, HDRF or SNE; the partitioners in
//! `partition_algos` are built on top of them.

pub mod adj_slab;
pub mod bitset;
pub mod config;
pub mod edgelist;
mod error;
pub mod heap;
pub mod prelude;
pub mod shuffler;
pub mod writer;

pub use config::Config;
pub use error::PartitionError;

/// Vertex id. Fixed at 32 bits: every published workload of this system
/// fits comfortably, and a fixed width keeps the on-disk format and the
/// hot loops free of a generic index parameter.
pub type Vid = u32;

/// Partition index. Plain `usize`, never wrapped in a newtype: partition
/// counts are small and always used as slice indices.
pub type Pid = usize;
