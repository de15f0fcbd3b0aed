//! Degree-based hashing: a single pass, routing each edge by its
//! lower-degree endpoint.

use std::path::PathBuf;
use std::time::Instant;

use partition_core::bitset::BitSet;
use partition_core::edgelist::{BasePaths, DegreeSidecar, EdgeCursor};
use partition_core::writer::AssignmentWriter;
use partition_core::{Config, PartitionError};

use crate::report::Report;

pub struct DbhPartitioner {
    cursor: EdgeCursor,
    degree: DegreeSidecar,
    writer: AssignmentWriter,
    partitions: usize,
}

impl DbhPartitioner {
    pub fn new(base: impl Into<PathBuf>, config: Config) -> Result<Self, PartitionError> {
        config.validate().map_err(PartitionError::invariant)?;
        let paths = BasePaths::new(base.into());
        let cursor = EdgeCursor::open(paths.binedgelist())?;
        let degree = DegreeSidecar::load(paths.degree(), cursor.header().num_vertices as usize)?;
        let writer = AssignmentWriter::create(paths.assignment())?;
        Ok(Self {
            cursor,
            degree,
            writer,
            partitions: config.partitions,
        })
    }

    pub fn split(mut self) -> Result<Report, PartitionError> {
        let start = Instant::now();
        let num_vertices = self.cursor.header().num_vertices as usize;
        let p = self.partitions;

        let mut edge_load = vec![0u64; p];
        let boundary: Vec<BitSet> = (0..p).map(|_| BitSet::new(num_vertices)).collect();

        for edge in self.cursor.edges() {
            let (u, v) = (edge.first, edge.second);
            let (du, dv) = (
                *self.degree.degree.get(u as usize).ok_or_else(|| {
                    PartitionError::invariant(format!("vertex {u} has no sidecar degree"))
                })?,
                *self.degree.degree.get(v as usize).ok_or_else(|| {
                    PartitionError::invariant(format!("vertex {v} has no sidecar degree"))
                })?,
            );
            // ties broken toward u
            let w = if du <= dv { u } else { v };
            let bucket = w as usize % p;

            edge_load[bucket] += 1;
            boundary[bucket].set_unsync(u as usize);
            boundary[bucket].set_unsync(v as usize);
            self.writer.write_edge(u, v, bucket)?;
        }

        self.writer.finish()?;

        let boundary_popcount_sum: u64 = boundary.iter().map(|b| b.popcount()).sum();
        Ok(Report::new(edge_load, boundary_popcount_sum, num_vertices, start.elapsed()))
    }
}
