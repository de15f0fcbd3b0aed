//! Append-only sink for partitioning decisions.
//!
//! The on-disk layout is not part of the external contract beyond being
//! deterministic given identical input and partitioning decisions (see
//! SPEC_FULL.md §9's reconciliation of the writer itself, which is in
//! scope, against its downstream consumer, which is not). Two record
//! kinds, each tagged by a single byte:
//!
//! ```text
//! 0 [VID first][VID second][u32 partition]   edge assignment
//! 1 [VID vertex][u32 partition]               vertex (home/master) assignment
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::{Pid, Vid};

const EDGE_TAG: u8 = 0;
const VERTEX_TAG: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentRecord {
    Edge {
        first: Vid,
        second: Vid,
        partition: Pid,
    },
    Vertex {
        vertex: Vid,
        partition: Pid,
    },
}

pub struct AssignmentWriter {
    out: BufWriter<File>,
}

impl AssignmentWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub fn write_edge(&mut self, first: Vid, second: Vid, partition: Pid) -> Result<()> {
        self.out.write_all(&[EDGE_TAG])?;
        self.out.write_all(&first.to_le_bytes())?;
        self.out.write_all(&second.to_le_bytes())?;
        self.out.write_all(&(partition as u32).to_le_bytes())?;
        Ok(())
    }

    pub fn write_vertex(&mut self, vertex: Vid, partition: Pid) -> Result<()> {
        self.out.write_all(&[VERTEX_TAG])?;
        self.out.write_all(&vertex.to_le_bytes())?;
        self.out.write_all(&(partition as u32).to_le_bytes())?;
        Ok(())
    }

    /// Flush and close. Partitioners call this at termination.
    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Read back a stream of records written by [`AssignmentWriter`]. Used by
/// tests to check the writer's own round trip; partitioners verify their
/// invariants from in-memory state, not by reading their own output back.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AssignmentRecord>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut tag = [0u8; 1];
    loop {
        match reader.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        match tag[0] {
            EDGE_TAG => {
                let mut buf = [0u8; 12];
                reader.read_exact(&mut buf)?;
                records.push(AssignmentRecord::Edge {
                    first: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
                    second: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
                    partition: u32::from_le_bytes(buf[8..12].try_into().unwrap()) as Pid,
                });
            }
            VERTEX_TAG => {
                let mut buf = [0u8; 8];
                reader.read_exact(&mut buf)?;
                records.push(AssignmentRecord::Vertex {
                    vertex: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
                    partition: u32::from_le_bytes(buf[4..8].try_into().unwrap()) as Pid,
                });
            }
            other => {
                return Err(crate::PartitionError::invariant(format!(
                    "unknown assignment record tag {other}"
                )))
            }
        }
    }
    Ok(records)
}
