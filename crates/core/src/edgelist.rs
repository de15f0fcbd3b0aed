//! The binary edgelist on-disk format and its readers.
//!
//! ```text
//! [VID num_vertices][u64 num_edges][edge_t x num_edges]
//! edge_t = [VID first][VID second]
//! ```
//! All integers little-endian, natural alignment, packed — read and
//! written by hand rather than through a `#[repr(C)]` struct so the layout
//! never depends on the compiler's padding rules.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use memmap2::Mmap;
use rayon::prelude::*;

use crate::error::{PartitionError, Result};
use crate::Vid;

const HEADER_BYTES: usize = 4 + 8;
const EDGE_BYTES: usize = 4 + 4;

/// One undirected edge, stored as an ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub first: Vid,
    pub second: Vid,
}

impl Edge {
    pub fn new(first: Vid, second: Vid) -> Self {
        Self { first, second }
    }

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        Edge {
            first: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            second: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }

    #[inline]
    pub(crate) fn write_to(self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&self.first.to_le_bytes())?;
        out.write_all(&self.second.to_le_bytes())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeListHeader {
    pub num_vertices: Vid,
    pub num_edges: u64,
}

impl EdgeListHeader {
    fn expected_file_size(&self) -> u64 {
        HEADER_BYTES as u64 + self.num_edges * EDGE_BYTES as u64
    }
}

/// Write a binary edgelist file from an in-memory edge slice. Used by tests
/// and by the (out-of-scope) converter.
pub fn write_binary_edgelist(path: impl AsRef<Path>, num_vertices: Vid, edges: &[Edge]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    out.write_all(&num_vertices.to_le_bytes())?;
    out.write_all(&(edges.len() as u64).to_le_bytes())?;
    for &e in edges {
        e.write_to(&mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// A memory-mapped, read-only view over a binary edgelist file.
///
/// This is the "whole-file mapped scan" read mode from the spec: a forward
/// cursor over edges that can always be restarted from the first edge by
/// calling [`EdgeCursor::edges`] again — needed by HDRF's second pass and
/// by the batched reader below, which is just this same cursor chunked.
pub struct EdgeCursor {
    mmap: Mmap,
    header: EdgeListHeader,
}

impl EdgeCursor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_BYTES as u64 {
            return Err(PartitionError::malformed(path, "file smaller than header"));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let num_vertices = u32::from_le_bytes(mmap[0..4].try_into().unwrap());
        let num_edges = u64::from_le_bytes(mmap[4..12].try_into().unwrap());
        let header = EdgeListHeader {
            num_vertices,
            num_edges,
        };

        if file_size != header.expected_file_size() {
            return Err(PartitionError::malformed(
                path,
                format!(
                    "file size {file_size} does not match header ({} expected)",
                    header.expected_file_size()
                ),
            ));
        }

        Ok(Self { mmap, header })
    }

    pub fn header(&self) -> EdgeListHeader {
        self.header
    }

    pub fn len(&self) -> usize {
        self.header.num_edges as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn edge_at(&self, index: usize) -> Edge {
        let start = HEADER_BYTES + index * EDGE_BYTES;
        Edge::read_from(&self.mmap[start..start + EDGE_BYTES])
    }

    /// Forward iterator over all edges, always starting at the first edge.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.len()).map(move |i| self.edge_at(i))
    }

    /// Split the stream into `batch_count` roughly-equal batches, handing
    /// each to `f` as a materialized `Vec<Edge>`. Calling this again starts
    /// a fresh pass from the edge header, exactly like re-opening the
    /// cursor — used by HDRF for its two streaming phases.
    pub fn for_each_batch(
        &self,
        batch_count: usize,
        mut f: impl FnMut(&[Edge]) -> Result<()>,
    ) -> Result<()> {
        let batch_count = batch_count.max(1);
        let total = self.len();
        let batch_size = total.div_ceil(batch_count).max(1);
        let mut buf = Vec::with_capacity(batch_size);
        for i in 0..total {
            buf.push(self.edge_at(i));
            if buf.len() == batch_size {
                f(&buf)?;
                buf.clear();
            }
        }
        if !buf.is_empty() {
            f(&buf)?;
        }
        Ok(())
    }

    /// Number of batches `for_each_batch` should use to keep each batch
    /// within `mem_budget_mib` of edges (`B = ceil(file_size / budget) + 1`).
    pub fn batch_count_for_budget(&self, mem_budget_mib: usize) -> usize {
        let budget_bytes = (mem_budget_mib.max(1) as u64) * 1024 * 1024;
        let payload_bytes = self.len() as u64 * EDGE_BYTES as u64;
        (payload_bytes.div_ceil(budget_bytes) + 1) as usize
    }
}

/// Flat array of per-vertex undirected degrees, the `.degree` sidecar.
#[derive(Debug, Clone)]
pub struct DegreeSidecar {
    pub degree: Vec<Vid>,
}

impl DegreeSidecar {
    /// Compute degrees in parallel from an edge slice — a `rayon` reduction
    /// over atomic per-vertex counters.
    pub fn compute(num_vertices: usize, edges: &[Edge]) -> Self {
        let counters: Vec<AtomicU32> = (0..num_vertices).map(|_| AtomicU32::new(0)).collect();
        edges.par_iter().for_each(|e| {
            counters[e.first as usize].fetch_add(1, Ordering::Relaxed);
            counters[e.second as usize].fetch_add(1, Ordering::Relaxed);
        });
        let degree = counters.into_iter().map(|c| c.into_inner()).collect();
        Self { degree }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut out = BufWriter::new(file);
        for &d in &self.degree {
            out.write_all(&d.to_le_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, num_vertices: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        if bytes.len() != num_vertices * 4 {
            return Err(PartitionError::malformed(
                path,
                format!(
                    "expected {} bytes for {num_vertices} vertices, found {}",
                    num_vertices * 4,
                    bytes.len()
                ),
            ));
        }
        let degree = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Self { degree })
    }
}

/// Derived paths for a basefilename, per the external interfaces section.
#[derive(Debug, Clone)]
pub struct BasePaths {
    base: PathBuf,
}

impl BasePaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn binedgelist(&self) -> PathBuf {
        self.with_suffix("binedgelist")
    }

    pub fn degree(&self) -> PathBuf {
        self.with_suffix("degree")
    }

    pub fn chunk(&self, i: usize) -> PathBuf {
        let mut p = self.base.clone().into_os_string();
        p.push(format!(".{i}.chunk"));
        PathBuf::from(p)
    }

    pub fn shuffled(&self) -> PathBuf {
        self.with_suffix("shuffled.binedgelist")
    }

    pub fn assignment(&self) -> PathBuf {
        self.with_suffix("assignment.bin")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut p = self.base.clone().into_os_string();
        p.push(".");
        p.push(suffix);
        PathBuf::from(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_small_edgelist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g.binedgelist");
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(0, 2)];
        write_binary_edgelist(&path, 3, &edges).unwrap();

        let cursor = EdgeCursor::open(&path).unwrap();
        assert_eq!(cursor.header().num_vertices, 3);
        assert_eq!(cursor.len(), 3);
        assert_eq!(cursor.edges().collect::<Vec<_>>(), edges);
        // a second pass sees the same edges, starting over
        assert_eq!(cursor.edges().collect::<Vec<_>>(), edges);
    }

    #[test]
    fn malformed_size_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.binedgelist");
        std::fs::write(&path, [0u8; 5]).unwrap();
        assert!(EdgeCursor::open(&path).is_err());
    }

    #[test]
    fn batches_cover_every_edge_exactly_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g.binedgelist");
        let edges: Vec<Edge> = (0..97u32).map(|i| Edge::new(i, i + 1)).collect();
        write_binary_edgelist(&path, 98, &edges).unwrap();
        let cursor = EdgeCursor::open(&path).unwrap();

        let mut seen = Vec::new();
        cursor
            .for_each_batch(7, |batch| {
                seen.extend_from_slice(batch);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, edges);
    }

    #[test]
    fn degree_sidecar_sums_to_twice_edge_count() {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(0, 2)];
        let sidecar = DegreeSidecar::compute(3, &edges);
        let total: u32 = sidecar.degree.iter().sum();
        assert_eq!(total, 2 * edges.len() as u32);
        assert_eq!(sidecar.degree, vec![2, 2, 2]);
    }

    #[test]
    fn degree_sidecar_roundtrips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g.degree");
        let sidecar = DegreeSidecar {
            degree: vec![2, 1, 3, 0],
        };
        sidecar.write(&path).unwrap();
        let loaded = DegreeSidecar::load(&path, 4).unwrap();
        assert_eq!(loaded.degree, sidecar.degree);
    }

    #[test]
    fn base_paths_derive_expected_suffixes() {
        let paths = BasePaths::new("/data/graph");
        assert_eq!(paths.binedgelist(), PathBuf::from("/data/graph.binedgelist"));
        assert_eq!(paths.degree(), PathBuf::from("/data/graph.degree"));
        assert_eq!(paths.chunk(3), PathBuf::from("/data/graph.3.chunk"));
        assert_eq!(
            paths.shuffled(),
            PathBuf::from("/data/graph.shuffled.binedgelist")
        );
        assert_eq!(
            paths.assignment(),
            PathBuf::from("/data/graph.assignment.bin")
        );
    }
}
