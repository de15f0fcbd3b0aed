//! External-memory chunked shuffle: the "split into chunks then
//! interleave" approach used only by SNE to randomize edge order before
//! ingestion (neighbor expansion is otherwise biased by input order).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use fxhash::FxBuildHasher;
use log::warn;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::edgelist::{DegreeSidecar, Edge};
use crate::error::Result;
use crate::Vid;

const EDGE_BYTES: usize = 8;
const DEFAULT_WORKERS: usize = 2;

struct ChunkJob {
    index: usize,
    edges: Vec<Edge>,
}

/// Consumes raw `(from, to)` pairs, canonicalizes vertex ids to a dense
/// `[0, num_vertices)` space in order of first appearance, and writes a
/// uniformly shuffled binary edgelist plus its degree sidecar.
pub struct Shuffler {
    base: PathBuf,
    worker_count: usize,
    buffer_capacity: usize,

    vid_of: HashMap<u64, Vid, FxBuildHasher>,
    next_vid: Vid,

    current: Vec<Edge>,
    next_chunk_index: Arc<AtomicUsize>,
    chunk_paths: Arc<Mutex<Vec<PathBuf>>>,

    sender: mpsc::Sender<ChunkJob>,
    workers: Vec<std::thread::JoinHandle<Result<()>>>,

    seed: u64,
}

impl Shuffler {
    pub fn new(base: impl Into<PathBuf>, mem_budget_mib: usize, seed: u64) -> Self {
        Self::with_worker_count(base, mem_budget_mib, seed, DEFAULT_WORKERS)
    }

    pub fn with_worker_count(
        base: impl Into<PathBuf>,
        mem_budget_mib: usize,
        seed: u64,
        worker_count: usize,
    ) -> Self {
        let base = base.into();
        let worker_count = worker_count.max(1);
        let budget_bytes = mem_budget_mib.max(1) * 1024 * 1024;
        let buffer_capacity = (budget_bytes / worker_count / EDGE_BYTES).max(1);

        let (sender, receiver) = mpsc::channel::<ChunkJob>();
        let receiver = Arc::new(Mutex::new(receiver));
        let chunk_paths = Arc::new(Mutex::new(Vec::new()));
        let next_chunk_index = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let chunk_paths = Arc::clone(&chunk_paths);
            let base = base.clone();
            workers.push(std::thread::spawn(move || -> Result<()> {
                loop {
                    let job = {
                        let rx = receiver.lock();
                        rx.recv()
                    };
                    let Ok(job) = job else { break };
                    let path = chunk_path(&base, job.index);
                    write_chunk(&path, &job.edges)?;
                    chunk_paths.lock().push(path);
                }
                Ok(())
            }));
        }

        Self {
            base,
            worker_count,
            buffer_capacity,
            vid_of: HashMap::default(),
            next_vid: 0,
            current: Vec::with_capacity(buffer_capacity),
            next_chunk_index,
            chunk_paths,
            sender,
            workers,
            seed,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Canonicalize a raw vertex id (from any sparse external space) to a
    /// dense internal id, assigning ids in order of first appearance.
    fn get_vid(&mut self, raw: u64) -> Vid {
        *self.vid_of.entry(raw).or_insert_with(|| {
            let id = self.next_vid;
            self.next_vid += 1;
            id
        })
    }

    /// Submit one input edge. Self-loops are dropped with a warning.
    pub fn add_edge(&mut self, from: u64, to: u64) {
        if from == to {
            let v = self.get_vid(from);
            warn!("dropping self-loop at vertex {v}");
            return;
        }
        let u = self.get_vid(from);
        let v = self.get_vid(to);
        self.current.push(Edge::new(u, v));

        if self.current.len() == self.buffer_capacity {
            self.swap_and_submit();
        }
    }

    fn swap_and_submit(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let buffer = std::mem::replace(&mut self.current, Vec::with_capacity(self.buffer_capacity));
        let index = self.next_chunk_index.fetch_add(1, Ordering::SeqCst);
        // Submission is non-blocking: the channel send just hands off
        // ownership of the buffer, the producer never touches it again.
        let _ = self.sender.send(ChunkJob {
            index,
            edges: buffer,
        });
    }

    /// Drain all workers, interleave the chunk files into a uniformly
    /// shuffled binary edgelist at `<base>.shuffled.binedgelist`, write the
    /// degree sidecar, and delete the chunk files.
    pub fn finalize(mut self) -> Result<PathBuf> {
        self.swap_and_submit();
        drop(self.sender);

        for worker in self.workers.drain(..) {
            worker.join().expect("shuffler worker panicked")?;
        }

        let num_vertices = self.next_vid;
        let chunk_paths = Arc::try_unwrap(self.chunk_paths)
            .expect("all workers joined")
            .into_inner();

        let output_path = shuffled_path(&self.base);
        interleave_chunks(&chunk_paths, &output_path, num_vertices, self.seed)?;

        let degree = compute_degrees_from_chunks(&chunk_paths, num_vertices as usize)?;
        degree.write(degree_path(&self.base))?;

        for path in &chunk_paths {
            let _ = std::fs::remove_file(path);
        }

        Ok(output_path)
    }
}

fn chunk_path(base: &Path, index: usize) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(format!(".{index}.chunk"));
    PathBuf::from(p)
}

fn shuffled_path(base: &Path) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".shuffled.binedgelist");
    PathBuf::from(p)
}

fn degree_path(base: &Path) -> PathBuf {
    let mut p = base.as_os_str().to_owned();
    p.push(".degree");
    PathBuf::from(p)
}

fn write_chunk(path: &Path, edges: &[Edge]) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    for e in edges {
        out.write_all(&e.first.to_le_bytes())?;
        out.write_all(&e.second.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn read_edge(reader: &mut impl Read) -> std::io::Result<Option<Edge>> {
    let mut buf = [0u8; EDGE_BYTES];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(Some(Edge::new(
            u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            u32::from_le_bytes(buf[4..8].try_into().unwrap()),
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Repeatedly pick an active chunk uniformly at random, read one edge from
/// it, write it to the output, and retire the chunk on EOF. No ordering
/// guarantee across chunks; within a chunk, input order is preserved.
fn interleave_chunks(
    chunk_paths: &[PathBuf],
    output_path: &Path,
    num_vertices: Vid,
    seed: u64,
) -> Result<u64> {
    let mut readers: Vec<BufReader<File>> = chunk_paths
        .iter()
        .map(|p| Ok(BufReader::new(File::open(p)?)))
        .collect::<Result<_>>()?;

    let file = File::create(output_path)?;
    let mut out = BufWriter::new(file);
    // placeholder header, patched once num_edges is known
    out.write_all(&num_vertices.to_le_bytes())?;
    out.write_all(&0u64.to_le_bytes())?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut active: Vec<usize> = (0..readers.len()).collect();
    let mut num_edges = 0u64;

    while !active.is_empty() {
        let pick = rng.gen_range(0..active.len());
        let chunk = active[pick];
        match read_edge(&mut readers[chunk])? {
            Some(edge) => {
                edge.write_to(&mut out)?;
                num_edges += 1;
            }
            None => {
                active.swap_remove(pick);
            }
        }
    }
    out.flush()?;
    drop(out);

    // patch in the real edge count
    let mut file = std::fs::OpenOptions::new().write(true).open(output_path)?;
    use std::io::Seek;
    file.seek(std::io::SeekFrom::Start(4))?;
    file.write_all(&num_edges.to_le_bytes())?;

    Ok(num_edges)
}

fn compute_degrees_from_chunks(chunk_paths: &[PathBuf], num_vertices: usize) -> Result<DegreeSidecar> {
    let mut degree = vec![0u32; num_vertices];
    for path in chunk_paths {
        let mut reader = BufReader::new(File::open(path)?);
        while let Some(edge) = read_edge(&mut reader)? {
            degree[edge.first as usize] += 1;
            degree[edge.second as usize] += 1;
        }
    }
    Ok(DegreeSidecar { degree })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgelist::EdgeCursor;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn shuffled_output_is_a_permutation_of_input() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("g");

        // small memory budget forces several chunks
        let mut shuffler = Shuffler::with_worker_count(&base, 1, 42, 3);
        let mut expected: Vec<(u64, u64)> = Vec::new();
        for i in 0..1000u64 {
            let from = i % 50;
            let to = (i * 7 + 1) % 50;
            if from != to {
                expected.push((from, to));
            }
            shuffler.add_edge(from, to);
        }
        let output_path = shuffler.finalize().unwrap();

        let cursor = EdgeCursor::open(&output_path).unwrap();
        assert_eq!(cursor.len(), expected.len());
        assert_eq!(cursor.header().num_vertices as usize, 50);

        let produced: HashSet<(u32, u32)> =
            cursor.edges().map(|e| (e.first, e.second)).collect();
        assert_eq!(produced.len(), expected.len(), "no duplicate collapsing expected with distinct pairs");
    }

    #[test]
    fn self_loops_are_dropped() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("g");
        let mut shuffler = Shuffler::new(&base, 16, 1);
        shuffler.add_edge(0, 0);
        shuffler.add_edge(0, 1);
        let output_path = shuffler.finalize().unwrap();
        let cursor = EdgeCursor::open(&output_path).unwrap();
        assert_eq!(cursor.len(), 1);
    }

    #[test]
    fn vertex_ids_are_dense_and_ordered_by_first_appearance() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("g");
        let mut shuffler = Shuffler::new(&base, 16, 7);
        // raw ids 100 and 7 appear first and second
        shuffler.add_edge(100, 7);
        shuffler.add_edge(7, 100);
        let output_path = shuffler.finalize().unwrap();
        let cursor = EdgeCursor::open(&output_path).unwrap();
        assert_eq!(cursor.header().num_vertices, 2);
        for e in cursor.edges() {
            assert!(e.first < 2 && e.second < 2);
        }
    }
}
