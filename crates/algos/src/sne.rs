//! Streaming Neighbor Expansion: grows one partition at a time from a
//! sliding sample window, seeding from the lowest-degree boundary vertex
//! and expanding outward until the bucket's edge capacity is reached.

use std::path::PathBuf;
use std::time::Instant;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use partition_core::adj_slab::AdjSlab;
use partition_core::bitset::BitSet;
use partition_core::edgelist::{BasePaths, DegreeSidecar, Edge, EdgeCursor};
use partition_core::heap::MinHeap;
use partition_core::shuffler::Shuffler;
use partition_core::writer::AssignmentWriter;
use partition_core::{Config, PartitionError, Pid, Vid};

use crate::report::Report;

pub struct SnePartitioner {
    all_edges: Vec<Edge>,
    degree_sidecar: DegreeSidecar,
    writer: AssignmentWriter,
    config: Config,
    num_vertices: usize,

    read_pos: usize,
    /// Global edge indices currently held in the sliding sample window.
    sample: Vec<usize>,
    assigned: Vec<bool>,
    edge_load: Vec<u64>,
    is_boundary: Vec<BitSet>,
    is_core: Vec<BitSet>,
    /// The capacity a bucket stopped growing at, once closed. `u64::MAX`
    /// for buckets not yet closed — never queried, since `check_edge` only
    /// ever looks at buckets strictly earlier than the one being grown.
    closed_capacity: Vec<u64>,
    global_average_degree: f64,
    rng: StdRng,
}

impl SnePartitioner {
    pub fn new(base: impl Into<PathBuf>, config: Config) -> Result<Self, PartitionError> {
        config.validate().map_err(PartitionError::invariant)?;
        let base = base.into();
        let paths = BasePaths::new(base.clone());

        let source_path = if config.in_memory {
            paths.binedgelist()
        } else if paths.shuffled().exists() {
            paths.shuffled()
        } else {
            let mut shuffler = Shuffler::new(&base, config.mem_budget_mib, config.seed);
            let source = EdgeCursor::open(paths.binedgelist())?;
            for edge in source.edges() {
                shuffler.add_edge(edge.first as u64, edge.second as u64);
            }
            shuffler.finalize()?
        };

        let cursor = EdgeCursor::open(&source_path)?;
        let num_vertices = cursor.header().num_vertices as usize;
        let degree_sidecar = DegreeSidecar::load(paths.degree(), num_vertices)?;
        let all_edges: Vec<Edge> = cursor.edges().collect();
        let writer = AssignmentWriter::create(paths.assignment())?;

        let global_average_degree = if num_vertices == 0 {
            0.0
        } else {
            degree_sidecar.degree.iter().map(|&d| d as f64).sum::<f64>() / num_vertices as f64
        };

        let p = config.partitions;
        let assigned = vec![false; all_edges.len()];
        Ok(Self {
            all_edges,
            degree_sidecar,
            writer,
            config,
            num_vertices,
            read_pos: 0,
            sample: Vec::new(),
            assigned,
            edge_load: vec![0u64; p],
            is_boundary: (0..p).map(|_| BitSet::new(num_vertices)).collect(),
            is_core: (0..p).map(|_| BitSet::new(num_vertices)).collect(),
            closed_capacity: vec![u64::MAX; p],
            global_average_degree,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    pub fn split(mut self) -> Result<Report, PartitionError> {
        let start = Instant::now();
        let p = self.config.partitions;
        let n = self.num_vertices;
        let num_edges = self.all_edges.len() as u64;
        let max_sample_edges =
            ((self.config.sample_ratio * num_edges as f64).ceil() as usize).max(1);
        let capacity_in_memory = ((1.05 * num_edges as f64 / p as f64).ceil() as u64).max(1);

        for bucket in 0..p.saturating_sub(1) {
            self.grow_bucket(bucket, p, max_sample_edges, capacity_in_memory)?;
            self.clean_sample(bucket)?;
        }
        self.finish_final_bucket(p - 1)?;

        let boundary_popcount_sum: u64 = self.is_boundary.iter().map(|b| b.popcount()).sum();
        assert!(self.edge_load.iter().sum::<u64>() <= num_edges);
        let report = Report::new(self.edge_load.clone(), boundary_popcount_sum, n, start.elapsed());

        self.assign_masters()?;
        self.writer.finish()?;
        Ok(report)
    }

    /// Sample degree of `v`: remaining incident edges still present in the
    /// current sample's adjacency.
    fn sample_degree(adj_out: &AdjSlab, adj_in: &AdjSlab, v: Vid) -> u32 {
        adj_out.degree(v) + adj_in.degree(v)
    }

    fn rebuild_adjacency(&self) -> (AdjSlab, Vec<Edge>) {
        let sample_edges: Vec<Edge> = self.sample.iter().map(|&i| self.all_edges[i]).collect();
        (AdjSlab::build(self.num_vertices, &sample_edges), sample_edges)
    }

    fn refill_sample(
        &mut self,
        bucket: usize,
        max_sample_edges: usize,
    ) -> Result<(), PartitionError> {
        while self.sample.len() < max_sample_edges && self.read_pos < self.all_edges.len() {
            let idx = self.read_pos;
            self.read_pos += 1;
            if self.assigned[idx] {
                continue;
            }
            let edge = self.all_edges[idx];
            match self.check_edge(edge, bucket)? {
                Some(target) => self.assign_edge(idx, edge, target)?,
                None => self.sample.push(idx),
            }
        }
        Ok(())
    }

    /// Try routing `edge` to one of the already-closed buckets `[0, upto)`
    /// per the two-round `check_edge` policy, respecting each earlier
    /// bucket's own capacity.
    fn check_edge(&mut self, edge: Edge, upto: usize) -> Result<Option<usize>, PartitionError> {
        let (u, v) = (edge.first, edge.second);

        for bucket in 0..upto {
            if self.is_boundary[bucket].test(u as usize)
                && self.is_boundary[bucket].test(v as usize)
                && self.edge_load[bucket] < self.closed_capacity[bucket]
            {
                return Ok(Some(bucket));
            }
        }

        for bucket in 0..upto {
            if self.edge_load[bucket] >= self.closed_capacity[bucket] {
                continue;
            }
            let u_core = self.is_core[bucket].test(u as usize);
            let v_core = self.is_core[bucket].test(v as usize);
            if !u_core && !v_core {
                continue;
            }
            let non_core = if u_core { v } else { u };
            let non_core_degree = self.degree_sidecar.degree[non_core as usize] as f64;
            if non_core_degree > self.global_average_degree {
                continue;
            }
            self.is_boundary[bucket].set_unsync(u as usize);
            self.is_boundary[bucket].set_unsync(v as usize);
            return Ok(Some(bucket));
        }

        Ok(None)
    }

    fn assign_edge(&mut self, idx: usize, edge: Edge, bucket: usize) -> Result<(), PartitionError> {
        if self.assigned[idx] {
            return Ok(());
        }
        self.assigned[idx] = true;
        self.edge_load[bucket] += 1;
        self.is_boundary[bucket].set_unsync(edge.first as usize);
        self.is_boundary[bucket].set_unsync(edge.second as usize);
        self.writer.write_edge(edge.first, edge.second, bucket)?;
        Ok(())
    }

    fn grow_bucket(
        &mut self,
        bucket: usize,
        p: usize,
        max_sample_edges: usize,
        capacity_in_memory: u64,
    ) -> Result<(), PartitionError> {
        let mut last_capacity = capacity_in_memory;
        loop {
            self.refill_sample(bucket, max_sample_edges)?;

            let (mut adj_out, sample_edges) = self.rebuild_adjacency();
            let mut adj_in = AdjSlab::build_reverse(self.num_vertices, &sample_edges);

            let capacity = if self.config.in_memory {
                capacity_in_memory
            } else {
                (self.sample.len() as u64 / (p - bucket) as u64).max(1)
            };
            last_capacity = capacity;

            let mut heap = MinHeap::new();
            heap.reserve(self.num_vertices);
            for &idx in &self.sample {
                let e = self.all_edges[idx];
                for v in [e.first, e.second] {
                    if self.is_boundary[bucket].test(v as usize)
                        && !self.is_core[bucket].test(v as usize)
                        && !heap.contains(v)
                    {
                        heap.insert(Self::sample_degree(&adj_out, &adj_in, v), v);
                    }
                }
            }

            let local_average_degree = {
                let mut total = 0u64;
                let mut count = 0u64;
                for v in 0..self.num_vertices as Vid {
                    let d = Self::sample_degree(&adj_out, &adj_in, v);
                    if d > 0 {
                        total += d as u64;
                        count += 1;
                    }
                }
                if count == 0 {
                    0.0
                } else {
                    total as f64 / count as f64
                }
            };

            let seed = match heap.get_min() {
                Some((_, v)) => {
                    heap.remove(v);
                    Some(v)
                }
                None => self.find_free_vertex(&adj_out, &adj_in, bucket, local_average_degree),
            };

            let Some(v) = seed else {
                break;
            };

            self.is_core[bucket].set_unsync(v as usize);
            self.add_boundary(v, bucket, capacity, &mut adj_out, &mut adj_in, &mut heap)?;

            // Expand the frontier one hop further: every neighbor still
            // reachable through v's remaining sample edges also becomes a
            // boundary vertex, not just the seed itself.
            let fringe: Vec<Vid> = adj_out
                .neighbors(v)
                .iter()
                .map(|&local_idx| self.all_edges[self.sample[local_idx as usize]].second)
                .chain(
                    adj_in
                        .neighbors(v)
                        .iter()
                        .map(|&local_idx| self.all_edges[self.sample[local_idx as usize]].first),
                )
                .collect();
            for u in fringe {
                self.add_boundary(u, bucket, capacity, &mut adj_out, &mut adj_in, &mut heap)?;
            }

            // adj_out/adj_in only shrink within this rebuild; drop the
            // edges they just consumed from the sample itself so the next
            // rebuild_adjacency doesn't resurrect already-assigned edges.
            self.sample.retain(|&idx| !self.assigned[idx]);

            if self.edge_load[bucket] >= capacity {
                break;
            }
            if self.sample.is_empty() && self.read_pos >= self.all_edges.len() {
                break;
            }
        }
        self.closed_capacity[bucket] = last_capacity;
        Ok(())
    }

    fn find_free_vertex(
        &self,
        adj_out: &AdjSlab,
        adj_in: &AdjSlab,
        bucket: usize,
        local_average_degree: f64,
    ) -> Option<Vid> {
        let ceiling = 2.0 * local_average_degree;
        (0..self.num_vertices as Vid).find(|&v| {
            let d = Self::sample_degree(adj_out, adj_in, v);
            d > 0 && (d as f64) <= ceiling && !self.is_core[bucket].test(v as usize)
        })
    }

    fn add_boundary(
        &mut self,
        v: Vid,
        bucket: usize,
        capacity: u64,
        adj_out: &mut AdjSlab,
        adj_in: &mut AdjSlab,
        heap: &mut MinHeap,
    ) -> Result<(), PartitionError> {
        if self.is_boundary[bucket].test(v as usize) {
            return Ok(());
        }
        self.is_boundary[bucket].set_unsync(v as usize);
        if !self.is_core[bucket].test(v as usize) && !heap.contains(v) {
            heap.insert(Self::sample_degree(adj_out, adj_in, v), v);
        }

        // Out-edges of v: local sample indices, resolved back to global indices.
        let out_entries: Vec<u32> = adj_out.neighbors(v).to_vec();
        for local_idx in out_entries {
            let global_idx = self.sample[local_idx as usize];
            let edge = self.all_edges[global_idx];
            let neighbor = edge.second;
            self.try_consume_edge(
                v, neighbor, global_idx, local_idx, edge, bucket, capacity, adj_out, adj_in, heap,
            )?;
        }

        let in_entries: Vec<u32> = adj_in.neighbors(v).to_vec();
        for local_idx in in_entries {
            let global_idx = self.sample[local_idx as usize];
            let edge = self.all_edges[global_idx];
            let neighbor = edge.first;
            self.try_consume_edge(
                v, neighbor, global_idx, local_idx, edge, bucket, capacity, adj_out, adj_in, heap,
            )?;
        }

        Ok(())
    }

    fn try_consume_edge(
        &mut self,
        v: Vid,
        neighbor: Vid,
        global_idx: usize,
        local_idx: u32,
        edge: Edge,
        bucket: usize,
        capacity: u64,
        adj_out: &mut AdjSlab,
        adj_in: &mut AdjSlab,
        heap: &mut MinHeap,
    ) -> Result<(), PartitionError> {
        if self.assigned[global_idx] {
            return Ok(());
        }
        if self.is_core[bucket].test(neighbor as usize) {
            self.assign_edge(global_idx, edge, bucket)?;
            adj_out.remove(edge.first, local_idx);
            adj_in.remove(edge.second, local_idx);
            if heap.contains(v) {
                heap.decrease_key(v, 1)?;
            }
        } else if self.is_boundary[bucket].test(neighbor as usize) && self.edge_load[bucket] < capacity {
            self.assign_edge(global_idx, edge, bucket)?;
            adj_out.remove(edge.first, local_idx);
            adj_in.remove(edge.second, local_idx);
            if heap.contains(v) {
                heap.decrease_key(v, 1)?;
            }
            if heap.contains(neighbor) {
                heap.decrease_key(neighbor, 1)?;
            }
        }
        Ok(())
    }

    /// Drop invalidated sample entries and try routing any leftover sample
    /// edge to a now-complete earlier bucket.
    fn clean_sample(&mut self, completed_bucket: usize) -> Result<(), PartitionError> {
        let upto = completed_bucket + 1;
        let mut remaining = Vec::with_capacity(self.sample.len());
        for idx in std::mem::take(&mut self.sample) {
            if self.assigned[idx] {
                continue;
            }
            let edge = self.all_edges[idx];
            match self.check_edge(edge, upto)? {
                Some(target) => self.assign_edge(idx, edge, target)?,
                None => remaining.push(idx),
            }
        }
        self.sample = remaining;
        Ok(())
    }

    fn finish_final_bucket(&mut self, last_bucket: usize) -> Result<(), PartitionError> {
        for idx in std::mem::take(&mut self.sample) {
            if self.assigned[idx] {
                continue;
            }
            let edge = self.all_edges[idx];
            self.assign_edge(idx, edge, last_bucket)?;
        }
        while self.read_pos < self.all_edges.len() {
            let idx = self.read_pos;
            self.read_pos += 1;
            if self.assigned[idx] {
                continue;
            }
            let edge = self.all_edges[idx];
            self.assign_edge(idx, edge, last_bucket)?;
        }

        // Core of the final bucket: its boundary minus any earlier bucket's core.
        for v in 0..self.num_vertices {
            if self.is_boundary[last_bucket].test(v) {
                let in_earlier_core = self.is_core[..last_bucket].iter().any(|b| b.test(v));
                if !in_earlier_core {
                    self.is_core[last_bucket].set_unsync(v);
                }
            }
        }
        Ok(())
    }

    /// Weighted-random master (home-partition) selection over boundary
    /// vertices, quota-weighted per partition.
    fn assign_masters(&mut self) -> Result<(), PartitionError> {
        let p = self.config.partitions;
        let mut mastered = vec![false; self.num_vertices];
        let mut remaining_quota = vec![self.num_vertices as i64; p];

        let total_boundary: usize = (0..self.num_vertices)
            .filter(|&v| (0..p).any(|bucket| self.is_boundary[bucket].test(v)))
            .count();
        let mut total_mastered = 0usize;

        while total_mastered < total_boundary {
            let weights: Vec<f64> = remaining_quota
                .iter()
                .map(|&q| q.max(0) as f64)
                .collect();
            if weights.iter().all(|&w| w == 0.0) {
                break;
            }
            let dist = WeightedIndex::new(&weights)
                .map_err(|e| PartitionError::invariant(format!("degenerate master quota weights: {e}")))?;
            let bucket = dist.sample(&mut self.rng);

            let found = (0..self.num_vertices)
                .find(|&v| self.is_boundary[bucket].test(v) && !mastered[v]);

            match found {
                Some(v) => {
                    mastered[v] = true;
                    total_mastered += 1;
                    remaining_quota[bucket] -= 1;
                    self.writer.write_vertex(v as Vid, bucket)?;
                }
                None => {
                    remaining_quota[bucket] = 0;
                }
            }
        }
        Ok(())
    }
}
