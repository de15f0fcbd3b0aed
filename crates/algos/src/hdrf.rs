//! High-Degree-Replicated-First: a two-phase streaming partitioner. Phase 1
//! scores and assigns every edge to a partition while growing a per-vertex
//! observed degree; an intermediate step then picks one home partition per
//! vertex; phase 2 re-streams the edges and writes the directed, replicated
//! routing records.

use std::path::PathBuf;
use std::time::Instant;

use partition_core::bitset::BitSet;
use partition_core::edgelist::{BasePaths, DegreeSidecar, EdgeCursor};
use partition_core::writer::AssignmentWriter;
use partition_core::{Config, PartitionError, Pid};

use crate::report::Report;

const LAMBDA: f64 = 1.1;

pub struct HdrfPartitioner {
    cursor: EdgeCursor,
    degree_sidecar: DegreeSidecar,
    writer: AssignmentWriter,
    partitions: usize,
    mem_budget_mib: usize,
}

impl HdrfPartitioner {
    pub fn new(base: impl Into<PathBuf>, config: Config) -> Result<Self, PartitionError> {
        config.validate().map_err(PartitionError::invariant)?;
        let paths = BasePaths::new(base.into());
        let cursor = EdgeCursor::open(paths.binedgelist())?;
        let degree_sidecar =
            DegreeSidecar::load(paths.degree(), cursor.header().num_vertices as usize)?;
        let writer = AssignmentWriter::create(paths.assignment())?;
        Ok(Self {
            cursor,
            degree_sidecar,
            writer,
            partitions: config.partitions,
            mem_budget_mib: config.mem_budget_mib,
        })
    }

    pub fn split(mut self) -> Result<Report, PartitionError> {
        let start = Instant::now();
        let num_vertices = self.cursor.header().num_vertices as usize;
        let num_edges = self.cursor.header().num_edges;
        let p = self.partitions;
        let batch_count = self.cursor.batch_count_for_budget(self.mem_budget_mib);

        let max_partition_load = ((1.05 * num_edges as f64 / p as f64).ceil() as u64).max(1);

        let mut observed_degree = vec![0u32; num_vertices];
        let mut edge_load = vec![0u64; p];
        let vertex_in_partition: Vec<BitSet> =
            (0..p).map(|_| BitSet::new(num_vertices)).collect();
        let mut part_degrees: Vec<Vec<u32>> = vec![vec![0u32; p]; num_vertices];

        self.cursor.for_each_batch(batch_count, |batch| {
            for edge in batch {
                let (u, v) = (edge.first as usize, edge.second as usize);
                observed_degree[u] += 1;
                observed_degree[v] += 1;
                let denom = (observed_degree[u] + observed_degree[v]) as f64;

                let max_load = *edge_load.iter().max().unwrap_or(&0);

                let mut best: Option<(f64, usize)> = None;
                for part in 0..p {
                    if edge_load[part] >= max_partition_load {
                        continue;
                    }
                    let g_u = if vertex_in_partition[part].test(u) {
                        1.0 + (1.0 - observed_degree[u] as f64 / denom)
                    } else {
                        0.0
                    };
                    let g_v = if vertex_in_partition[part].test(v) {
                        1.0 + (1.0 - observed_degree[v] as f64 / denom)
                    } else {
                        0.0
                    };
                    let bal = (max_load - edge_load[part]) as f64;
                    let score = g_u + g_v + LAMBDA * bal;

                    if score < 0.0 {
                        return Err(PartitionError::invariant(format!(
                            "negative hdrf score {score} for partition {part} on edge ({u}, {v})"
                        )));
                    }
                    let better = match best {
                        None => true,
                        Some((best_score, _)) => score > best_score,
                    };
                    if better {
                        best = Some((score, part));
                    }
                }

                let Some((_, chosen)) = best else {
                    return Err(PartitionError::invariant(format!(
                        "no partition under capacity for edge ({u}, {v})"
                    )));
                };

                vertex_in_partition[chosen].set_unsync(u);
                vertex_in_partition[chosen].set_unsync(v);
                edge_load[chosen] += 1;
                part_degrees[u][chosen] += 1;
                part_degrees[v][chosen] += 1;
            }
            Ok(())
        })?;

        // Intermediate: pick one home partition per vertex.
        let mut home: Vec<Option<Pid>> = vec![None; num_vertices];
        let mut bucket_population = vec![0u32; p];
        let population_cap = 1.05 * num_vertices as f64 / p as f64;

        for v in 0..num_vertices {
            let candidates: Vec<Pid> = (0..p).filter(|&part| vertex_in_partition[part].test(v)).collect();
            let chosen = match candidates.as_slice() {
                [] => continue,
                [only] => *only,
                _ => {
                    let sidecar_degree = self.degree_sidecar.degree[v] as f64;
                    let mut best: Option<(f64, Pid)> = None;
                    for &part in &candidates {
                        let indicator = if (bucket_population[part] as f64) < population_cap {
                            1.0
                        } else {
                            0.0
                        };
                        let value = part_degrees[v][part] as f64 / (sidecar_degree + 1.0) + indicator;
                        let better = match best {
                            None => true,
                            Some((best_value, _)) => value > best_value,
                        };
                        if better {
                            best = Some((value, part));
                        }
                    }
                    best.expect("candidates is non-empty").1
                }
            };
            bucket_population[chosen] += 1;
            home[v] = Some(chosen);
            self.writer.write_vertex(v as u32, chosen)?;
        }

        // Phase 2: re-stream and emit the directed, replicated routing.
        self.cursor.for_each_batch(batch_count, |batch| {
            for edge in batch {
                let (u, v) = (edge.first as usize, edge.second as usize);
                let home_u = home[u].ok_or_else(|| {
                    PartitionError::invariant(format!("vertex {u} was never assigned a home"))
                })?;
                let home_v = home[v].ok_or_else(|| {
                    PartitionError::invariant(format!("vertex {v} was never assigned a home"))
                })?;
                self.writer.write_edge(u as u32, v as u32, home_u)?;
                self.writer.write_edge(v as u32, u as u32, home_v)?;
            }
            Ok(())
        })?;

        self.writer.finish()?;

        let boundary_popcount_sum: u64 = vertex_in_partition.iter().map(|b| b.popcount()).sum();
        Ok(Report::new(edge_load, boundary_popcount_sum, num_vertices, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partition_core::edgelist::{write_binary_edgelist, Edge};
    use tempfile::tempdir;

    fn fixture(dir: &std::path::Path, edges: &[(u32, u32)], num_vertices: u32) -> PathBuf {
        let base = dir.join("g");
        let paths = BasePaths::new(base.clone());
        let edge_vec: Vec<Edge> = edges.iter().map(|&(u, v)| Edge::new(u, v)).collect();
        write_binary_edgelist(paths.binedgelist(), num_vertices, &edge_vec).unwrap();
        let degree = DegreeSidecar::compute(num_vertices as usize, &edge_vec);
        degree.write(paths.degree()).unwrap();
        base
    }

    #[test]
    fn path_scenario_s3_every_edge_placed_without_negative_score() {
        let dir = tempdir().unwrap();
        let base = fixture(&dir, &[(0, 1), (1, 2), (2, 3), (3, 4)], 5);

        let partitioner = HdrfPartitioner::new(&base, Config {
            partitions: 2,
            ..Default::default()
        })
        .unwrap();
        let report = partitioner.split().unwrap();

        assert_eq!(report.edge_load.iter().sum::<u64>(), 4);
        assert!(report.edge_load.iter().all(|&load| load <= 3));
    }

    #[test]
    fn single_edge_boundary_behavior() {
        let dir = tempdir().unwrap();
        let base = fixture(&dir, &[(0, 1)], 2);

        let partitioner = HdrfPartitioner::new(&base, Config {
            partitions: 2,
            ..Default::default()
        })
        .unwrap();
        let report = partitioner.split().unwrap();

        assert_eq!(report.edge_load.iter().sum::<u64>(), 1);
        assert_eq!(report.replication_factor, 1.0);
    }
}
