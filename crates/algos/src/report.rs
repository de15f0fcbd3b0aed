use std::time::Duration;

/// Metrics a partitioner reports at termination, logged at `info!` by
/// [`crate::algorithm::Algorithm::run`] and returned to the caller.
#[derive(Debug, Clone)]
pub struct Report {
    pub edge_load: Vec<u64>,
    /// `max(edge_load) / (num_edges / p)`. `None` when `num_edges == 0`,
    /// where the ratio is undefined (§8: "treat as skipped").
    pub balance: Option<f64>,
    /// `Σ popcount(is_boundary[p]) / num_vertices`.
    pub replication_factor: f64,
    pub elapsed: Duration,
}

impl Report {
    pub fn new(edge_load: Vec<u64>, boundary_popcount_sum: u64, num_vertices: usize, elapsed: Duration) -> Self {
        let num_edges: u64 = edge_load.iter().sum();
        let p = edge_load.len().max(1) as f64;
        let balance = if num_edges == 0 {
            None
        } else {
            let max_load = *edge_load.iter().max().unwrap_or(&0) as f64;
            Some(max_load / (num_edges as f64 / p))
        };
        let replication_factor = if num_vertices == 0 {
            0.0
        } else {
            boundary_popcount_sum as f64 / num_vertices as f64
        };
        Self {
            edge_load,
            balance,
            replication_factor,
            elapsed,
        }
    }

    pub fn log(&self, name: &str) {
        match self.balance {
            Some(balance) => log::info!(
                "{name}: balance={balance:.4} replication_factor={:.4} elapsed={:?}",
                self.replication_factor,
                self.elapsed
            ),
            None => log::info!(
                "{name}: balance=skipped (no edges) replication_factor={:.4} elapsed={:?}",
                self.replication_factor,
                self.elapsed
            ),
        }
    }
}
