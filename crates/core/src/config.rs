/// Partitioner configuration. Populated by the (out-of-scope) CLI or built
/// directly by tests; this crate never parses argv.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of partitions, `p`. Must be `>= 2`.
    pub partitions: usize,
    /// Memory budget in MiB, used to size the HDRF batch count and the
    /// shuffler's per-worker buffers.
    pub mem_budget_mib: usize,
    /// SNE only: if set, the sample covers the whole input and the
    /// partitioner never streams from disk mid-run.
    pub in_memory: bool,
    /// SNE only: fraction of vertices, in `(0, 1]`, whose edges make up the
    /// streaming sample window.
    pub sample_ratio: f64,
    /// Explicit PRNG seed, for reproducible runs.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partitions: 2,
            mem_budget_mib: 256,
            in_memory: false,
            sample_ratio: 0.1,
            seed: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.partitions < 2 {
            return Err(format!(
                "partitions must be >= 2, got {}",
                self.partitions
            ));
        }
        if !(0.0..=1.0).contains(&self.sample_ratio) || self.sample_ratio <= 0.0 {
            return Err(format!(
                "sample_ratio must be in (0, 1], got {}",
                self.sample_ratio
            ));
        }
        Ok(())
    }
}
