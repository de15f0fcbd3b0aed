use std::path::PathBuf;

use clap::{Parser, Subcommand};
use partition_algos::Algorithm;
use partition_core::Config;

/// Partition a binary edgelist into `partitions` buckets with a streaming
/// vertex-cut algorithm.
#[derive(Debug, Parser)]
#[clap(author, version, about, propagate_version = true)]
struct Args {
    /// Base path; the run reads `<path>.binedgelist`/`.degree` and writes
    /// `<path>.assignment.bin`.
    #[clap(short, long)]
    path: PathBuf,

    /// Number of partitions to split into.
    #[clap(short = 'k', long, default_value_t = Config::default().partitions)]
    partitions: usize,

    /// Memory budget per streaming batch, in MiB.
    #[clap(long, default_value_t = Config::default().mem_budget_mib)]
    mem_budget_mib: usize,

    /// Keep the whole edge list resident rather than re-streaming from disk.
    #[clap(long)]
    in_memory: bool,

    /// SNE sample window size, as a fraction of the edge count.
    #[clap(long, default_value_t = Config::default().sample_ratio)]
    sample_ratio: f64,

    /// RNG seed for SNE's master assignment and the optional shuffle pass.
    #[clap(long, default_value_t = Config::default().seed)]
    seed: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    algorithm: AlgorithmArg,
}

#[derive(Debug, Subcommand)]
enum AlgorithmArg {
    /// Degree-based hashing: one pass, routed by lower-degree endpoint.
    Dbh,
    /// High-Degree-Replicated-First: two-phase streaming vertex-cut.
    Hdrf,
    /// Streaming Neighbor Expansion: grows partitions from sampled seeds.
    Sne,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Dbh => Algorithm::Dbh,
            AlgorithmArg::Hdrf => Algorithm::Hdrf,
            AlgorithmArg::Sne => Algorithm::Sne,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config {
        partitions: args.partitions,
        mem_budget_mib: args.mem_budget_mib,
        in_memory: args.in_memory,
        sample_ratio: args.sample_ratio,
        seed: args.seed,
    };
    config.validate().map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;

    log::info!(
        "running {:?} over {:?} into {} partitions",
        args.algorithm,
        args.path,
        config.partitions
    );

    let algorithm: Algorithm = args.algorithm.into();
    let report = algorithm.run(args.path, config)?;
    report.log(algorithm.name());

    Ok(())
}
