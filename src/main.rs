use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use clap::Parser;
use rayon::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use voracious_radix_sort::RadixSort;
use worktree_merge_sort::{is_sorted, parallel_sort, same_multiset, sequential_sort};

/// Times the task-tree merge sort against sequential and library sorts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log2 of each input size to benchmark.
    #[arg(long, value_delimiter = ',', default_values_t = [20, 25])]
    lg_sizes: Vec<u32>,

    /// Worker counts to run the parallel sort with.
    #[arg(short, long, value_delimiter = ',', default_values_t = [8])]
    workers: Vec<usize>,

    /// Timed runs per sort, after one untimed warmup.
    #[arg(short, long, default_value_t = 1)]
    repeats: usize,

    /// Seed for the input generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Skip the slice/rayon/radix baselines.
    #[arg(long)]
    no_baselines: bool,
}

/// Runs `sort` on a fresh copy of `input` `repeats` times after a warmup and
/// reports the mean. Returns the output of the last run.
fn benchmark(
    name: &str,
    input: &[i32],
    repeats: usize,
    mut sort: impl FnMut(&mut [i32]) -> anyhow::Result<()>,
) -> anyhow::Result<Vec<i32>> {
    let mut data = input.to_vec();
    // Warmup.
    sort(&mut data[..]).with_context(|| format!("{name} failed"))?;
    let mut total = Duration::ZERO;
    for _ in 0..repeats {
        data.copy_from_slice(input);
        let start = Instant::now();
        sort(&mut data[..]).with_context(|| format!("{name} failed"))?;
        total += start.elapsed();
    }
    println!("  {}: {}", name, human_time(repeats, total));
    ensure!(is_sorted(&data), "{name} produced unsorted output");
    Ok(data)
}

fn human_time(repeats: usize, duration: Duration) -> String {
    let mut duration = duration.as_nanos() as f64 / repeats as f64;
    if duration < 1000.0 {
        return format!("{:.1}ns", duration);
    }
    duration /= 1000.0;
    if duration < 1000.0 {
        return format!("{:.1}us", duration);
    }
    duration /= 1000.0;
    if duration < 1000.0 {
        return format!("{:.1}ms", duration);
    }
    duration /= 1000.0;
    format!("{:.1}s", duration)
}

fn human_size(size: usize) -> String {
    if size < 1024 {
        return format!("{}B", size);
    }
    let mut size = size as f64;
    size /= 1024.0;
    if size < 1024.0 {
        return format!("{:.1}KiB", size);
    }
    size /= 1024.0;
    if size < 1024.0 {
        return format!("{:.1}MiB", size);
    }
    size /= 1024.0;
    format!("{:.1}GiB", size)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    ensure!(args.repeats > 0, "--repeats must be at least 1");
    ensure!(
        args.workers.iter().all(|&w| w > 0),
        "--workers entries must be at least 1"
    );
    info!(?args, "starting benchmark");

    let mut rng = fastrand::Rng::with_seed(args.seed);
    for lg_size in args.lg_sizes {
        ensure!(lg_size < 32, "--lg-sizes entries must be below 32");
        let input: Vec<i32> = (0..1usize << lg_size).map(|_| rng.i32(..)).collect();
        println!("size: {}", human_size(std::mem::size_of::<i32>() * input.len()));

        let expected = benchmark("Sequential", &input, args.repeats, |data| {
            let len = data.len();
            Ok(sequential_sort(data, 0, len)?)
        })?;
        ensure!(
            same_multiset(&input, &expected),
            "sequential sort lost or duplicated elements"
        );

        for &workers in &args.workers {
            let name = format!("Parallel ({workers} workers)");
            let output = benchmark(&name, &input, args.repeats, |data| {
                let stats = parallel_sort(data, workers)?;
                debug!(?stats, "parallel sort finished");
                Ok(())
            })?;
            ensure!(output == expected, "{name} disagrees with the sequential sort");
        }

        if args.no_baselines {
            continue;
        }
        benchmark("slice::sort_unstable", &input, args.repeats, |data| {
            data.sort_unstable();
            Ok(())
        })?;
        benchmark("rayon par_sort_unstable", &input, args.repeats, |data| {
            data.par_sort_unstable();
            Ok(())
        })?;
        let threads = rayon::current_num_threads();
        benchmark("voracious_mt_sort", &input, args.repeats, |data| {
            data.voracious_mt_sort(threads);
            Ok(())
        })?;
    }
    Ok(())
}
