//! A small timing harness for decode and render paths.

use std::time::{Duration, Instant};

/// Options for a benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct BenchOptions {
    /// timed iterations
    pub iterations: u32,
    /// untimed iterations run first
    pub warmup: u32,
    /// sample resident memory before and after the timed loop
    pub sample_memory: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        BenchOptions {
            iterations: 10,
            warmup: 2,
            sample_memory: false,
        }
    }
}

/// The measurements of a benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct BenchReport {
    /// timed iterations run
    pub iterations: u32,
    /// total elapsed wall-clock time
    pub total: Duration,
    /// the fastest iteration
    pub min: Duration,
    /// the slowest iteration
    pub max: Duration,
    /// the mean iteration time
    pub mean: Duration,
    /// resident set size before the timed loop, when sampled
    pub rss_before: Option<u64>,
    /// resident set size after the timed loop, when sampled
    pub rss_after: Option<u64>,
}

impl std::fmt::Display for BenchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} iterations: mean {:?}, min {:?}, max {:?}",
            self.iterations, self.mean, self.min, self.max
        )?;
        if let (Some(before), Some(after)) = (self.rss_before, self.rss_after) {
            write!(
                f,
                ", rss {} -> {} KiB",
                before / 1024,
                after / 1024
            )?;
        }
        Ok(())
    }
}

/// Time a closure over the configured number of iterations.
pub fn run<F>(options: &BenchOptions, mut f: F) -> BenchReport
where
    F: FnMut(),
{
    for _ in 0..options.warmup {
        f();
    }

    let rss_before = options.sample_memory.then(resident_set_bytes).flatten();
    let iterations = options.iterations.max(1);

    let mut total = Duration::ZERO;
    let mut min = Duration::MAX;
    let mut max = Duration::ZERO;
    for _ in 0..iterations {
        let start = Instant::now();
        f();
        let elapsed = start.elapsed();
        total += elapsed;
        min = min.min(elapsed);
        max = max.max(elapsed);
    }
    let rss_after = options.sample_memory.then(resident_set_bytes).flatten();

    BenchReport {
        iterations,
        total,
        min,
        max,
        mean: total / iterations,
        rss_before,
        rss_after,
    }
}

/// The process's resident set size in bytes, when the platform
/// exposes it.
#[cfg(target_os = "linux")]
pub fn resident_set_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

/// The process's resident set size in bytes, when the platform
/// exposes it.
#[cfg(not(target_os = "linux"))]
pub fn resident_set_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_iterations() {
        let mut count = 0u32;
        let report = run(
            &BenchOptions {
                iterations: 5,
                warmup: 2,
                sample_memory: false,
            },
            || count += 1,
        );
        assert_eq!(count, 7);
        assert_eq!(report.iterations, 5);
        assert!(report.min <= report.mean && report.mean <= report.max);
        assert!(report.total >= report.max);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn samples_resident_memory_on_linux() {
        let report = run(
            &BenchOptions {
                iterations: 1,
                warmup: 0,
                sample_memory: true,
            },
            || {},
        );
        assert!(report.rss_before.is_some());
        assert!(report.rss_after.is_some());
    }
}
