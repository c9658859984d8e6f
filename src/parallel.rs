use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::types::Method;

/// Runs `task` once per method, in parallel on a pool of at most `cores`
/// threads (the global rayon pool when `None`). Results keep `methods` order;
/// the first error wins.
pub fn map_methods<T, F>(cores: Option<usize>, methods: &[Method], task: F) -> Result<Vec<T>>
where
    F: Fn(Method) -> Result<T> + Send + Sync,
    T: Send,
{
    let run = || {
        methods
            .par_iter()
            .map(|&method| task(method))
            .collect::<Vec<Result<T>>>()
    };
    let results = match resolve_threads(cores, methods.len()) {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("collector-{i}"))
            .build()
            .context("build collector thread pool")?
            .install(run),
        None => run(),
    };
    collect_results(results)
}

fn collect_results<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(results.len());
    for res in results {
        out.push(res?);
    }
    Ok(out)
}

pub fn resolve_threads(cores: Option<usize>, tasks: usize) -> Option<usize> {
    let cores = cores?;
    let capped = cores.clamp(1, tasks.max(1));
    if cores > capped {
        tracing::warn!(
            "Provided cores ({cores}) greater than number of collectors ({tasks}); using {capped}"
        );
    }
    Some(capped)
}
