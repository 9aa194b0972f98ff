/// Parallel processing utilities
use rayon::prelude::*;

pub fn configure_thread_pool(threads: usize) -> Result<usize, rayon::ThreadPoolBuildError> {
    let threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    Ok(threads)
}

/// Map `items` in parallel, one bounded batch at a time, handing each batch's
/// results to `emit` in input order
pub fn ordered_batches<T, R, F, E>(
    items: &[T],
    batch_size: usize,
    f: F,
    mut emit: E,
) -> std::io::Result<()>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    E: FnMut(&T, R) -> std::io::Result<()>,
{
    for chunk in items.chunks(batch_size.max(1)) {
        let results: Vec<R> = chunk.par_iter().map(&f).collect();
        for (item, result) in chunk.iter().zip(results) {
            emit(item, result)?;
        }
    }
    Ok(())
}
