//! Bridge to the parallel runtime.
//!
//! The executors see two primitive families, both backed by rayon when the
//! `parallel` feature is on:
//!
//! - [`parallel_region`]: run one closure per pool thread and collect the
//!   results (the fork-join loop executor builds its schedules on top)
//! - [`split_for_each`] / [`split_reduce`]: adaptive recursive splitting of a
//!   splittable range, with leaves stolen by idle workers
//!
//! Without `parallel` the same functions run on the calling thread: a region
//! has exactly one worker and a split range is never divided.

/// Identity of one worker inside a [`parallel_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerCtx {
    /// 0-based worker index, `< num_workers`.
    pub(crate) index: usize,
    /// Number of workers taking part in the region.
    pub(crate) num_workers: usize,
}

/// Number of worker threads the parallel executors fan out to.
///
/// This is the size of the current rayon pool, or 1 without `parallel`.
pub fn current_num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Configure the size of rayon's global pool.
///
/// Must be called before the global pool is first used; afterwards rayon
/// refuses and [`crate::ParError::ThreadPoolBuild`] is returned. When never
/// called, rayon sizes the pool from `RAYON_NUM_THREADS` or the core count.
#[cfg(feature = "parallel")]
pub fn configure_global_pool(num_threads: usize) -> crate::Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("strided-par-{i}"))
        .build_global()?;
    tracing::debug!(num_threads, "configured global pool");
    Ok(())
}

/// Number of workers a region capped at `max_workers` would use.
pub(crate) fn region_width(max_workers: Option<usize>) -> usize {
    let pool = current_num_threads();
    max_workers.map_or(pool, |cap| cap.clamp(1, pool))
}

/// Run `op` once per worker and return the per-worker results in worker order.
///
/// Workers beyond `max_workers` sit the region out. The call returns after
/// every worker has finished.
#[cfg(feature = "parallel")]
pub(crate) fn parallel_region<R, OP>(max_workers: Option<usize>, op: OP) -> Vec<R>
where
    OP: Fn(WorkerCtx) -> R + Sync,
    R: Send,
{
    let num_workers = region_width(max_workers);
    if num_workers == 1 {
        return vec![op(WorkerCtx {
            index: 0,
            num_workers,
        })];
    }
    rayon::broadcast(|ctx| {
        (ctx.index() < num_workers).then(|| {
            op(WorkerCtx {
                index: ctx.index(),
                num_workers,
            })
        })
    })
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn parallel_region<R, OP>(_max_workers: Option<usize>, op: OP) -> Vec<R>
where
    OP: Fn(WorkerCtx) -> R,
{
    vec![op(WorkerCtx {
        index: 0,
        num_workers: 1,
    })]
}

/// Split `data` recursively with `splitter` and run `leaf` on every piece.
///
/// How far the data is split is rayon's decision; `splitter` returns `None`
/// as its second element once a piece cannot be divided further.
#[cfg(feature = "parallel")]
pub(crate) fn split_for_each<D, S, L>(data: D, splitter: S, leaf: L)
where
    D: Send,
    S: Fn(D) -> (D, Option<D>) + Sync + Send,
    L: Fn(D) + Sync + Send,
{
    use rayon::iter::ParallelIterator;
    rayon::iter::split(data, splitter).for_each(leaf);
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn split_for_each<D, S, L>(data: D, _splitter: S, leaf: L)
where
    S: Fn(D) -> (D, Option<D>),
    L: Fn(D),
{
    leaf(data);
}

/// Split like [`split_for_each`], reduce every leaf with `leaf` and join
/// sibling results with `join` in a binary tree.
///
/// Returns `None` only if no leaf ran.
#[cfg(feature = "parallel")]
pub(crate) fn split_reduce<D, S, A, L, J>(data: D, splitter: S, leaf: L, join: J) -> Option<A>
where
    D: Send,
    S: Fn(D) -> (D, Option<D>) + Sync + Send,
    A: Send,
    L: Fn(D) -> A + Sync + Send,
    J: Fn(A, A) -> A + Sync + Send,
{
    use rayon::iter::ParallelIterator;
    rayon::iter::split(data, splitter).map(leaf).reduce_with(join)
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn split_reduce<D, S, A, L, J>(data: D, _splitter: S, leaf: L, _join: J) -> Option<A>
where
    S: Fn(D) -> (D, Option<D>),
    L: Fn(D) -> A,
    J: Fn(A, A) -> A,
{
    Some(leaf(data))
}

/// Run `f` inside a dedicated pool of `num_threads` workers, so tests see
/// several workers regardless of the machine's core count.
#[cfg(test)]
pub(crate) fn on_pool<R: Send>(num_threads: usize, f: impl FnOnce() -> R + Send) -> R {
    #[cfg(feature = "parallel")]
    {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .unwrap()
            .install(f)
    }
    #[cfg(not(feature = "parallel"))]
    {
        let _ = num_threads;
        f()
    }
}
