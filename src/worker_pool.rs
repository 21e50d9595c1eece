//! Short-lived bounded worker pool.
//!
//! [`run_bounded`] spawns one task per item on a [`JoinSet`], while a
//! [`Semaphore`] keeps at most `concurrency` of them running. The pool is drained
//! completely before returning; outputs come back in **completion order**, each
//! tagged with the index of the item that produced it.
//!
//! Tasks share nothing but what the caller moves into them. A panicking task is
//! reported as an `Err` for its index instead of tearing the pool down.

use std::{future::Future, sync::Arc};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

pub(crate) async fn run_bounded<T, O, Fut, F>(
    items: Vec<T>,
    concurrency: usize,
    task: F,
) -> Vec<(usize, Result<O, JoinError>)>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();
    let mut task_index = std::collections::HashMap::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = task(item);
        let handle = workers.spawn(async move {
            // the semaphore lives until the pool is drained and is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            job.await
        });
        task_index.insert(handle.id(), index);
    }

    let mut outputs = Vec::with_capacity(task_index.len());
    while let Some(joined) = workers.join_next_with_id().await {
        match joined {
            Ok((id, output)) => outputs.push((task_index[&id], Ok(output))),
            Err(err) => outputs.push((task_index[&err.id()], Err(err))),
        }
    }
    outputs
}
