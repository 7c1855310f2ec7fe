//! Concurrent resolution of independent pairs.
//!
//! Pairs share only the read-only [`Resolver`]. Each pair resolves on the
//! blocking pool; a semaphore bounds how many run at once.

use crate::engine::{ResolutionOutcome, Resolver};
use crate::error::{ResolutionError, ResolutionResult};
use fieldsync_types::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// One matched pair awaiting resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairInput {
    pub master: Record,
    pub slave: Record,
    /// Overrides the run's default last sync time.
    #[serde(default)]
    pub last_sync: Option<Value>,
}

impl PairInput {
    pub fn new(master: Record, slave: Record) -> Self {
        Self {
            master,
            slave,
            last_sync: None,
        }
    }

    #[must_use]
    pub fn with_last_sync(mut self, last_sync: Value) -> Self {
        self.last_sync = Some(last_sync);
        self
    }
}

fn resolve_pair(resolver: &Resolver, pair: PairInput) -> ResolutionResult<ResolutionOutcome> {
    resolver
        .resolve(pair.master, pair.slave, pair.last_sync.as_ref())?
        .into_outcome()
}

/// Resolves `pairs` with at most `workers` in flight (at least one).
///
/// Results come back in input order, each tagged with its input index, one
/// per input. A pair whose worker or task failed yields an assertion error;
/// the rest of the batch is unaffected.
pub async fn resolve_batch(
    resolver: Arc<Resolver>,
    pairs: Vec<PairInput>,
    workers: usize,
) -> Vec<(usize, ResolutionResult<ResolutionOutcome>)> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set = JoinSet::new();
    let mut indices = HashMap::new();
    let total = pairs.len();

    for (index, pair) in pairs.into_iter().enumerate() {
        let resolver = Arc::clone(&resolver);
        let semaphore = Arc::clone(&semaphore);
        let handle = join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, Err(ResolutionError::Assertion("worker pool closed".into())));
            };
            let result = match tokio::task::spawn_blocking(move || resolve_pair(&resolver, pair))
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(index, "resolution worker panicked: {}", e);
                    Err(ResolutionError::Assertion(format!("pair {index} worker failed: {e}")))
                }
            };
            (index, result)
        });
        indices.insert(handle.id(), index);
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((_, entry)) => results.push(entry),
            Err(e) => {
                warn!("batch task failed: {}", e);
                if let Some(&index) = indices.get(&e.id()) {
                    results.push((
                        index,
                        Err(ResolutionError::Assertion(format!("pair {index} task failed: {e}"))),
                    ));
                }
            }
        }
    }
    let results = in_input_order(results, total);

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    debug!(pairs = total, failed, "batch resolved");
    results
}

/// Sorts results by input index, giving every index without a result an
/// assertion error so the output always has one entry per input.
fn in_input_order(
    mut results: Vec<(usize, ResolutionResult<ResolutionOutcome>)>,
    total: usize,
) -> Vec<(usize, ResolutionResult<ResolutionOutcome>)> {
    results.sort_by_key(|(index, _)| *index);
    if results.len() == total {
        return results;
    }
    let mut found = results.into_iter().peekable();
    let mut ordered = Vec::with_capacity(total);
    for index in 0..total {
        match found.next_if(|(i, _)| *i == index) {
            Some(entry) => ordered.push(entry),
            None => {
                warn!(index, "pair produced no result");
                ordered.push((
                    index,
                    Err(ResolutionError::Assertion(format!("pair {index} produced no result"))),
                ));
            }
        }
    }
    ordered
}
