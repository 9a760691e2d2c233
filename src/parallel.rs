//! Parallel population and querying of feature indices.
//!
//! The node stream pipeline itself is single-threaded. Parallelism lives at
//! the index boundary: several independent pipelines may feed one index
//! from their own threads, and batches of range queries can be fanned out
//! over Rayon's pool.

use crate::error::{GfiError, Result};
use crate::index::{FeatureIndex, FeatureIndexExt};
use crate::node::FeatureNode;
use crate::range::Range;
use crate::stream::NodeStream;
use crossbeam_channel::unbounded;
use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;
use std::thread;

/// Minimum number of queries before fanning out to the thread pool.
/// Below this threshold, sequential processing is faster.
pub const PARALLEL_THRESHOLD: usize = 64;

/// Drain every stream into `index`, one scoped thread per stream.
///
/// Each stream is read completely before its nodes are added, so a
/// failing stream adds nothing. The other streams are not affected by it.
/// All threads run to completion; the error of the lowest-numbered failing
/// stream is returned. On success the total number of nodes read is
/// returned.
pub fn populate_parallel<'a, I>(index: &I, streams: Vec<Box<dyn NodeStream + Send + 'a>>) -> Result<usize>
where
    I: FeatureIndex + ?Sized,
{
    let num_streams = streams.len();
    let (sender, receiver) = unbounded::<(usize, Result<usize>)>();

    thread::scope(|scope| {
        for (input, mut stream) in streams.into_iter().enumerate() {
            let sender = sender.clone();
            scope.spawn(move || {
                let result = index.add_from_stream(&mut *stream);
                debug!("input {} finished: {:?}", input, result.as_ref().ok());
                // the receiver outlives the scope
                let _ = sender.send((input, result));
            });
        }
    });
    drop(sender);

    let mut results: Vec<(usize, Result<usize>)> = receiver.iter().collect();
    if results.len() != num_streams {
        return Err(GfiError::upstream(format!(
            "{} of {} population threads did not report",
            num_streams - results.len(),
            num_streams
        )));
    }
    results.sort_by_key(|(input, _)| *input);

    let mut total = 0;
    for (_, result) in results {
        total += result?;
    }
    info!("populated index from {} streams ({} nodes)", num_streams, total);
    Ok(total)
}

/// Run `get_features_for_range` for every range of `seqid`.
///
/// Results are in the order of `ranges`. Fails with `SeqidNotFound` if the
/// seqid is unknown.
pub fn query_ranges_parallel<I>(
    index: &I,
    seqid: &str,
    ranges: &[Range],
) -> Result<Vec<Vec<Arc<FeatureNode>>>>
where
    I: FeatureIndex + ?Sized,
{
    if !index.has_seqid(seqid)? {
        return Err(GfiError::SeqidNotFound(seqid.to_string()));
    }
    if ranges.len() < PARALLEL_THRESHOLD {
        return ranges
            .iter()
            .map(|&range| index.get_features_for_range(seqid, range))
            .collect();
    }
    ranges
        .par_iter()
        .map(|&range| index.get_features_for_range(seqid, range))
        .collect()
}
