//! Pull-based node streams.
//!
//! A [`NodeStream`] hands out one [`GenomeNode`] per call to
//! [`NodeStream::next`]. Stages wrap an upstream stream and transform what
//! they pull from it, so a pipeline is built by nesting constructors:
//!
//! ```
//! use gfi_genomics::prelude::*;
//! use gfi_genomics::stream::{drain, ArrayInStream, MergeStream, NodeStream, SortStream};
//!
//! let a = ArrayInStream::new(vec![
//!     FeatureNode::new("ctg1", "gene", Range::new(500, 900), Strand::Forward).into(),
//! ]);
//! let b = SortStream::new(ArrayInStream::new(vec![
//!     FeatureNode::new("ctg1", "gene", Range::new(700, 800), Strand::Forward).into(),
//!     FeatureNode::new("ctg1", "gene", Range::new(100, 200), Strand::Forward).into(),
//! ]));
//! let inputs: Vec<Box<dyn NodeStream>> = vec![Box::new(a), Box::new(b)];
//! let mut merged = MergeStream::new(inputs);
//! let starts: Vec<u64> = drain(&mut merged)
//!     .unwrap()
//!     .iter()
//!     .map(|n| n.range().start())
//!     .collect();
//! assert_eq!(starts, vec![100, 500, 700]);
//! ```
//!
//! Every call runs to completion synchronously. `Ok(None)` means the
//! stream is exhausted, and every later call returns `Ok(None)` again.
//! Errors are terminal: a stage passes an upstream error on unchanged and
//! the caller is expected to stop pulling.

mod array;
mod csa;
mod feature;
mod filter;
mod merge;
mod sort;
pub mod validation;
mod visitor;

pub use array::{ArrayInStream, ArrayOutStream};
pub use csa::CsaStream;
pub use feature::{FeatureInStream, FeatureOutStream};
pub use filter::{FilterStream, ThresholdFilter, ThresholdFilterStream};
pub use merge::MergeStream;
pub use sort::SortStream;
pub use validation::NodeSortValidator;
pub use visitor::VisitorStream;

use crate::error::Result;
use crate::node::{GenomeNode, RegionNode};
use std::sync::Arc;

/// A lazy, fallible source of genome nodes.
pub trait NodeStream {
    /// Pull the next node, `Ok(None)` once exhausted.
    fn next(&mut self) -> Result<Option<GenomeNode>>;

    /// Check if the stream guarantees [`GenomeNode::compare`] order.
    fn is_sorted(&self) -> bool {
        false
    }
}

impl<S: NodeStream + ?Sized> NodeStream for Box<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        (**self).next()
    }

    fn is_sorted(&self) -> bool {
        (**self).is_sorted()
    }
}

impl<S: NodeStream + ?Sized> NodeStream for &mut S {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        (**self).next()
    }

    fn is_sorted(&self) -> bool {
        (**self).is_sorted()
    }
}

/// Adapts a [`NodeStream`] to an [`Iterator`].
///
/// The iterator ends after the first error.
pub struct NodeStreamIter<S> {
    stream: S,
    done: bool,
}

impl<S: NodeStream> NodeStreamIter<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            done: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: NodeStream> Iterator for NodeStreamIter<S> {
    type Item = Result<GenomeNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stream.next() {
            Ok(Some(node)) => Some(Ok(node)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Pull every node out of `stream`. EOF markers are skipped.
pub fn drain(stream: &mut dyn NodeStream) -> Result<Vec<GenomeNode>> {
    let mut nodes = Vec::new();
    while let Some(node) = stream.next()? {
        if !node.is_eof() {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

/// Fold region node `other` into `target` when both declare the same seqid.
///
/// The target keeps its identity unless it is shared, in which case it is
/// copied before its range is widened. Returns false if the nodes are not
/// regions of the same seqid.
pub(crate) fn consolidate_regions(target: &mut GenomeNode, other: &GenomeNode) -> bool {
    let (GenomeNode::Region(into), GenomeNode::Region(from)) = (target, other) else {
        return false;
    };
    if into.seqid() != from.seqid() {
        return false;
    }
    let joined = into.range().join(&from.range());
    if joined != into.range() {
        let region: &mut RegionNode = Arc::make_mut(into);
        region.set_range(joined);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GfiError;
    use crate::node::{FeatureNode, Strand};
    use crate::range::Range;

    struct Failing {
        remaining: usize,
    }

    impl NodeStream for Failing {
        fn next(&mut self) -> Result<Option<GenomeNode>> {
            if self.remaining == 0 {
                return Err(GfiError::upstream("producer failed"));
            }
            self.remaining -= 1;
            Ok(Some(
                FeatureNode::new("s", "gene", Range::new(1, 10), Strand::Forward).into(),
            ))
        }
    }

    #[test]
    fn test_iter_stops_after_error() {
        let results: Vec<Result<GenomeNode>> =
            NodeStreamIter::new(Failing { remaining: 2 }).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[2], Err(GfiError::Upstream(_))));
    }

    #[test]
    fn test_drain_propagates_error() {
        let mut stream = Failing { remaining: 5 };
        assert!(matches!(drain(&mut stream), Err(GfiError::Upstream(_))));
    }

    #[test]
    fn test_drain_skips_eof() {
        let mut stream = ArrayInStream::new(vec![
            GenomeNode::Eof,
            RegionNode::new("s", Range::new(1, 10)).into(),
            GenomeNode::Eof,
        ]);
        assert_eq!(drain(&mut stream).unwrap().len(), 1);
    }

    #[test]
    fn test_consolidate_regions_copies_shared_node() {
        let shared = Arc::new(RegionNode::new("s", Range::new(100, 200)));
        let mut target = GenomeNode::Region(Arc::clone(&shared));
        let other: GenomeNode = RegionNode::new("s", Range::new(50, 150)).into();
        assert!(consolidate_regions(&mut target, &other));
        assert_eq!(target.range(), Range::new(50, 200));
        assert_eq!(shared.range(), Range::new(100, 200));

        let different: GenomeNode = RegionNode::new("t", Range::new(1, 2)).into();
        assert!(!consolidate_regions(&mut target, &different));
    }
}
