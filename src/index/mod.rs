//! Feature indices: genome features grouped by seqid and queried by range.
//!
//! [`FeatureIndex`] is the interface every backend implements. All methods
//! take `&self` and synchronize internally, so one index can be shared
//! between threads through an `Arc<dyn FeatureIndex>`. Cloning the `Arc`
//! takes a reference and dropping it releases one; the indexed nodes are
//! released together with the last handle.
//!
//! [`FeatureIndexMemory`] keeps everything in memory: one interval tree per
//! seqid behind a single reader-writer lock.

mod memory;

pub use memory::FeatureIndexMemory;

use crate::error::Result;
use crate::gff3::Gff3InStream;
use crate::node::{FeatureNode, RegionNode};
use crate::range::Range;
use crate::stream::{self, NodeStream};
use crate::visitor::FeatureVisitor;
use log::info;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

/// A thread-safe spatial index over feature nodes keyed by seqid.
pub trait FeatureIndex: Send + Sync {
    /// Register a sequence region. Adding a seqid that is already known is
    /// a no-op.
    fn add_region_node(&self, region: &Arc<RegionNode>) -> Result<()>;

    /// Index a top-level feature by its own range. Children are not
    /// indexed separately. The seqid is created on first use.
    fn add_feature_node(&self, feature: &Arc<FeatureNode>) -> Result<()>;

    /// Remove a previously added feature (matched by identity). Unknown
    /// features are ignored.
    fn remove_node(&self, feature: &Arc<FeatureNode>) -> Result<()>;

    /// All features indexed under `seqid`, in unspecified order.
    ///
    /// Fails with `SeqidNotFound` for unknown seqids.
    fn get_features_for_seqid(&self, seqid: &str) -> Result<Vec<Arc<FeatureNode>>>;

    /// Features under `seqid` overlapping `range`, sorted by start then end.
    ///
    /// Fails with `SeqidNotFound` for unknown seqids.
    fn get_features_for_range(&self, seqid: &str, range: Range) -> Result<Vec<Arc<FeatureNode>>>;

    /// Seqid of the very first region or feature added.
    fn get_first_seqid(&self) -> Result<String>;

    /// All seqids in lexicographic order.
    fn get_seqids(&self) -> Result<Vec<String>>;

    /// Range covered by the features of `seqid`, or the declared region
    /// range if no feature was added yet.
    fn get_range_for_seqid(&self, seqid: &str) -> Result<Range>;

    /// Declared region range of `seqid`, or the feature range if no region
    /// was declared.
    fn get_orig_range_for_seqid(&self, seqid: &str) -> Result<Range>;

    fn has_seqid(&self, seqid: &str) -> Result<bool>;

    /// Persist pending changes. In-memory indices have nothing to save.
    fn save(&self) -> Result<()> {
        Ok(())
    }
}

/// Population helpers available on every feature index.
pub trait FeatureIndexExt: FeatureIndex {
    /// Drain `stream` into the index.
    ///
    /// The stream is read completely before anything is added, so a
    /// producer error leaves the index unchanged. Returns the number of
    /// nodes read.
    fn add_from_stream(&self, stream: &mut dyn NodeStream) -> Result<usize>;

    /// Read a GFF3 file and add all of its regions and features.
    fn add_gff3file<P: AsRef<Path>>(&self, path: P) -> Result<usize>;
}

impl<T: FeatureIndex + ?Sized> FeatureIndexExt for T {
    fn add_from_stream(&self, stream: &mut dyn NodeStream) -> Result<usize> {
        let nodes = stream::drain(stream)?;
        let mut visitor = FeatureVisitor::new(self);
        for node in &nodes {
            node.accept(&mut visitor)?;
        }
        Ok(nodes.len())
    }

    fn add_gff3file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let mut input = Gff3InStream::from_path(path)?;
        let count = self.add_from_stream(&mut input)?;
        info!("added {} nodes from {}", count, path.display());
        Ok(count)
    }
}

/// Order features by seqid, then start, then end.
#[inline]
pub fn compare_features(a: &FeatureNode, b: &FeatureNode) -> Ordering {
    a.seqid()
        .cmp(b.seqid())
        .then_with(|| a.range().cmp(&b.range()))
}

/// Stable sort of features by [`compare_features`].
pub fn sort_features(features: &mut [Arc<FeatureNode>]) {
    features.sort_by(|a, b| compare_features(a, b));
}
