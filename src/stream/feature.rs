//! Streams that read from and write to a feature index.

use crate::error::Result;
use crate::index::{sort_features, FeatureIndex};
use crate::node::{FeatureNode, GenomeNode, RegionNode};
use crate::stream::{NodeStream, VisitorStream};
use crate::visitor::FeatureVisitor;
use std::collections::VecDeque;
use std::sync::Arc;

/// Replays the contents of a feature index as a sorted node stream.
///
/// One region node per seqid comes first, in seqid order. Then the
/// features of each seqid follow in ascending order. The index is read
/// lazily: the seqid list on the first call, and the features of one
/// seqid at a time.
pub struct FeatureInStream<'a, I: FeatureIndex + ?Sized> {
    index: &'a I,
    original_ranges: bool,
    started: bool,
    regions: VecDeque<GenomeNode>,
    seqids: VecDeque<String>,
    /// Features of the current seqid, sorted descending so `pop` yields
    /// the smallest.
    features: Vec<Arc<FeatureNode>>,
}

impl<'a, I: FeatureIndex + ?Sized> FeatureInStream<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            original_ranges: false,
            started: false,
            regions: VecDeque::new(),
            seqids: VecDeque::new(),
            features: Vec::new(),
        }
    }

    /// Emit the declared region ranges instead of the feature ranges.
    pub fn with_original_ranges(mut self, original_ranges: bool) -> Self {
        self.original_ranges = original_ranges;
        self
    }

    fn start(&mut self) -> Result<()> {
        let seqids = self.index.get_seqids()?;
        for seqid in &seqids {
            let range = if self.original_ranges {
                self.index.get_orig_range_for_seqid(seqid)?
            } else {
                self.index.get_range_for_seqid(seqid)?
            };
            self.regions
                .push_back(RegionNode::new(seqid.as_str(), range).into());
        }
        self.seqids = seqids.into();
        self.started = true;
        Ok(())
    }
}

impl<I: FeatureIndex + ?Sized> NodeStream for FeatureInStream<'_, I> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        if !self.started {
            self.start()?;
        }
        if let Some(region) = self.regions.pop_front() {
            return Ok(Some(region));
        }
        loop {
            if let Some(feature) = self.features.pop() {
                return Ok(Some(GenomeNode::Feature(feature)));
            }
            let Some(seqid) = self.seqids.pop_front() else {
                return Ok(None);
            };
            let mut features = self.index.get_features_for_seqid(&seqid)?;
            sort_features(&mut features);
            features.reverse();
            self.features = features;
        }
    }

    fn is_sorted(&self) -> bool {
        true
    }
}

/// Pass-through stage that adds every region and feature to an index.
pub struct FeatureOutStream<'a, S, I: FeatureIndex + ?Sized> {
    inner: VisitorStream<S, FeatureVisitor<'a, I>>,
}

impl<'a, S: NodeStream, I: FeatureIndex + ?Sized> FeatureOutStream<'a, S, I> {
    pub fn new(upstream: S, index: &'a I) -> Self {
        Self {
            inner: VisitorStream::new(upstream, FeatureVisitor::new(index)),
        }
    }

    pub fn features_added(&self) -> usize {
        self.inner.visitor().features_added()
    }

    pub fn regions_added(&self) -> usize {
        self.inner.visitor().regions_added()
    }
}

impl<S: NodeStream, I: FeatureIndex + ?Sized> NodeStream for FeatureOutStream<'_, S, I> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        self.inner.next()
    }

    fn is_sorted(&self) -> bool {
        self.inner.is_sorted()
    }
}
