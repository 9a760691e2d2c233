//! Filtering stream stages.

use crate::error::Result;
use crate::node::{FeatureNode, GenomeNode};
use crate::stream::NodeStream;
use crate::visitor::{FilterConfig, FilterVisitor};
use std::sync::Arc;

/// Drives a [`FilterVisitor`] and hands out the nodes that pass.
pub struct FilterStream<S> {
    upstream: S,
    visitor: FilterVisitor,
}

impl<S: NodeStream> FilterStream<S> {
    pub fn new(upstream: S, config: FilterConfig) -> Self {
        Self {
            upstream,
            visitor: FilterVisitor::new(config),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        self.visitor.config()
    }
}

impl<S: NodeStream> NodeStream for FilterStream<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        loop {
            if let Some(node) = self.visitor.pop_node() {
                return Ok(Some(node));
            }
            match self.upstream.next()? {
                Some(node) => node.accept(&mut self.visitor)?,
                None => return Ok(None),
            }
        }
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}

/// Minimum value of a numeric attribute on features of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdFilter {
    feature_type: String,
    attribute: String,
    threshold: f64,
}

impl ThresholdFilter {
    pub fn new(feature_type: impl Into<String>, attribute: impl Into<String>, threshold: f64) -> Self {
        Self {
            feature_type: feature_type.into(),
            attribute: attribute.into(),
            threshold,
        }
    }

    #[inline]
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    fn applies_to(&self, feature: &FeatureNode) -> bool {
        feature.has_type(&self.feature_type)
    }

    /// Check if a feature of the filtered type reaches the threshold.
    ///
    /// A missing or malformed attribute does not pass.
    pub fn passes(&self, feature: &FeatureNode) -> bool {
        feature
            .get_attribute(&self.attribute)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .is_some_and(|value| value >= self.threshold)
    }

    fn rejects_descendant(&self, feature: &FeatureNode) -> bool {
        feature
            .iter()
            .skip(1)
            .any(|n| self.applies_to(n) && !self.passes(n))
    }

    /// Remove every failing descendant of the filtered type, with its subtree.
    fn prune(&self, feature: &mut FeatureNode) {
        feature
            .children_mut()
            .retain(|child| !self.applies_to(child) || self.passes(child));
        for child in feature.children_mut() {
            self.prune(child);
        }
    }
}

/// Drops features of one type whose numeric attribute is below a threshold.
///
/// Top-level features of the filtered type that fail are dropped whole.
/// Retained trees lose their failing descendants of that type. Nodes of
/// every other kind pass unchanged.
pub struct ThresholdFilterStream<S> {
    upstream: S,
    filter: ThresholdFilter,
    dropped: usize,
}

impl<S: NodeStream> ThresholdFilterStream<S> {
    pub fn new(upstream: S, filter: ThresholdFilter) -> Self {
        Self {
            upstream,
            filter,
            dropped: 0,
        }
    }

    pub fn filter(&self) -> &ThresholdFilter {
        &self.filter
    }

    /// Number of top-level features dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn apply(&self, feature: Arc<FeatureNode>) -> Option<Arc<FeatureNode>> {
        if self.filter.applies_to(&feature) && !self.filter.passes(&feature) {
            return None;
        }
        if !self.filter.rejects_descendant(&feature) {
            return Some(feature);
        }
        let mut pruned = Arc::unwrap_or_clone(feature);
        self.filter.prune(&mut pruned);
        Some(Arc::new(pruned))
    }
}

impl<S: NodeStream> NodeStream for ThresholdFilterStream<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        while let Some(node) = self.upstream.next()? {
            let GenomeNode::Feature(feature) = node else {
                return Ok(Some(node));
            };
            match self.apply(feature) {
                Some(kept) => return Ok(Some(GenomeNode::Feature(kept))),
                None => self.dropped += 1,
            }
        }
        Ok(None)
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}
