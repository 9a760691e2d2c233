//! Visitor that adds every region and feature it sees to a feature index.

use crate::error::Result;
use crate::index::FeatureIndex;
use crate::node::{FeatureNode, RegionNode};
use crate::visitor::NodeVisitor;
use std::sync::Arc;

/// Sink that populates a [`FeatureIndex`].
///
/// Comments and sequences are ignored.
pub struct FeatureVisitor<'a, I: FeatureIndex + ?Sized> {
    index: &'a I,
    features_added: usize,
    regions_added: usize,
}

impl<'a, I: FeatureIndex + ?Sized> FeatureVisitor<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            features_added: 0,
            regions_added: 0,
        }
    }

    pub fn index(&self) -> &'a I {
        self.index
    }

    pub fn features_added(&self) -> usize {
        self.features_added
    }

    pub fn regions_added(&self) -> usize {
        self.regions_added
    }
}

impl<I: FeatureIndex + ?Sized> NodeVisitor for FeatureVisitor<'_, I> {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        self.index.add_feature_node(feature)?;
        self.features_added += 1;
        Ok(())
    }

    fn visit_region_node(&mut self, region: &Arc<RegionNode>) -> Result<()> {
        self.index.add_region_node(region)?;
        self.regions_added += 1;
        Ok(())
    }
}
