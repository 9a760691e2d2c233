//! Visitors over genome nodes.
//!
//! [`GenomeNode::accept`](crate::node::GenomeNode::accept) dispatches each
//! node to the `visit_*` method matching its variant. Every method has a
//! default implementation that does nothing, so a visitor only overrides
//! the variants it cares about. A visitor error aborts whatever pipeline
//! is driving it.
//!
//! - [`FeatureVisitor`] adds regions and features to a feature index.
//! - [`FilterVisitor`] buffers the nodes that pass a [`FilterConfig`].
//! - [`StatVisitor`] counts nodes and feature types.
//! - [`CsaVisitor`] replaces spliced alignments with consensus genes.

mod csa;
mod feature;
mod filter;
mod stat;

pub use csa::{CsaVisitor, DEFAULT_JOIN_LENGTH};
pub use feature::FeatureVisitor;
pub use filter::{FilterConfig, FilterVisitor};
pub use stat::StatVisitor;

use crate::error::Result;
use crate::node::{CommentNode, FeatureNode, RegionNode, SequenceNode};
use std::sync::Arc;

/// Double-dispatch target for [`GenomeNode`](crate::node::GenomeNode) variants.
pub trait NodeVisitor {
    fn visit_feature_node(&mut self, _feature: &Arc<FeatureNode>) -> Result<()> {
        Ok(())
    }

    fn visit_region_node(&mut self, _region: &Arc<RegionNode>) -> Result<()> {
        Ok(())
    }

    fn visit_comment_node(&mut self, _comment: &Arc<CommentNode>) -> Result<()> {
        Ok(())
    }

    fn visit_sequence_node(&mut self, _sequence: &Arc<SequenceNode>) -> Result<()> {
        Ok(())
    }

    fn visit_eof_node(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<V: NodeVisitor + ?Sized> NodeVisitor for &mut V {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        (**self).visit_feature_node(feature)
    }

    fn visit_region_node(&mut self, region: &Arc<RegionNode>) -> Result<()> {
        (**self).visit_region_node(region)
    }

    fn visit_comment_node(&mut self, comment: &Arc<CommentNode>) -> Result<()> {
        (**self).visit_comment_node(comment)
    }

    fn visit_sequence_node(&mut self, sequence: &Arc<SequenceNode>) -> Result<()> {
        (**self).visit_sequence_node(sequence)
    }

    fn visit_eof_node(&mut self) -> Result<()> {
        (**self).visit_eof_node()
    }
}

impl<V: NodeVisitor + ?Sized> NodeVisitor for Box<V> {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        (**self).visit_feature_node(feature)
    }

    fn visit_region_node(&mut self, region: &Arc<RegionNode>) -> Result<()> {
        (**self).visit_region_node(region)
    }

    fn visit_comment_node(&mut self, comment: &Arc<CommentNode>) -> Result<()> {
        (**self).visit_comment_node(comment)
    }

    fn visit_sequence_node(&mut self, sequence: &Arc<SequenceNode>) -> Result<()> {
        (**self).visit_sequence_node(sequence)
    }

    fn visit_eof_node(&mut self) -> Result<()> {
        (**self).visit_eof_node()
    }
}
