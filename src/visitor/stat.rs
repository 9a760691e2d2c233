//! Node statistics.

use crate::error::Result;
use crate::node::{CommentNode, FeatureNode, RegionNode, SequenceNode, CDS, EXON, GENE, MRNA};
use crate::visitor::NodeVisitor;
use std::fmt;
use std::sync::Arc;

/// Counts nodes by variant and the common feature types in every tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatVisitor {
    pub regions: usize,
    pub features: usize,
    pub comments: usize,
    pub sequences: usize,
    pub genes: usize,
    pub mrnas: usize,
    pub exons: usize,
    pub cds: usize,
    /// Sum of all gene lengths.
    pub gene_length: u64,
}

impl StatVisitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeVisitor for StatVisitor {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        self.features += 1;
        for node in feature.iter() {
            match node.feature_type() {
                GENE => {
                    self.genes += 1;
                    self.gene_length = self.gene_length.saturating_add(node.range().length());
                }
                MRNA => self.mrnas += 1,
                EXON => self.exons += 1,
                CDS => self.cds += 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn visit_region_node(&mut self, _region: &Arc<RegionNode>) -> Result<()> {
        self.regions += 1;
        Ok(())
    }

    fn visit_comment_node(&mut self, _comment: &Arc<CommentNode>) -> Result<()> {
        self.comments += 1;
        Ok(())
    }

    fn visit_sequence_node(&mut self, _sequence: &Arc<SequenceNode>) -> Result<()> {
        self.sequences += 1;
        Ok(())
    }
}

impl fmt::Display for StatVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sequence regions: {}", self.regions)?;
        writeln!(f, "top-level features: {}", self.features)?;
        writeln!(f, "genes: {}", self.genes)?;
        writeln!(f, "mRNAs: {}", self.mrnas)?;
        writeln!(f, "exons: {}", self.exons)?;
        writeln!(f, "CDSs: {}", self.cds)?;
        if self.genes > 0 {
            writeln!(f, "average gene length: {}", self.gene_length / self.genes as u64)?;
        }
        writeln!(f, "comments: {}", self.comments)?;
        write!(f, "sequences: {}", self.sequences)
    }
}
