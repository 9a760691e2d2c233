//! Filtering visitor: buffers the nodes that pass a set of criteria.

use crate::error::Result;
use crate::node::{CommentNode, FeatureNode, GenomeNode, RegionNode, SequenceNode, Strand, GENE};
use crate::range::Range;
use crate::visitor::NodeVisitor;
use std::collections::VecDeque;
use std::sync::Arc;

/// Criteria applied by a [`FilterVisitor`]. Unset criteria let everything pass.
///
/// The gene criteria (`max_gene_length`, `max_gene_num`, scores and
/// `feature_num`) only apply to top-level features of type `gene`.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub seqid: Option<String>,
    pub feature_type: Option<String>,
    pub contain_range: Option<Range>,
    pub overlap_range: Option<Range>,
    pub strand: Option<Strand>,
    pub target_strand: Option<Strand>,
    pub has_cds: bool,
    pub max_gene_length: Option<u64>,
    pub max_gene_num: Option<usize>,
    pub min_gene_score: Option<f64>,
    pub max_gene_score: Option<f64>,
    pub min_average_splice_site_prob: Option<f64>,
    /// Keep only the n-th feature (1-based, counting every feature seen).
    pub feature_num: Option<usize>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seqid(mut self, seqid: impl Into<String>) -> Self {
        self.seqid = Some(seqid.into());
        self
    }

    pub fn with_feature_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }

    pub fn with_contain_range(mut self, range: Range) -> Self {
        self.contain_range = Some(range);
        self
    }

    pub fn with_overlap_range(mut self, range: Range) -> Self {
        self.overlap_range = Some(range);
        self
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = Some(strand);
        self
    }

    pub fn with_target_strand(mut self, strand: Strand) -> Self {
        self.target_strand = Some(strand);
        self
    }

    pub fn with_has_cds(mut self, has_cds: bool) -> Self {
        self.has_cds = has_cds;
        self
    }

    pub fn with_max_gene_length(mut self, length: u64) -> Self {
        self.max_gene_length = Some(length);
        self
    }

    pub fn with_max_gene_num(mut self, num: usize) -> Self {
        self.max_gene_num = Some(num);
        self
    }

    pub fn with_min_gene_score(mut self, score: f64) -> Self {
        self.min_gene_score = Some(score);
        self
    }

    pub fn with_max_gene_score(mut self, score: f64) -> Self {
        self.max_gene_score = Some(score);
        self
    }

    pub fn with_min_average_splice_site_prob(mut self, prob: f64) -> Self {
        self.min_average_splice_site_prob = Some(prob);
        self
    }

    pub fn with_feature_num(mut self, num: usize) -> Self {
        self.feature_num = Some(num);
        self
    }

    fn seqid_matches(&self, seqid: &str) -> bool {
        self.seqid.as_deref().is_none_or(|s| s == seqid)
    }
}

/// Strand of a single-target `Target` attribute (`id start end [strand]`).
fn parse_target_strand(target: &str) -> Option<Strand> {
    let mut targets = target.split(',');
    let first = targets.next()?;
    if targets.next().is_some() {
        return None;
    }
    let strand = first.split_whitespace().nth(3)?;
    let mut chars = strand.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Strand::from_char(c),
        _ => None,
    }
}

/// Visitor that queues passing nodes for a downstream consumer.
///
/// Rejected nodes are dropped. Region nodes are clamped to the contain
/// range (or dropped if they do not overlap it). Comments always pass.
#[derive(Debug)]
pub struct FilterVisitor {
    config: FilterConfig,
    buffer: VecDeque<GenomeNode>,
    gene_num: usize,
    current_feature: usize,
}

impl FilterVisitor {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            buffer: VecDeque::new(),
            gene_num: 0,
            current_feature: 0,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Number of buffered nodes.
    pub fn node_buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Take the oldest buffered node.
    pub fn pop_node(&mut self) -> Option<GenomeNode> {
        self.buffer.pop_front()
    }

    /// Gene criteria; also counts the gene if it passes.
    fn gene_is_filtered(&mut self, feature: &FeatureNode) -> bool {
        let cfg = &self.config;
        let filtered = cfg
            .max_gene_length
            .is_some_and(|max| feature.range().length() > max)
            || cfg.max_gene_num.is_some_and(|max| self.gene_num >= max)
            || cfg
                .min_gene_score
                .is_some_and(|min| feature.score().is_none_or(|s| s < min))
            || cfg
                .max_gene_score
                .is_some_and(|max| feature.score().is_none_or(|s| s > max))
            || cfg
                .feature_num
                .is_some_and(|num| num != self.current_feature);
        if !filtered {
            self.gene_num += 1;
        }
        filtered
    }

    fn feature_is_filtered(&mut self, feature: &FeatureNode) -> bool {
        if !self.config.seqid_matches(feature.seqid()) {
            return true;
        }
        if feature.has_type(GENE) && self.gene_is_filtered(feature) {
            return true;
        }

        let cfg = &self.config;
        let range = feature.range();
        if cfg
            .feature_type
            .as_deref()
            .is_some_and(|t| !feature.has_type(t))
        {
            return true;
        }
        if cfg.contain_range.is_some_and(|c| !c.contains(&range)) {
            return true;
        }
        if cfg.overlap_range.is_some_and(|o| !o.overlaps(&range)) {
            return true;
        }
        if cfg.strand.is_some_and(|s| feature.strand() != s) {
            return true;
        }
        if let Some(wanted) = cfg.target_strand {
            let target = feature.get_attribute("Target").and_then(parse_target_strand);
            if target.is_some_and(|s| s != wanted) {
                return true;
            }
        }
        if cfg.has_cds && !feature.has_cds() {
            return true;
        }
        if let Some(min) = cfg.min_average_splice_site_prob {
            if feature.has_splice_site() && feature.average_splice_site_prob() < min {
                return true;
            }
        }
        false
    }
}

impl NodeVisitor for FilterVisitor {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        self.current_feature += 1;
        if !self.feature_is_filtered(feature) {
            self.buffer.push_back(GenomeNode::Feature(Arc::clone(feature)));
        }
        Ok(())
    }

    fn visit_region_node(&mut self, region: &Arc<RegionNode>) -> Result<()> {
        if !self.config.seqid_matches(region.seqid()) {
            return Ok(());
        }
        match self.config.contain_range {
            Some(contain) => {
                let range = region.range();
                if range.overlaps(&contain) {
                    let clamped = Range::new(
                        range.start().max(contain.start()),
                        range.end().min(contain.end()),
                    );
                    let mut region = Arc::clone(region);
                    if clamped != range {
                        Arc::make_mut(&mut region).set_range(clamped);
                    }
                    self.buffer.push_back(GenomeNode::Region(region));
                }
            }
            None => self.buffer.push_back(GenomeNode::Region(Arc::clone(region))),
        }
        Ok(())
    }

    fn visit_comment_node(&mut self, comment: &Arc<CommentNode>) -> Result<()> {
        self.buffer.push_back(GenomeNode::Comment(Arc::clone(comment)));
        Ok(())
    }

    fn visit_sequence_node(&mut self, sequence: &Arc<SequenceNode>) -> Result<()> {
        if self.config.seqid_matches(sequence.seqid()) {
            self.buffer
                .push_back(GenomeNode::Sequence(Arc::clone(sequence)));
        }
        Ok(())
    }
}
