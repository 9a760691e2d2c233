//! Consensus spliced alignment visitor.
//!
//! Consumes a sorted stream of spliced alignments (top-level features with
//! `exon` children) and replaces them with predicted genes. Alignments on
//! the same seqid are clustered while each starts at most `join_length`
//! bases after the end of the cluster so far. Every finished cluster is
//! split by strand and run through [`consensus_sa`](crate::consensus::consensus_sa);
//! the resulting splice forms become `mRNA` features grouped under `gene`
//! features. Non-feature nodes are passed through unchanged.

use crate::consensus::{consensus_splice_forms, splice_form_range};
use crate::error::Result;
use crate::node::{
    CommentNode, FeatureNode, GenomeNode, RegionNode, SequenceNode, Strand, EXON, GENE, MRNA,
};
use crate::range::Range;
use crate::visitor::NodeVisitor;
use log::debug;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default maximum distance between two alignments of one cluster.
pub const DEFAULT_JOIN_LENGTH: u64 = 300;

/// Source column of every generated feature.
pub const CSA_SOURCE: &str = "gfi csa";

const TARGET: &str = "Target";

pub struct CsaVisitor {
    join_length: u64,
    cluster: Vec<Arc<FeatureNode>>,
    /// Seqid and joined range of the current cluster.
    cluster_span: Option<(String, Range)>,
    buffer: VecDeque<GenomeNode>,
}

impl CsaVisitor {
    pub fn new() -> Self {
        Self {
            join_length: DEFAULT_JOIN_LENGTH,
            cluster: Vec::new(),
            cluster_span: None,
            buffer: VecDeque::new(),
        }
    }

    pub fn with_join_length(mut self, join_length: u64) -> Self {
        self.join_length = join_length;
        self
    }

    #[inline]
    pub fn join_length(&self) -> u64 {
        self.join_length
    }

    /// Number of finished nodes waiting to be popped.
    #[inline]
    pub fn node_buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn pop_node(&mut self) -> Option<GenomeNode> {
        self.buffer.pop_front()
    }

    /// Number of alignments in the unfinished cluster.
    #[inline]
    pub fn cluster_size(&self) -> usize {
        self.cluster.len()
    }

    /// Process the last cluster. Call once the input is exhausted.
    pub fn finish(&mut self) -> Result<()> {
        self.process_cluster()
    }

    fn process_cluster(&mut self) -> Result<()> {
        self.cluster_span = None;
        if self.cluster.is_empty() {
            return Ok(());
        }
        let cluster = std::mem::take(&mut self.cluster);
        debug!(
            "processing cluster of {} spliced alignments on {}",
            cluster.len(),
            cluster[0].seqid()
        );

        let mut strands: Vec<Strand> = Vec::new();
        for sa in &cluster {
            if !strands.contains(&sa.strand()) {
                strands.push(sa.strand());
            }
        }
        for strand in strands {
            let mut sas: Vec<&FeatureNode> = cluster
                .iter()
                .filter(|sa| sa.strand() == strand)
                .map(|sa| sa.as_ref())
                .collect();
            sas.sort_by_key(|sa| sa.range().start());

            let forms = consensus_splice_forms(&sas)?;
            for gene in build_genes(&sas, forms, strand) {
                self.buffer.push_back(gene.into());
            }
        }
        Ok(())
    }
}

impl Default for CsaVisitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Group splice forms whose ranges overlap into genes.
fn build_genes(sas: &[&FeatureNode], forms: Vec<Vec<usize>>, strand: Strand) -> Vec<FeatureNode> {
    let mut forms: Vec<(Range, Vec<usize>)> = forms
        .into_iter()
        .filter_map(|form| splice_form_range(sas, &form).map(|range| (range, form)))
        .collect();
    forms.sort_by_key(|(range, _)| *range);

    let mut genes: Vec<FeatureNode> = Vec::new();
    for (range, form) in forms {
        let mrna = build_mrna(sas, &form, range, strand);
        match genes.last_mut() {
            Some(gene) if gene.range().overlaps(&range) => {
                gene.set_range(gene.range().join(&range));
                gene.add_child(mrna);
            }
            _ => {
                let gene = FeatureNode::new(mrna.seqid(), GENE, range, strand)
                    .with_source(CSA_SOURCE)
                    .with_child(mrna);
                genes.push(gene);
            }
        }
    }
    genes
}

fn build_mrna(sas: &[&FeatureNode], form: &[usize], range: Range, strand: Strand) -> FeatureNode {
    let seqid = sas[form[0]].seqid();
    let mut mrna = FeatureNode::new(seqid, MRNA, range, strand).with_source(CSA_SOURCE);

    let targets: Vec<&str> = form
        .iter()
        .filter_map(|&i| sas[i].get_attribute(TARGET))
        .collect();
    if !targets.is_empty() {
        mrna.set_attribute(TARGET, targets.join(","));
    }

    let mut exons: Vec<FeatureNode> = Vec::new();
    for &i in form {
        add_sa_exons(&mut exons, sas[i], strand);
    }
    for exon in exons {
        mrna.add_child(exon);
    }
    mrna
}

/// Merge the exons of `sa` into the sorted, disjoint exon list.
///
/// Overlapping exons are widened. An exon takes over the score of an
/// alignment exon that extends it, or that matches it exactly with a higher
/// score.
fn add_sa_exons(exons: &mut Vec<FeatureNode>, sa: &FeatureNode, strand: Strand) {
    let mut sa_exons: Vec<&FeatureNode> = sa.iter().filter(|n| n.has_type(EXON)).collect();
    if sa_exons.is_empty() {
        sa_exons.push(sa);
    }
    sa_exons.sort_by_key(|e| e.range());

    let new_exon = |from: &FeatureNode| {
        let mut exon =
            FeatureNode::new(sa.seqid(), EXON, from.range(), strand).with_source(CSA_SOURCE);
        if let Some(score) = from.score() {
            exon.set_score(score);
        }
        exon
    };

    let (mut i, mut j) = (0, 0);
    while i < exons.len() && j < sa_exons.len() {
        let current = exons[i].range();
        let incoming = sa_exons[j].range();
        if !current.overlaps(&incoming) {
            if incoming.start() < current.start() {
                exons.insert(i, new_exon(sa_exons[j]));
                j += 1;
            }
            i += 1;
            continue;
        }
        if current == incoming {
            if let Some(score) = sa_exons[j].score() {
                if exons[i].score().map_or(true, |s| s < score) {
                    exons[i].set_score(score);
                }
            }
        } else if !current.contains(&incoming) {
            exons[i].set_range(current.join(&incoming));
            if incoming.end() > current.end() {
                if let Some(score) = sa_exons[j].score() {
                    exons[i].set_score(score);
                }
            }
        }
        i += 1;
        j += 1;
    }
    for &rest in &sa_exons[j..] {
        exons.push(new_exon(rest));
    }

    // widened exons can reach into their successor
    let mut merged: Vec<FeatureNode> = Vec::with_capacity(exons.len());
    for exon in exons.drain(..) {
        match merged.last_mut() {
            Some(prev) if prev.range().overlaps(&exon.range()) => {
                prev.set_range(prev.range().join(&exon.range()));
            }
            _ => merged.push(exon),
        }
    }
    *exons = merged;
}

impl NodeVisitor for CsaVisitor {
    fn visit_feature_node(&mut self, feature: &Arc<FeatureNode>) -> Result<()> {
        let range = feature.range();
        let joins = match &self.cluster_span {
            Some((seqid, span)) => {
                seqid == feature.seqid()
                    && span.end().saturating_add(self.join_length) >= range.start()
            }
            None => false,
        };
        if joins {
            if let Some((_, span)) = self.cluster_span.as_mut() {
                *span = span.join(&range);
            }
        } else {
            self.process_cluster()?;
            self.cluster_span = Some((feature.seqid().to_string(), range));
        }
        self.cluster.push(Arc::clone(feature));
        Ok(())
    }

    fn visit_region_node(&mut self, region: &Arc<RegionNode>) -> Result<()> {
        self.buffer.push_back(GenomeNode::Region(Arc::clone(region)));
        Ok(())
    }

    fn visit_comment_node(&mut self, comment: &Arc<CommentNode>) -> Result<()> {
        self.buffer.push_back(GenomeNode::Comment(Arc::clone(comment)));
        Ok(())
    }

    fn visit_sequence_node(&mut self, sequence: &Arc<SequenceNode>) -> Result<()> {
        self.buffer.push_back(GenomeNode::Sequence(Arc::clone(sequence)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(seqid: &str, strand: Strand, exons: &[(u64, u64)], target: &str) -> FeatureNode {
        let range = Range::new(exons[0].0, exons[exons.len() - 1].1);
        exons.iter().fold(
            FeatureNode::new(seqid, "cDNA_match", range, strand).with_attribute(TARGET, target),
            |sa, &(s, e)| sa.with_child(FeatureNode::new(seqid, EXON, Range::new(s, e), strand)),
        )
    }

    fn run(visitor: &mut CsaVisitor, nodes: Vec<FeatureNode>) -> Vec<GenomeNode> {
        for node in nodes {
            let node: GenomeNode = node.into();
            node.accept(visitor).unwrap();
        }
        visitor.finish().unwrap();
        std::iter::from_fn(|| visitor.pop_node()).collect()
    }

    fn features(nodes: &[GenomeNode]) -> Vec<Arc<FeatureNode>> {
        nodes.iter().filter_map(|n| n.as_feature().cloned()).collect()
    }

    #[test]
    fn test_standard_gene_alignments() {
        let sas = vec![
            alignment("ctg123", Strand::Forward, &[(1050, 1500), (3000, 3902), (5000, 5500), (7000, 9000)], "t1"),
            alignment("ctg123", Strand::Forward, &[(1050, 1500), (5000, 5500), (7000, 9000)], "t2"),
            alignment("ctg123", Strand::Forward, &[(1300, 1500), (3000, 3902), (5000, 5500), (7000, 9000)], "t3"),
        ];
        let out = run(&mut CsaVisitor::new(), sas);
        let genes = features(&out);
        assert_eq!(genes.len(), 1);

        let gene = &genes[0];
        assert_eq!(gene.feature_type(), GENE);
        assert_eq!(gene.source(), CSA_SOURCE);
        assert_eq!(gene.range(), Range::new(1050, 9000));
        assert_eq!(gene.number_of_children(), 2);

        let first = &gene.children()[0];
        assert_eq!(first.feature_type(), MRNA);
        assert_eq!(first.get_attribute(TARGET), Some("t1,t3"));
        assert_eq!(
            first.exons(),
            vec![
                Range::new(1050, 1500),
                Range::new(3000, 3902),
                Range::new(5000, 5500),
                Range::new(7000, 9000)
            ]
        );
        let second = &gene.children()[1];
        assert_eq!(second.get_attribute(TARGET), Some("t2"));
        assert_eq!(second.exons().len(), 3);
        assert!(second.direct_children_do_not_overlap());
    }

    #[test]
    fn test_clusters_split_by_distance_and_seqid() {
        let sas = vec![
            alignment("s1", Strand::Forward, &[(100, 200)], "a"),
            alignment("s1", Strand::Forward, &[(450, 500)], "b"),
            alignment("s1", Strand::Forward, &[(2000, 2100)], "c"),
            alignment("s2", Strand::Forward, &[(2000, 2100)], "d"),
        ];
        let mut visitor = CsaVisitor::new().with_join_length(300);
        let genes = features(&run(&mut visitor, sas));
        let spans: Vec<(String, Range)> = genes
            .iter()
            .map(|g| (g.seqid().to_string(), g.range()))
            .collect();
        // a and b share a cluster but are not compatible, so they form two genes
        assert_eq!(
            spans,
            vec![
                ("s1".to_string(), Range::new(100, 200)),
                ("s1".to_string(), Range::new(450, 500)),
                ("s1".to_string(), Range::new(2000, 2100)),
                ("s2".to_string(), Range::new(2000, 2100)),
            ]
        );
    }

    #[test]
    fn test_strands_produce_separate_genes() {
        let sas = vec![
            alignment("s", Strand::Forward, &[(100, 200), (300, 400)], "f"),
            alignment("s", Strand::Reverse, &[(120, 200), (300, 380)], "r"),
        ];
        let genes = features(&run(&mut CsaVisitor::new(), sas));
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[0].strand(), Strand::Forward);
        assert_eq!(genes[1].strand(), Strand::Reverse);
        assert!(genes.iter().all(|g| g.children()[0].strand() == g.strand()));
    }

    #[test]
    fn test_exon_scores_and_widening() {
        let mut a = alignment("s", Strand::Forward, &[(100, 200), (300, 400)], "a");
        let mut b = alignment("s", Strand::Forward, &[(150, 200), (300, 450)], "b");
        a.children_mut()[1].set_score(0.5);
        b.children_mut()[1].set_score(0.9);
        let genes = features(&run(&mut CsaVisitor::new(), vec![a, b]));
        assert_eq!(genes.len(), 1);
        let mrna = &genes[0].children()[0];
        assert_eq!(mrna.range(), Range::new(100, 450));
        let exons = mrna.children();
        assert_eq!(exons.len(), 2);
        assert_eq!(exons[0].range(), Range::new(100, 200));
        assert_eq!(exons[1].range(), Range::new(300, 450));
        assert_eq!(exons[1].score(), Some(0.9));
    }

    #[test]
    fn test_non_features_pass_through() {
        let mut visitor = CsaVisitor::new();
        let region: GenomeNode = RegionNode::new("s", Range::new(1, 1000)).into();
        let comment: GenomeNode = CommentNode::new("note").into();
        region.accept(&mut visitor).unwrap();
        comment.accept(&mut visitor).unwrap();
        assert_eq!(visitor.node_buffer_size(), 2);
        assert!(visitor.pop_node().unwrap().ptr_eq(&region));
        assert!(visitor.pop_node().unwrap().ptr_eq(&comment));
        visitor.finish().unwrap();
        assert!(visitor.pop_node().is_none());
    }

    #[test]
    fn test_cluster_is_held_until_broken() {
        let mut visitor = CsaVisitor::new();
        let first: GenomeNode = alignment("s", Strand::Forward, &[(100, 200)], "a").into();
        first.accept(&mut visitor).unwrap();
        assert_eq!(visitor.cluster_size(), 1);
        assert_eq!(visitor.node_buffer_size(), 0);

        let far: GenomeNode = alignment("s", Strand::Forward, &[(5000, 5100)], "b").into();
        far.accept(&mut visitor).unwrap();
        assert_eq!(visitor.node_buffer_size(), 1);
        assert_eq!(visitor.cluster_size(), 1);
    }
}
