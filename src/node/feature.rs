//! Feature nodes: typed genomic features owning a tree of sub-features.

use crate::error::Result;
use crate::node::Origin;
use crate::range::Range;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;

pub const GENE: &str = "gene";
pub const MRNA: &str = "mRNA";
pub const EXON: &str = "exon";
pub const CDS: &str = "CDS";
pub const TF_BINDING_SITE: &str = "TF_binding_site";
pub const FIVE_PRIME_SPLICE_SITE: &str = "five_prime_splice_site";
pub const THREE_PRIME_SPLICE_SITE: &str = "three_prime_splice_site";

/// Strand orientation of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    Forward,
    Reverse,
    /// Feature is not stranded (`.` in GFF3).
    Both,
    /// Feature is stranded, but the strand is not known (`?` in GFF3).
    #[default]
    Unknown,
}

impl Strand {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            '.' => Some(Strand::Both),
            '?' => Some(Strand::Unknown),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Both => '.',
            Strand::Unknown => '?',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Reading frame phase of a CDS feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    Zero,
    One,
    Two,
    #[default]
    Undefined,
}

impl Phase {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Phase::Zero),
            '1' => Some(Phase::One),
            '2' => Some(Phase::Two),
            '.' => Some(Phase::Undefined),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Phase::Zero => '0',
            Phase::One => '1',
            Phase::Two => '2',
            Phase::Undefined => '.',
        }
    }
}

/// A genomic feature such as a gene, mRNA or exon.
///
/// A feature exclusively owns its children, so a feature tree has no
/// back-pointers and is dropped with its root. Sharing happens
/// one level up, by wrapping the root in an `Arc` inside a `GenomeNode`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureNode {
    seqid: String,
    source: Option<String>,
    feature_type: String,
    range: Range,
    strand: Strand,
    phase: Phase,
    score: Option<f64>,
    attributes: IndexMap<String, String>,
    children: Vec<FeatureNode>,
    origin: Origin,
}

impl FeatureNode {
    /// Create a feature without source, score, attributes or children.
    pub fn new(
        seqid: impl Into<String>,
        feature_type: impl Into<String>,
        range: Range,
        strand: Strand,
    ) -> Self {
        Self {
            seqid: seqid.into(),
            source: None,
            feature_type: feature_type.into(),
            range,
            strand,
            phase: Phase::Undefined,
            score: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
            origin: Origin::default(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_child(mut self, child: FeatureNode) -> Self {
        self.add_child(child);
        self
    }

    #[inline]
    pub fn seqid(&self) -> &str {
        &self.seqid
    }

    /// Feature source, `"."` if unset.
    #[inline]
    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(".")
    }

    #[inline]
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    #[inline]
    pub fn has_type(&self, feature_type: &str) -> bool {
        self.feature_type == feature_type
    }

    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    #[inline]
    pub fn strand(&self) -> Strand {
        self.strand
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }

    pub fn set_strand(&mut self, strand: Strand) {
        self.strand = strand;
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    pub fn unset_score(&mut self) {
        self.score = None;
    }

    #[inline]
    pub fn children(&self) -> &[FeatureNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<FeatureNode> {
        &mut self.children
    }

    pub fn add_child(&mut self, child: FeatureNode) {
        debug_assert_eq!(self.seqid, child.seqid);
        self.children.push(child);
    }

    /// Number of direct children.
    #[inline]
    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    /// Depth-first pre-order iterator over this feature and all descendants.
    pub fn iter(&self) -> FeatureNodeIter<'_> {
        FeatureNodeIter { stack: vec![self] }
    }

    /// Visit this feature and all descendants depth-first (pre-order).
    ///
    /// The first error returned by `f` stops the traversal.
    pub fn traverse_depth_first<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&FeatureNode) -> Result<()>,
    {
        for node in self.iter() {
            f(node)?;
        }
        Ok(())
    }

    /// Visit this feature and all descendants level by level.
    pub fn traverse_breadth_first<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&FeatureNode) -> Result<()>,
    {
        let mut queue: VecDeque<&FeatureNode> = VecDeque::new();
        queue.push_back(self);
        while let Some(node) = queue.pop_front() {
            f(node)?;
            queue.extend(node.children.iter());
        }
        Ok(())
    }

    /// Ranges of all descendant exons, sorted.
    pub fn exons(&self) -> Vec<Range> {
        let mut exons: Vec<Range> = self
            .iter()
            .filter(|n| n.has_type(EXON))
            .map(|n| n.range)
            .collect();
        exons.sort_unstable();
        exons
    }

    /// Check if this feature or a descendant is a CDS.
    pub fn has_cds(&self) -> bool {
        self.iter().any(|n| n.has_type(CDS))
    }

    pub fn has_splice_site(&self) -> bool {
        self.iter().any(|n| n.is_splice_site())
    }

    /// Mean score of all splice site features in the tree, 0 if there are none.
    pub fn average_splice_site_prob(&self) -> f64 {
        let (sum, count) = self
            .iter()
            .filter(|n| n.is_splice_site())
            .fold((0.0, 0usize), |(sum, count), n| {
                (sum + n.score.unwrap_or(0.0), count + 1)
            });
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn is_splice_site(&self) -> bool {
        self.has_type(FIVE_PRIME_SPLICE_SITE) || self.has_type(THREE_PRIME_SPLICE_SITE)
    }

    /// Same seqid, type, range, strand and phase.
    pub fn is_similar(&self, other: &FeatureNode) -> bool {
        self.seqid == other.seqid
            && self.feature_type == other.feature_type
            && self.range == other.range
            && self.strand == other.strand
            && self.phase == other.phase
    }

    /// Check if the direct children, taken in start order, are pairwise disjoint.
    pub fn direct_children_do_not_overlap(&self) -> bool {
        let mut ranges: Vec<Range> = self.children.iter().map(|c| c.range).collect();
        ranges.sort_unstable();
        crate::range::ranges_do_not_overlap(&ranges)
    }

    /// The canonical example gene on `ctg123` used throughout the tests:
    /// a TF binding site plus three alternatively spliced mRNAs.
    pub fn standard_gene() -> FeatureNode {
        let seqid = "ctg123";
        let feature = |t: &str, start, end| {
            FeatureNode::new(seqid, t, Range::new(start, end), Strand::Forward)
        };
        let mrna = |start, exons: &[(u64, u64)]| {
            exons.iter().fold(feature(MRNA, start, 9000), |m, &(s, e)| {
                m.with_child(feature(EXON, s, e))
            })
        };

        feature(GENE, 1000, 9000)
            .with_child(feature(TF_BINDING_SITE, 1000, 1012))
            .with_child(mrna(
                1050,
                &[(1050, 1500), (3000, 3902), (5000, 5500), (7000, 9000)],
            ))
            .with_child(mrna(1050, &[(1050, 1500), (5000, 5500), (7000, 9000)]))
            .with_child(mrna(
                1300,
                &[(1300, 1500), (3000, 3902), (5000, 5500), (7000, 9000)],
            ))
    }
}

impl Drop for FeatureNode {
    // Flatten the tree first so deep Parent chains do not recurse.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Depth-first iterator over a feature tree.
pub struct FeatureNodeIter<'a> {
    stack: Vec<&'a FeatureNode>,
}

impl<'a> Iterator for FeatureNodeIter<'a> {
    type Item = &'a FeatureNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GfiError;

    #[test]
    fn test_standard_gene_shape() {
        let gene = FeatureNode::standard_gene();
        assert_eq!(gene.range(), Range::new(1000, 9000));
        assert_eq!(gene.number_of_children(), 4);
        assert_eq!(gene.iter().count(), 1 + 1 + 3 + 11);
        assert_eq!(gene.iter().filter(|n| n.has_type(MRNA)).count(), 3);
        assert!(!gene.has_cds());
    }

    #[test]
    fn test_depth_first_order() {
        let gene = FeatureNode::standard_gene();
        let mut types = Vec::new();
        gene.traverse_depth_first(|n| {
            types.push(n.feature_type().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(&types[..4], &[GENE, TF_BINDING_SITE, MRNA, EXON]);
    }

    #[test]
    fn test_breadth_first_order() {
        let gene = FeatureNode::standard_gene();
        let mut types = Vec::new();
        gene.traverse_breadth_first(|n| {
            types.push(n.feature_type().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(&types[..5], &[GENE, TF_BINDING_SITE, MRNA, MRNA, MRNA]);
    }

    #[test]
    fn test_traversal_stops_on_error() {
        let gene = FeatureNode::standard_gene();
        let mut visited = 0;
        let result = gene.traverse_depth_first(|n| {
            visited += 1;
            if n.has_type(MRNA) {
                return Err(GfiError::upstream("stop"));
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_exons_are_sorted() {
        let mrna = FeatureNode::new("s", MRNA, Range::new(1, 100), Strand::Forward)
            .with_child(FeatureNode::new("s", EXON, Range::new(60, 100), Strand::Forward))
            .with_child(FeatureNode::new("s", EXON, Range::new(1, 20), Strand::Forward));
        assert_eq!(mrna.exons(), vec![Range::new(1, 20), Range::new(60, 100)]);
        assert!(mrna.direct_children_do_not_overlap());
    }

    #[test]
    fn test_attributes_keep_order() {
        let mut f = FeatureNode::new("s", GENE, Range::new(1, 10), Strand::Both)
            .with_attribute("ID", "g1")
            .with_attribute("Name", "abc");
        f.set_attribute("ID", "g2");
        let keys: Vec<&str> = f.attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ID", "Name"]);
        assert_eq!(f.get_attribute("ID"), Some("g2"));
        assert_eq!(f.remove_attribute("ID").as_deref(), Some("g2"));
        assert_eq!(f.get_attribute("ID"), None);
    }

    #[test]
    fn test_splice_site_average() {
        let f = FeatureNode::new("s", MRNA, Range::new(1, 100), Strand::Forward)
            .with_child(
                FeatureNode::new("s", FIVE_PRIME_SPLICE_SITE, Range::new(10, 11), Strand::Forward)
                    .with_score(0.5),
            )
            .with_child(
                FeatureNode::new("s", THREE_PRIME_SPLICE_SITE, Range::new(50, 51), Strand::Forward)
                    .with_score(1.0),
            );
        assert!(f.has_splice_site());
        assert!((f.average_splice_site_prob() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_is_similar() {
        let a = FeatureNode::new("s", EXON, Range::new(1, 10), Strand::Forward);
        let b = a.clone().with_attribute("ID", "x");
        assert!(a.is_similar(&b));
        let c = FeatureNode::new("s", EXON, Range::new(1, 10), Strand::Reverse);
        assert!(!a.is_similar(&c));
    }

    #[test]
    fn test_strand_chars() {
        for c in ['+', '-', '.', '?'] {
            assert_eq!(Strand::from_char(c).unwrap().as_char(), c);
        }
        assert_eq!(Strand::from_char('x'), None);
        assert_eq!(Phase::from_char('2'), Some(Phase::Two));
    }
}
