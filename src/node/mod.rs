//! The genome node graph.
//!
//! A [`GenomeNode`] is one item flowing through a node stream: a region
//! declaration, a feature tree, a comment, a sequence, or the end-of-file
//! sentinel. Variants are reference counted with `Arc`, so cloning a node
//! is cheap and the same node can sit in several streams and indices at
//! once. The node is dropped when the last handle goes away.
//!
//! Nodes are ordered by [`GenomeNode::compare`]: region nodes first,
//! sequence nodes last, then by seqid and finally by range.

mod feature;
mod region;

pub use feature::{
    FeatureNode, FeatureNodeIter, Phase, Strand, CDS, EXON, FIVE_PRIME_SPLICE_SITE, GENE, MRNA,
    TF_BINDING_SITE, THREE_PRIME_SPLICE_SITE,
};
pub use region::{CommentNode, RegionNode, SequenceNode};

use crate::error::Result;
use crate::range::Range;
use crate::visitor::NodeVisitor;
use std::cmp::Ordering;
use std::sync::Arc;

/// Where a node was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub filename: String,
    pub line_number: u32,
}

impl Origin {
    pub fn new(filename: impl Into<String>, line_number: u32) -> Self {
        Self {
            filename: filename.into(),
            line_number,
        }
    }
}

impl Default for Origin {
    /// Nodes built through the API are "generated" at line 0.
    fn default() -> Self {
        Self::new("generated", 0)
    }
}

/// A shared handle to any node that can flow through a node stream.
#[derive(Debug, Clone)]
pub enum GenomeNode {
    Region(Arc<RegionNode>),
    Feature(Arc<FeatureNode>),
    Comment(Arc<CommentNode>),
    Sequence(Arc<SequenceNode>),
    /// End-of-file marker. Carries no data and is skipped by merging stages.
    Eof,
}

impl GenomeNode {
    /// Seqid of the node; empty for comments and EOF markers.
    pub fn seqid(&self) -> &str {
        match self {
            GenomeNode::Region(r) => r.seqid(),
            GenomeNode::Feature(f) => f.seqid(),
            GenomeNode::Sequence(s) => s.seqid(),
            GenomeNode::Comment(_) | GenomeNode::Eof => "",
        }
    }

    /// Range of the node; `0..=0` for comments and EOF markers.
    pub fn range(&self) -> Range {
        match self {
            GenomeNode::Region(r) => r.range(),
            GenomeNode::Feature(f) => f.range(),
            GenomeNode::Sequence(s) => s.range(),
            GenomeNode::Comment(_) | GenomeNode::Eof => Range::new(0, 0),
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            GenomeNode::Region(r) => Some(r.origin()),
            GenomeNode::Feature(f) => Some(f.origin()),
            GenomeNode::Comment(c) => Some(c.origin()),
            GenomeNode::Sequence(s) => Some(s.origin()),
            GenomeNode::Eof => None,
        }
    }

    /// Double dispatch: call the visitor method matching this variant.
    pub fn accept(&self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        match self {
            GenomeNode::Region(r) => visitor.visit_region_node(r),
            GenomeNode::Feature(f) => visitor.visit_feature_node(f),
            GenomeNode::Comment(c) => visitor.visit_comment_node(c),
            GenomeNode::Sequence(s) => visitor.visit_sequence_node(s),
            GenomeNode::Eof => visitor.visit_eof_node(),
        }
    }

    /// Ordering used by every sorted stream stage.
    pub fn compare(&self, other: &GenomeNode) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.seqid().cmp(other.seqid()))
            .then_with(|| self.range().cmp(&other.range()))
    }

    /// Like [`GenomeNode::compare`], with ranges compared up to `delta`.
    pub fn compare_with_delta(&self, other: &GenomeNode, delta: u64) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.seqid().cmp(other.seqid()))
            .then_with(|| self.range().compare_with_delta(&other.range(), delta))
    }

    #[inline]
    fn type_rank(&self) -> u8 {
        match self {
            GenomeNode::Region(_) => 0,
            GenomeNode::Feature(_) | GenomeNode::Comment(_) => 1,
            GenomeNode::Sequence(_) => 2,
            GenomeNode::Eof => 3,
        }
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, GenomeNode::Eof)
    }

    pub fn as_feature(&self) -> Option<&Arc<FeatureNode>> {
        match self {
            GenomeNode::Feature(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<&Arc<RegionNode>> {
        match self {
            GenomeNode::Region(r) => Some(r),
            _ => None,
        }
    }

    /// Check if both handles point at the same node.
    pub fn ptr_eq(&self, other: &GenomeNode) -> bool {
        match (self, other) {
            (GenomeNode::Region(a), GenomeNode::Region(b)) => Arc::ptr_eq(a, b),
            (GenomeNode::Feature(a), GenomeNode::Feature(b)) => Arc::ptr_eq(a, b),
            (GenomeNode::Comment(a), GenomeNode::Comment(b)) => Arc::ptr_eq(a, b),
            (GenomeNode::Sequence(a), GenomeNode::Sequence(b)) => Arc::ptr_eq(a, b),
            (GenomeNode::Eof, GenomeNode::Eof) => true,
            _ => false,
        }
    }
}

impl From<FeatureNode> for GenomeNode {
    fn from(f: FeatureNode) -> Self {
        GenomeNode::Feature(Arc::new(f))
    }
}

impl From<RegionNode> for GenomeNode {
    fn from(r: RegionNode) -> Self {
        GenomeNode::Region(Arc::new(r))
    }
}

impl From<CommentNode> for GenomeNode {
    fn from(c: CommentNode) -> Self {
        GenomeNode::Comment(Arc::new(c))
    }
}

impl From<SequenceNode> for GenomeNode {
    fn from(s: SequenceNode) -> Self {
        GenomeNode::Sequence(Arc::new(s))
    }
}

/// Check if `nodes` is sorted according to [`GenomeNode::compare`].
pub fn nodes_are_sorted(nodes: &[GenomeNode]) -> bool {
    nodes
        .windows(2)
        .all(|w| w[0].compare(&w[1]) != Ordering::Greater)
}

/// Stable sort by [`GenomeNode::compare`].
pub fn sort_nodes(nodes: &mut [GenomeNode]) {
    nodes.sort_by(|a, b| a.compare(b));
}

/// Check if both nodes are region nodes with the same seqid.
pub fn nodes_are_equal_regions(a: &GenomeNode, b: &GenomeNode) -> bool {
    match (a, b) {
        (GenomeNode::Region(a), GenomeNode::Region(b)) => a.seqid() == b.seqid(),
        _ => false,
    }
}
