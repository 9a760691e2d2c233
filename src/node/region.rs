//! Region, comment and sequence nodes.

use crate::node::Origin;
use crate::range::Range;

/// Declares the bounds of a sequence region (`##sequence-region`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNode {
    seqid: String,
    range: Range,
    origin: Origin,
}

impl RegionNode {
    pub fn new(seqid: impl Into<String>, range: Range) -> Self {
        Self {
            seqid: seqid.into(),
            range,
            origin: Origin::default(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    pub fn seqid(&self) -> &str {
        &self.seqid
    }

    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Replace the region bounds. The seqid never changes.
    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }
}

/// A free-text comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    comment: String,
    origin: Origin,
}

impl CommentNode {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            origin: Origin::default(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// A named sequence, as found in the `##FASTA` section of a GFF3 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNode {
    seqid: String,
    description: String,
    sequence: String,
    origin: Origin,
}

impl SequenceNode {
    pub fn new(
        seqid: impl Into<String>,
        description: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            seqid: seqid.into(),
            description: description.into(),
            sequence: sequence.into(),
            origin: Origin::default(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    pub fn seqid(&self) -> &str {
        &self.seqid
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// `1..=len`, or `0..=0` for an empty sequence.
    pub fn range(&self) -> Range {
        match self.sequence.len() as u64 {
            0 => Range::new(0, 0),
            len => Range::new(1, len),
        }
    }
}
