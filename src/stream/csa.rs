//! Consensus spliced alignment stage.

use crate::error::Result;
use crate::node::GenomeNode;
use crate::stream::NodeStream;
use crate::visitor::CsaVisitor;

/// Replaces sorted spliced alignments with consensus genes.
///
/// See [`CsaVisitor`] for how alignments are clustered and merged. The
/// last cluster is processed once the upstream is exhausted.
pub struct CsaStream<S> {
    upstream: S,
    visitor: CsaVisitor,
    finished: bool,
}

impl<S: NodeStream> CsaStream<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            visitor: CsaVisitor::new(),
            finished: false,
        }
    }

    pub fn with_join_length(mut self, join_length: u64) -> Self {
        self.visitor = CsaVisitor::new().with_join_length(join_length);
        self
    }

    pub fn join_length(&self) -> u64 {
        self.visitor.join_length()
    }
}

impl<S: NodeStream> NodeStream for CsaStream<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        loop {
            if let Some(node) = self.visitor.pop_node() {
                return Ok(Some(node));
            }
            if self.finished {
                return Ok(None);
            }
            match self.upstream.next()? {
                Some(node) => node.accept(&mut self.visitor)?,
                None => {
                    self.visitor.finish()?;
                    self.finished = true;
                }
            }
        }
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureNode, RegionNode, Strand, EXON, GENE};
    use crate::range::Range;
    use crate::stream::{drain, ArrayInStream};

    fn est(start: u64, exons: &[(u64, u64)]) -> GenomeNode {
        let end = exons[exons.len() - 1].1;
        exons
            .iter()
            .fold(
                FeatureNode::new("ctg1", "EST_match", Range::new(start, end), Strand::Forward),
                |sa, &(s, e)| {
                    sa.with_child(FeatureNode::new("ctg1", EXON, Range::new(s, e), Strand::Forward))
                },
            )
            .into()
    }

    #[test]
    fn test_csa_stream_emits_genes() {
        let input = vec![
            RegionNode::new("ctg1", Range::new(1, 10_000)).into(),
            est(100, &[(100, 200), (300, 400)]),
            est(150, &[(150, 200), (300, 420)]),
            est(5000, &[(5000, 5100)]),
        ];
        let mut stream = CsaStream::new(ArrayInStream::new(input)).with_join_length(100);
        assert_eq!(stream.join_length(), 100);
        let out = drain(&mut stream).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].as_region().is_some());
        let genes: Vec<_> = out.iter().filter_map(|n| n.as_feature()).collect();
        assert!(genes.iter().all(|g| g.has_type(GENE)));
        assert_eq!(genes[0].range(), Range::new(100, 420));
        assert_eq!(genes[1].range(), Range::new(5000, 5100));
        assert!(stream.next().unwrap().is_none());
    }
}
