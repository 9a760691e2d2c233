//! Streams backed by in-memory node vectors.

use crate::error::Result;
use crate::node::{nodes_are_sorted, GenomeNode};
use crate::stream::NodeStream;
use std::collections::VecDeque;

/// Replays a vector of nodes.
pub struct ArrayInStream {
    nodes: VecDeque<GenomeNode>,
    sorted: bool,
}

impl ArrayInStream {
    pub fn new(nodes: Vec<GenomeNode>) -> Self {
        let sorted = nodes_are_sorted(&nodes);
        Self {
            nodes: nodes.into(),
            sorted,
        }
    }

    /// Number of nodes not yet handed out.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.nodes.len()
    }
}

impl NodeStream for ArrayInStream {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        Ok(self.nodes.pop_front())
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }
}

/// Pass-through stage that keeps a handle to every node it forwards.
pub struct ArrayOutStream<S> {
    upstream: S,
    nodes: Vec<GenomeNode>,
}

impl<S: NodeStream> ArrayOutStream<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            nodes: Vec::new(),
        }
    }

    /// Nodes forwarded so far.
    pub fn nodes(&self) -> &[GenomeNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<GenomeNode> {
        self.nodes
    }
}

impl<S: NodeStream> NodeStream for ArrayOutStream<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        let node = self.upstream.next()?;
        if let Some(node) = &node {
            self.nodes.push(node.clone());
        }
        Ok(node)
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureNode, RegionNode, Strand};
    use crate::range::Range;
    use crate::stream::drain;

    fn nodes() -> Vec<GenomeNode> {
        vec![
            RegionNode::new("s", Range::new(1, 1000)).into(),
            FeatureNode::new("s", "gene", Range::new(10, 20), Strand::Forward).into(),
            FeatureNode::new("s", "gene", Range::new(30, 40), Strand::Forward).into(),
        ]
    }

    #[test]
    fn test_array_in_replays_in_order() {
        let input = nodes();
        let mut stream = ArrayInStream::new(input.clone());
        assert!(stream.is_sorted());
        for expected in &input {
            assert!(stream.next().unwrap().unwrap().ptr_eq(expected));
        }
        assert!(stream.next().unwrap().is_none());
        assert!(stream.next().unwrap().is_none());
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn test_array_in_detects_unsorted() {
        let mut input = nodes();
        input.reverse();
        assert!(!ArrayInStream::new(input).is_sorted());
    }

    #[test]
    fn test_array_out_records_shared_nodes() {
        let input = nodes();
        let mut out = ArrayOutStream::new(ArrayInStream::new(input.clone()));
        let forwarded = drain(&mut out).unwrap();
        assert_eq!(forwarded.len(), 3);
        let recorded = out.into_nodes();
        assert!(recorded.iter().zip(&input).all(|(a, b)| a.ptr_eq(b)));
    }
}
