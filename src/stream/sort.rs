//! Sorting stage for unsorted producers.

use crate::error::Result;
use crate::node::{sort_nodes, GenomeNode};
use crate::stream::{consolidate_regions, NodeStream};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Reads its whole upstream on the first call and replays it sorted.
///
/// Region nodes declaring the same seqid are folded into the first one,
/// which then covers the union of their ranges. EOF markers are dropped.
/// An upstream error is returned once and the stream then ends.
pub struct SortStream<S> {
    upstream: S,
    sorted: Option<VecDeque<GenomeNode>>,
}

impl<S: NodeStream> SortStream<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            sorted: None,
        }
    }

    fn fill(&mut self) -> Result<VecDeque<GenomeNode>> {
        let mut nodes: Vec<GenomeNode> = Vec::new();
        let mut regions: FxHashMap<String, usize> = FxHashMap::default();
        while let Some(node) = self.upstream.next()? {
            if node.is_eof() {
                continue;
            }
            if let GenomeNode::Region(region) = &node {
                if let Some(&i) = regions.get(region.seqid()) {
                    consolidate_regions(&mut nodes[i], &node);
                    continue;
                }
                regions.insert(region.seqid().to_string(), nodes.len());
            }
            nodes.push(node);
        }
        sort_nodes(&mut nodes);
        Ok(nodes.into())
    }
}

impl<S: NodeStream> NodeStream for SortStream<S> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        if self.sorted.is_none() {
            match self.fill() {
                Ok(nodes) => self.sorted = Some(nodes),
                Err(e) => {
                    self.sorted = Some(VecDeque::new());
                    return Err(e);
                }
            }
        }
        Ok(self.sorted.as_mut().and_then(|nodes| nodes.pop_front()))
    }

    fn is_sorted(&self) -> bool {
        true
    }
}
