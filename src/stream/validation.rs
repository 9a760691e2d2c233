//! Sort validation for node streams.
//!
//! Merging requires every input to be sorted by
//! [`GenomeNode::compare`]. [`NodeSortValidator`] checks this inline, one
//! node at a time, so an input does not have to be read twice.
//!
//! Comments and EOF markers carry no position and are not checked.

use crate::error::{GfiError, Result};
use crate::node::GenomeNode;
use std::cmp::Ordering;

/// Inline sort validator for use within stream stages.
#[derive(Debug, Default)]
pub struct NodeSortValidator {
    prev: Option<GenomeNode>,
    node_count: usize,
}

impl NodeSortValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positioned nodes validated so far.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Validate that `node` does not sort before the previous node.
    #[inline]
    pub fn validate(&mut self, node: &GenomeNode) -> Result<()> {
        self.check(node, None)
    }

    /// Like [`validate`](Self::validate), naming the input in the error.
    #[inline]
    pub fn validate_with_input(&mut self, node: &GenomeNode, input: usize) -> Result<()> {
        self.check(node, Some(input))
    }

    fn check(&mut self, node: &GenomeNode, input: Option<usize>) -> Result<()> {
        if matches!(node, GenomeNode::Comment(_) | GenomeNode::Eof) {
            return Ok(());
        }
        self.node_count += 1;

        if let Some(prev) = &self.prev {
            if node.compare(prev) == Ordering::Less {
                let location = match input {
                    Some(i) => format!("input {} node {}", i, self.node_count),
                    None => format!("node {}", self.node_count),
                };
                return Err(GfiError::NotSorted(format!(
                    "{} ({} {}) comes after {} {}",
                    location,
                    node.seqid(),
                    node.range(),
                    prev.seqid(),
                    prev.range()
                )));
            }
        }

        self.prev = Some(node.clone());
        Ok(())
    }
}
