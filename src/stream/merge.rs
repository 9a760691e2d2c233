//! K-way merge of individually sorted node streams.

use crate::config;
use crate::error::Result;
use crate::node::GenomeNode;
use crate::stream::validation::NodeSortValidator;
use crate::stream::{consolidate_regions, NodeStream};
use log::debug;
use std::cmp::Ordering;

/// Merges sorted inputs into one sorted stream.
///
/// Each input must be sorted by [`GenomeNode::compare`]. The merge keeps
/// one lookahead node per input and always hands out the smallest one.
/// Region nodes that declare the same seqid in several inputs are folded
/// into one node covering the union of their ranges. EOF markers are
/// dropped.
///
/// When [`config::verify_sorted_input`] is enabled at construction time,
/// every input is checked while it is read and an unsorted input fails
/// with `NotSorted`.
pub struct MergeStream<'a> {
    inputs: Vec<Box<dyn NodeStream + 'a>>,
    buffer: Vec<Option<GenomeNode>>,
    done: Vec<bool>,
    validators: Option<Vec<NodeSortValidator>>,
}

impl<'a> MergeStream<'a> {
    pub fn new(inputs: Vec<Box<dyn NodeStream + 'a>>) -> Self {
        let n = inputs.len();
        let validators = config::verify_sorted_input()
            .then(|| (0..n).map(|_| NodeSortValidator::new()).collect());
        Self {
            inputs,
            buffer: vec![None; n],
            done: vec![false; n],
            validators,
        }
    }

    /// Number of merged inputs.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Pull into every empty slot whose input is not exhausted.
    fn fill_buffers(&mut self) -> Result<()> {
        for i in 0..self.inputs.len() {
            if self.buffer[i].is_some() || self.done[i] {
                continue;
            }
            loop {
                match self.inputs[i].next()? {
                    Some(GenomeNode::Eof) => continue,
                    Some(node) => {
                        if let Some(validators) = self.validators.as_mut() {
                            validators[i].validate_with_input(&node, i)?;
                        }
                        self.buffer[i] = Some(node);
                    }
                    None => self.done[i] = true,
                }
                break;
            }
        }
        Ok(())
    }

    /// Fold duplicate region nodes into the first slot holding that seqid.
    ///
    /// Returns true if a slot was emptied.
    fn consolidate(&mut self) -> bool {
        let mut emptied = false;
        for i in 0..self.buffer.len() {
            for j in (i + 1)..self.buffer.len() {
                let (head, tail) = self.buffer.split_at_mut(j);
                let (Some(target), Some(other)) = (&mut head[i], &tail[0]) else {
                    continue;
                };
                if consolidate_regions(target, other) {
                    debug!(
                        "merged region {} of input {} into input {}, now {}",
                        other.seqid(),
                        j,
                        i,
                        target.range()
                    );
                    tail[0] = None;
                    emptied = true;
                }
            }
        }
        emptied
    }

    fn take_min(&mut self) -> Option<GenomeNode> {
        let mut min: Option<usize> = None;
        for (i, slot) in self.buffer.iter().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            let smaller = match min.and_then(|m| self.buffer[m].as_ref()) {
                Some(current) => node.compare(current) == Ordering::Less,
                None => true,
            };
            if smaller {
                min = Some(i);
            }
        }
        min.and_then(|i| self.buffer[i].take())
    }
}

impl NodeStream for MergeStream<'_> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        loop {
            self.fill_buffers()?;
            if !self.consolidate() {
                break;
            }
        }
        Ok(self.take_min())
    }

    fn is_sorted(&self) -> bool {
        true
    }
}
