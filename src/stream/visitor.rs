//! Stream stage that shows every node to a visitor.

use crate::error::Result;
use crate::node::GenomeNode;
use crate::stream::NodeStream;
use crate::visitor::NodeVisitor;
use log::warn;

/// Pulls one node per call, lets the visitor see it, and forwards it.
///
/// If the visitor fails, the node is dropped and the error returned.
pub struct VisitorStream<S, V> {
    upstream: S,
    visitor: V,
}

impl<S: NodeStream, V: NodeVisitor> VisitorStream<S, V> {
    pub fn new(upstream: S, visitor: V) -> Self {
        Self { upstream, visitor }
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    pub fn into_visitor(self) -> V {
        self.visitor
    }
}

impl<S: NodeStream, V: NodeVisitor> NodeStream for VisitorStream<S, V> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        let Some(node) = self.upstream.next()? else {
            return Ok(None);
        };
        if let Err(e) = node.accept(&mut self.visitor) {
            warn!(
                "visitor failed on {} node at {}: {}",
                node.seqid(),
                node.range(),
                e
            );
            return Err(e);
        }
        Ok(Some(node))
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}
