// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]
#![allow(clippy::type_complexity)]
#![allow(clippy::len_without_is_empty)]

//! GFI: Genome Feature Index
//!
//! A thread-safe spatial index over annotated genome features, plus the
//! pull-based node stream pipeline that feeds it.
//!
//! # Features
//!
//! - **Feature index**: per-seqid interval trees answering range queries
//!   in `O(log n + k)`, shared between threads behind one reader-writer lock
//! - **Node streams**: lazy, single-threaded stages (merge, sort, filter,
//!   consensus spliced alignment) composed into pipelines
//! - **GFF3 I/O**: a reader that assembles feature trees and a writer that
//!   serialises them back
//!
//! # Example
//!
//! ```rust
//! use gfi_genomics::prelude::*;
//! use std::sync::Arc;
//!
//! let index: Arc<dyn FeatureIndex> = Arc::new(FeatureIndexMemory::new());
//! let gene = FeatureNode::new("ctg1", "gene", Range::new(100, 900), Strand::Forward);
//! index.add_feature_node(&Arc::new(gene))?;
//!
//! let hits = index.get_features_for_range("ctg1", Range::new(850, 1000))?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(index.get_range_for_seqid("ctg1")?, Range::new(100, 900));
//! # Ok::<(), gfi_genomics::GfiError>(())
//! ```

pub mod bittab;
pub mod config;
pub mod consensus;
pub mod error;
pub mod gff3;
pub mod index;
pub mod interval_tree;
pub mod node;
pub mod parallel;
pub mod range;
pub mod stream;
pub mod visitor;

// Re-export commonly used types
pub use error::{GfiError, Result};
pub use index::{FeatureIndex, FeatureIndexExt, FeatureIndexMemory};
pub use node::{FeatureNode, GenomeNode, RegionNode, Strand};
pub use range::Range;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{GfiError, Result};
    pub use crate::gff3::{Gff3InStream, Gff3OutStream, Gff3Writer};
    pub use crate::index::{FeatureIndex, FeatureIndexExt, FeatureIndexMemory};
    pub use crate::node::{
        CommentNode, FeatureNode, GenomeNode, Origin, Phase, RegionNode, SequenceNode, Strand,
    };
    pub use crate::range::Range;
    pub use crate::stream::{
        ArrayInStream, CsaStream, FeatureInStream, FeatureOutStream, FilterStream, MergeStream,
        NodeStream, SortStream, ThresholdFilter, ThresholdFilterStream, VisitorStream,
    };
    pub use crate::visitor::{FeatureVisitor, NodeVisitor};
}
