//! GFF3 input and output.
//!
//! [`Gff3InStream`] turns a GFF3 file into region, comment, feature and
//! sequence nodes, assembling feature trees from `ID`/`Parent` attributes.
//! [`Gff3Writer`] goes the other way; [`Gff3OutStream`] wraps it as a
//! pass-through pipeline stage.
//!
//! ```
//! use gfi_genomics::gff3::{Gff3InStream, Gff3Writer};
//! use gfi_genomics::stream::NodeStream;
//!
//! let text = "##gff-version 3\nctg1\t.\tgene\t10\t90\t.\t+\t.\tID=g1\n";
//! let mut input = Gff3InStream::new(text.as_bytes(), "inline.gff3");
//! let mut writer = Gff3Writer::new(Vec::new());
//! while let Some(node) = input.next()? {
//!     writer.write_node(&node)?;
//! }
//! let out = writer.into_inner()?;
//! assert_eq!(String::from_utf8_lossy(&out), text);
//! # Ok::<(), gfi_genomics::GfiError>(())
//! ```

pub mod parsing;
mod reader;
mod writer;

pub use reader::Gff3InStream;
pub use writer::{Gff3OutStream, Gff3Writer};

/// The only GFF version understood by the reader and written by the writer.
pub const GFF_VERSION: &str = "3";

/// Attribute naming a feature so children can refer to it.
pub const ID: &str = "ID";

/// Attribute naming the parent(s) of a feature, comma separated.
pub const PARENT: &str = "Parent";
