//! GFF3 output.
//!
//! Uses itoa for coordinates and ryu for scores to avoid allocation in
//! the hot path.

use crate::error::{GfiError, Result};
use crate::gff3::parsing::escape;
use crate::gff3::{GFF_VERSION, ID, PARENT};
use crate::node::{CommentNode, FeatureNode, GenomeNode, RegionNode, SequenceNode};
use crate::stream::NodeStream;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Buffer size for Gff3Writer (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Width of sequence lines in the `##FASTA` section.
const FASTA_LINE_WIDTH: usize = 60;

/// Writes genome nodes as GFF3.
///
/// The `##gff-version 3` header is written before the first node. Feature
/// trees are written depth-first, parent before children: every child
/// gets a `Parent` attribute naming its parent's `ID`, and a parent
/// without an `ID` gets a generated one that differs from every `ID`
/// written since the last `###`. A `###` line follows every tree with
/// children. Sequence nodes go into a trailing `##FASTA` section.
pub struct Gff3Writer<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
    header_written: bool,
    in_fasta: bool,
    next_id: u64,
    ids_in_scope: FxHashSet<String>,
}

impl Gff3Writer<File> {
    /// Create a GFF3 file, truncating an existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> Gff3Writer<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
            header_written: false,
            in_fasta: false,
            next_id: 0,
            ids_in_scope: FxHashSet::default(),
        }
    }

    /// Write one node. EOF markers produce no output.
    pub fn write_node(&mut self, node: &GenomeNode) -> Result<()> {
        if node.is_eof() {
            return Ok(());
        }
        self.write_header()?;
        match node {
            GenomeNode::Sequence(sequence) => self.write_sequence(sequence),
            _ if self.in_fasta => Err(GfiError::upstream(format!(
                "cannot write {} node for {} after the ##FASTA section",
                node_kind(node),
                node.seqid()
            ))),
            GenomeNode::Region(region) => self.write_region(region),
            GenomeNode::Comment(comment) => self.write_comment(comment),
            GenomeNode::Feature(feature) => self.write_feature_tree(feature),
            GenomeNode::Eof => Ok(()),
        }
    }

    /// Write the header if nothing was written yet and flush.
    pub fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.flush()
    }

    #[inline]
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        self.writer
            .into_inner()
            .map_err(|e| GfiError::Io(e.into_error()))
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.header_written = true;
            writeln!(self.writer, "##gff-version {}", GFF_VERSION)?;
        }
        Ok(())
    }

    fn write_region(&mut self, region: &RegionNode) -> Result<()> {
        self.writer.write_all(b"##sequence-region   ")?;
        self.writer.write_all(region.seqid().as_bytes())?;
        self.writer.write_all(b" ")?;
        self.write_int(region.range().start())?;
        self.writer.write_all(b" ")?;
        self.write_int(region.range().end())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn write_comment(&mut self, comment: &CommentNode) -> Result<()> {
        self.writer.write_all(b"#")?;
        self.writer.write_all(comment.comment().as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn write_sequence(&mut self, sequence: &SequenceNode) -> Result<()> {
        if !self.in_fasta {
            self.in_fasta = true;
            self.writer.write_all(b"##FASTA\n")?;
        }
        self.writer.write_all(b">")?;
        self.writer.write_all(sequence.seqid().as_bytes())?;
        if !sequence.description().is_empty() {
            self.writer.write_all(b" ")?;
            self.writer.write_all(sequence.description().as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        for line in sequence.sequence().as_bytes().chunks(FASTA_LINE_WIDTH) {
            self.writer.write_all(line)?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_feature_tree(&mut self, root: &FeatureNode) -> Result<()> {
        for node in root.iter() {
            if let Some(id) = node.get_attribute(ID) {
                self.ids_in_scope.insert(id.to_string());
            }
        }
        let mut stack: Vec<(&FeatureNode, Option<String>)> = vec![(root, None)];
        while let Some((feature, parent_id)) = stack.pop() {
            let id = self.write_feature(feature, parent_id.as_deref())?;
            stack.extend(feature.children().iter().rev().map(|c| (c, id.clone())));
        }
        if root.number_of_children() > 0 {
            self.writer.write_all(b"###\n")?;
            self.ids_in_scope.clear();
        }
        Ok(())
    }

    /// Write one feature line and return the `ID` its children refer to.
    fn write_feature(
        &mut self,
        feature: &FeatureNode,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let id = match feature.get_attribute(ID) {
            Some(id) => Some(id.to_string()),
            None if feature.number_of_children() > 0 => Some(self.generate_id(feature)),
            None => None,
        };

        self.writer.write_all(feature.seqid().as_bytes())?;
        self.write_tab()?;
        self.writer.write_all(feature.source().as_bytes())?;
        self.write_tab()?;
        self.writer.write_all(feature.feature_type().as_bytes())?;
        self.write_tab()?;
        self.write_int(feature.range().start())?;
        self.write_tab()?;
        self.write_int(feature.range().end())?;
        self.write_tab()?;
        match feature.score() {
            Some(score) => self.write_float(score)?,
            None => self.writer.write_all(b".")?,
        }
        self.write_tab()?;
        write!(self.writer, "{}\t{}\t", feature.strand(), feature.phase().as_char())?;
        self.write_attributes(feature, id.as_deref(), parent_id)?;
        self.writer.write_all(b"\n")?;
        Ok(id)
    }

    /// `ID` and `Parent` come first, then the remaining attributes in
    /// insertion order.
    fn write_attributes(
        &mut self,
        feature: &FeatureNode,
        id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let parent = parent_id.or_else(|| feature.get_attribute(PARENT));
        let mut first = true;
        for (name, value) in [(ID, id), (PARENT, parent)] {
            if let Some(value) = value {
                self.write_attribute(&mut first, name, value)?;
            }
        }
        for (name, value) in feature.attributes() {
            if name != ID && name != PARENT {
                self.write_attribute(&mut first, name, value)?;
            }
        }
        if first {
            self.writer.write_all(b".")?;
        }
        Ok(())
    }

    #[inline]
    fn write_attribute(&mut self, first: &mut bool, name: &str, value: &str) -> Result<()> {
        if !*first {
            self.writer.write_all(b";")?;
        }
        *first = false;
        self.writer.write_all(escape(name).as_bytes())?;
        self.writer.write_all(b"=")?;
        self.writer.write_all(escape(value).as_bytes())?;
        Ok(())
    }

    fn generate_id(&mut self, feature: &FeatureNode) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{}{}", feature.feature_type(), self.next_id);
            if self.ids_in_scope.insert(id.clone()) {
                return id;
            }
        }
    }

    #[inline]
    fn write_tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t")?;
        Ok(())
    }

    #[inline]
    fn write_int(&mut self, n: u64) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_float(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }
}

fn node_kind(node: &GenomeNode) -> &'static str {
    match node {
        GenomeNode::Region(_) => "region",
        GenomeNode::Feature(_) => "feature",
        GenomeNode::Comment(_) => "comment",
        GenomeNode::Sequence(_) => "sequence",
        GenomeNode::Eof => "eof",
    }
}

/// Pass-through stage that writes every node as GFF3.
///
/// The writer is flushed once the upstream is exhausted.
pub struct Gff3OutStream<S, W: Write> {
    upstream: S,
    writer: Gff3Writer<W>,
    finished: bool,
}

impl<S: NodeStream, W: Write> Gff3OutStream<S, W> {
    pub fn new(upstream: S, output: W) -> Self {
        Self {
            upstream,
            writer: Gff3Writer::new(output),
            finished: false,
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner()
    }
}

impl<S: NodeStream, W: Write> NodeStream for Gff3OutStream<S, W> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        match self.upstream.next()? {
            Some(node) => {
                self.writer.write_node(&node)?;
                Ok(Some(node))
            }
            None => {
                if !self.finished {
                    self.finished = true;
                    self.writer.finish()?;
                }
                Ok(None)
            }
        }
    }

    fn is_sorted(&self) -> bool {
        self.upstream.is_sorted()
    }
}
