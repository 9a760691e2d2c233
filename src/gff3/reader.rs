//! GFF3 producer.

use crate::config;
use crate::error::{GfiError, Result};
use crate::gff3::parsing::{
    count_columns, parse_attributes, parse_phase, parse_score, parse_sequence_region,
    parse_strand, parse_u64_fast, split_columns, NUM_COLUMNS,
};
use crate::gff3::{GFF_VERSION, ID, PARENT};
use crate::node::{CommentNode, FeatureNode, GenomeNode, Origin, RegionNode, SequenceNode};
use crate::range::Range;
use crate::stream::NodeStream;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A feature line waiting for its parent to be resolved.
struct Pending {
    feature: Option<FeatureNode>,
    parent_ids: Vec<String>,
    children: Vec<usize>,
    attached: bool,
    line: usize,
}

enum Item {
    Comment(CommentNode),
    Feature(usize),
}

/// Everything read between two `###` lines.
#[derive(Default)]
struct Chunk {
    pending: Vec<Pending>,
    ids: FxHashMap<String, usize>,
    items: Vec<Item>,
}

/// Reads GFF3 and produces region, comment, feature and sequence nodes.
///
/// The whole input is read on the first call to `next`, because a
/// feature tree is only complete once every line that may name one of
/// its members as `Parent` has been seen. Region nodes come first in file
/// order, then comments and top-level features in file order, then the
/// sequences of an optional `##FASTA` section.
///
/// Features whose `Parent` is unknown are kept as top-level features,
/// unless [`config::strict_gff3`] is enabled, in which case they are an
/// error. A feature naming several parents is attached to the first one.
pub struct Gff3InStream<R: Read> {
    reader: BufReader<R>,
    filename: String,
    line_number: usize,
    bytes: Vec<u8>,
    buffer: String,
    strict: bool,
    parsed: bool,
    nodes: VecDeque<GenomeNode>,
}

impl Gff3InStream<File> {
    /// Open a GFF3 file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl<R: Read> Gff3InStream<R> {
    /// Create a GFF3 reader. `filename` is used in node origins and errors.
    pub fn new(reader: R, filename: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            filename: filename.into(),
            line_number: 0,
            bytes: Vec::with_capacity(1024),
            buffer: String::with_capacity(1024),
            strict: config::strict_gff3(),
            parsed: false,
            nodes: VecDeque::new(),
        }
    }

    /// Override the global strictness setting for this reader.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[inline]
    fn error(&self, line: usize, message: impl Into<String>) -> GfiError {
        GfiError::parse(&self.filename, line, message)
    }

    #[inline]
    fn origin(&self) -> Origin {
        Origin::new(self.filename.as_str(), self.line_number as u32)
    }

    fn read_line(&mut self) -> Result<bool> {
        self.bytes.clear();
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.bytes)? == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        while matches!(self.bytes.last(), Some(b'\n' | b'\r')) {
            self.bytes.pop();
        }
        match std::str::from_utf8(&self.bytes) {
            Ok(line) => self.buffer.push_str(line),
            Err(e) => {
                return Err(self.error(
                    self.line_number,
                    format!("invalid UTF-8 at byte {}", e.valid_up_to()),
                ))
            }
        }
        Ok(true)
    }

    fn parse_all(&mut self) -> Result<()> {
        let mut regions: Vec<GenomeNode> = Vec::new();
        let mut body: Vec<GenomeNode> = Vec::new();
        let mut chunk = Chunk::default();
        let mut fasta = false;

        while self.read_line()? {
            if self.buffer.trim().is_empty() {
                continue;
            }
            if self.buffer.starts_with('>') {
                fasta = true;
                break;
            }
            if let Some(pragma) = self.buffer.strip_prefix("##") {
                if self.parse_pragma(pragma, &mut regions, &mut chunk, &mut body)? {
                    fasta = true;
                    break;
                }
            } else if let Some(comment) = self.buffer.strip_prefix('#') {
                let node = CommentNode::new(comment).with_origin(self.origin());
                chunk.items.push(Item::Comment(node));
            } else {
                self.parse_feature(&mut chunk)?;
            }
        }
        self.resolve(chunk, &mut body)?;

        let mut sequences = Vec::new();
        if fasta {
            self.parse_fasta(&mut sequences)?;
        }

        debug!(
            "read {} regions, {} nodes and {} sequences from {}",
            regions.len(),
            body.len(),
            sequences.len(),
            self.filename
        );
        self.nodes = regions
            .into_iter()
            .chain(body)
            .chain(sequences)
            .collect();
        Ok(())
    }

    /// Handle a `##` line. Returns true when a FASTA section starts.
    fn parse_pragma(
        &self,
        pragma: &str,
        regions: &mut Vec<GenomeNode>,
        chunk: &mut Chunk,
        body: &mut Vec<GenomeNode>,
    ) -> Result<bool> {
        if pragma == "#" {
            let finished = std::mem::take(chunk);
            self.resolve(finished, body)?;
            return Ok(false);
        }
        if pragma.trim_end() == "FASTA" {
            return Ok(true);
        }
        let (name, rest) = pragma
            .split_once(char::is_whitespace)
            .unwrap_or((pragma, ""));
        match name {
            "gff-version" => {
                if rest.trim().split('.').next() != Some(GFF_VERSION) {
                    return Err(self.error(
                        self.line_number,
                        format!("unsupported GFF version '{}'", rest.trim()),
                    ));
                }
            }
            "sequence-region" => {
                let Some((seqid, start, end)) = parse_sequence_region(rest) else {
                    return Err(self.error(
                        self.line_number,
                        format!("malformed sequence-region pragma '{}'", rest.trim()),
                    ));
                };
                let range = Range::try_new(start, end)
                    .map_err(|e| self.error(self.line_number, e.to_string()))?;
                regions.push(RegionNode::new(seqid, range).with_origin(self.origin()).into());
            }
            _ => debug!("ignoring pragma ##{} at line {}", name, self.line_number),
        }
        Ok(false)
    }

    fn parse_feature(&mut self, chunk: &mut Chunk) -> Result<()> {
        let line = self.line_number;
        let bytes = self.buffer.as_bytes();
        let Some(columns) = split_columns(bytes) else {
            return Err(self.error(
                line,
                format!(
                    "expected {} tab-separated columns, got {}",
                    NUM_COLUMNS,
                    count_columns(bytes)
                ),
            ));
        };
        let text = |i: usize| String::from_utf8_lossy(columns[i]);

        let seqid = text(0);
        if seqid.is_empty() || seqid == "." {
            return Err(self.error(line, "missing seqid"));
        }
        let feature_type = text(2);
        if feature_type.is_empty() {
            return Err(self.error(line, "missing feature type"));
        }
        let start = parse_u64_fast(columns[3])
            .ok_or_else(|| self.error(line, format!("invalid start '{}'", text(3))))?;
        let end = parse_u64_fast(columns[4])
            .ok_or_else(|| self.error(line, format!("invalid end '{}'", text(4))))?;
        if start > end {
            return Err(self.error(line, format!("start ({}) > end ({})", start, end)));
        }
        let score = parse_score(&text(5)).map_err(|m| self.error(line, m))?;
        let strand = parse_strand(columns[6]).map_err(|m| self.error(line, m))?;
        let phase = parse_phase(columns[7]).map_err(|m| self.error(line, m))?;
        let attributes = parse_attributes(&text(8)).map_err(|m| self.error(line, m))?;

        let range = Range::new(start, end);
        let mut feature = FeatureNode::new(&*seqid, &*feature_type, range, strand)
            .with_phase(phase)
            .with_origin(self.origin());
        let source = text(1);
        if source != "." {
            feature.set_source(&*source);
        }
        if let Some(score) = score {
            feature.set_score(score);
        }

        let mut parent_ids = Vec::new();
        for (name, value) in attributes {
            if name == PARENT {
                parent_ids.extend(value.split(',').map(|p| p.trim().to_string()));
            }
            feature.set_attribute(name, value);
        }

        let index = chunk.pending.len();
        if let Some(id) = feature.get_attribute(ID) {
            // multi-line features repeat their ID; children hang off the first line
            chunk.ids.entry(id.to_string()).or_insert(index);
        }
        chunk.pending.push(Pending {
            feature: Some(feature),
            parent_ids,
            children: Vec::new(),
            attached: false,
            line,
        });
        chunk.items.push(Item::Feature(index));
        Ok(())
    }

    /// Link every feature of `chunk` to its parent and emit the trees.
    fn resolve(&self, mut chunk: Chunk, body: &mut Vec<GenomeNode>) -> Result<()> {
        for index in 0..chunk.pending.len() {
            let pending = &chunk.pending[index];
            if pending.parent_ids.is_empty() {
                continue;
            }
            let line = pending.line;
            let parent = pending
                .parent_ids
                .iter()
                .find_map(|id| chunk.ids.get(id).copied());
            let names = pending.parent_ids.join(",");
            match parent {
                Some(parent) if parent == index => {
                    return Err(self.error(line, "feature is its own parent"));
                }
                Some(parent) => {
                    if seqid_of(&chunk.pending[parent]) != seqid_of(&chunk.pending[index]) {
                        return Err(self.error(
                            line,
                            format!("parent '{}' is on a different seqid", names),
                        ));
                    }
                    if chunk.pending[index].parent_ids.len() > 1 {
                        warn!(
                            "{}:{}: feature has parents '{}', attaching it to the first known one",
                            self.filename, line, names
                        );
                    }
                    chunk.pending[parent].children.push(index);
                    chunk.pending[index].attached = true;
                }
                None if self.strict => {
                    return Err(self.error(line, format!("unknown parent '{}'", names)));
                }
                None => {
                    warn!(
                        "{}:{}: unknown parent '{}', keeping feature at top level",
                        self.filename, line, names
                    );
                }
            }
        }

        for item in std::mem::take(&mut chunk.items) {
            match item {
                Item::Comment(comment) => body.push(comment.into()),
                Item::Feature(index) if !chunk.pending[index].attached => {
                    if let Some(tree) = build_tree(&mut chunk.pending, index) {
                        body.push(tree.into());
                    }
                }
                Item::Feature(_) => {}
            }
        }
        // anything not reached from a top-level feature sits on a Parent cycle
        if let Some(orphan) = chunk.pending.iter().find(|p| p.feature.is_some()) {
            return Err(self.error(orphan.line, "cyclic Parent relation"));
        }
        Ok(())
    }

    fn parse_fasta(&mut self, sequences: &mut Vec<GenomeNode>) -> Result<()> {
        if self.buffer.starts_with("##") && !self.read_line()? {
            return Ok(());
        }
        let mut current: Option<(String, String, String, Origin)> = None;
        loop {
            let line = &self.buffer;
            if let Some(header) = line.strip_prefix('>') {
                if let Some((seqid, description, sequence, origin)) = current.take() {
                    sequences.push(
                        SequenceNode::new(seqid, description, sequence)
                            .with_origin(origin)
                            .into(),
                    );
                }
                let header = header.trim();
                let (seqid, description) = header
                    .split_once(char::is_whitespace)
                    .unwrap_or((header, ""));
                if seqid.is_empty() {
                    return Err(self.error(self.line_number, "FASTA header without sequence id"));
                }
                current = Some((
                    seqid.to_string(),
                    description.trim().to_string(),
                    String::new(),
                    self.origin(),
                ));
            } else if !line.trim().is_empty() {
                match current.as_mut() {
                    Some((_, _, sequence, _)) => sequence.push_str(line.trim()),
                    None => {
                        return Err(self.error(
                            self.line_number,
                            "sequence data before the first FASTA header",
                        ))
                    }
                }
            }
            if !self.read_line()? {
                break;
            }
        }
        if let Some((seqid, description, sequence, origin)) = current {
            sequences.push(
                SequenceNode::new(seqid, description, sequence)
                    .with_origin(origin)
                    .into(),
            );
        }
        Ok(())
    }
}

fn seqid_of(pending: &Pending) -> Option<&str> {
    pending.feature.as_ref().map(|f| f.seqid())
}

/// Move the subtree rooted at `index` out of the pending list.
fn build_tree(pending: &mut [Pending], index: usize) -> Option<FeatureNode> {
    let root = pending[index].feature.take()?;
    let children = std::mem::take(&mut pending[index].children);
    let mut stack = vec![(root, children.into_iter())];
    loop {
        match stack.last_mut().and_then(|(_, children)| children.next()) {
            Some(child) => {
                if let Some(feature) = pending[child].feature.take() {
                    let children = std::mem::take(&mut pending[child].children);
                    stack.push((feature, children.into_iter()));
                }
            }
            None => {
                let (done, _) = stack.pop()?;
                match stack.last_mut() {
                    Some((parent, _)) => parent.add_child(done),
                    None => return Some(done),
                }
            }
        }
    }
}

impl<R: Read> NodeStream for Gff3InStream<R> {
    fn next(&mut self) -> Result<Option<GenomeNode>> {
        if !self.parsed {
            self.parsed = true;
            self.parse_all()?;
        }
        Ok(self.nodes.pop_front())
    }
}
