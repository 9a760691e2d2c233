//! Consensus spliced alignments.
//!
//! Given a set of spliced alignments (for example ESTs or cDNAs mapped to a
//! genome), compute splice forms: maximal sets of mutually compatible
//! alignments, each representing one plausible gene structure.
//!
//! Two alignments are compatible when they lie on the same strand and
//! their exon chains agree wherever they overlap. Intron boundaries must
//! match exactly; only the outermost exon ends may differ. The
//! computation builds, for every alignment, the set of alignments it
//! contains (`C`), the compatible alignments strictly to its left and
//! right, and from those the largest compatible extensions `L` and `R`.
//! Splice forms are then picked greedily by size of `L ∪ R` until every
//! alignment is covered.
//!
//! The per-alignment rows of the relation matrices are independent and
//! are computed in parallel with rayon.

use crate::bittab::Bittab;
use crate::error::{GfiError, Result};
use crate::node::{FeatureNode, Strand};
use crate::range::{ranges_are_sorted_and_do_not_overlap, Range};
use log::debug;
use rayon::prelude::*;
use std::sync::Arc;

/// Anything that can take part in the consensus computation.
pub trait SplicedAlignment {
    /// Range spanned by the whole alignment.
    fn genomic_range(&self) -> Range;

    fn strand(&self) -> Strand;

    /// Exon ranges, sorted by start and pairwise disjoint.
    fn exons(&self) -> Vec<Range>;
}

impl SplicedAlignment for FeatureNode {
    fn genomic_range(&self) -> Range {
        self.range()
    }

    fn strand(&self) -> Strand {
        FeatureNode::strand(self)
    }

    /// Descendant exons, or the feature itself if it has none.
    fn exons(&self) -> Vec<Range> {
        let exons = FeatureNode::exons(self);
        if exons.is_empty() {
            vec![self.range()]
        } else {
            exons
        }
    }
}

impl<T: SplicedAlignment + ?Sized> SplicedAlignment for Arc<T> {
    fn genomic_range(&self) -> Range {
        (**self).genomic_range()
    }

    fn strand(&self) -> Strand {
        (**self).strand()
    }

    fn exons(&self) -> Vec<Range> {
        (**self).exons()
    }
}

impl<T: SplicedAlignment + ?Sized> SplicedAlignment for &T {
    fn genomic_range(&self) -> Range {
        (**self).genomic_range()
    }

    fn strand(&self) -> Strand {
        (**self).strand()
    }

    fn exons(&self) -> Vec<Range> {
        (**self).exons()
    }
}

/// Extracted view of one alignment, shared read-only between workers.
struct Alignment {
    range: Range,
    strand: Strand,
    exons: Vec<Range>,
}

impl Alignment {
    #[inline]
    fn has_acceptor_site(&self, exon: usize) -> bool {
        exon > 0
    }

    #[inline]
    fn has_donor_site(&self, exon: usize) -> bool {
        exon + 1 < self.exons.len()
    }
}

fn compatible(a: &Alignment, b: &Alignment) -> bool {
    if a.strand != b.strand || !a.range.overlaps(&b.range) {
        return false;
    }

    // first overlapping exon pair
    let (mut i, mut j) = (0, 0);
    let mut first = None;
    while i < a.exons.len() && j < b.exons.len() {
        if a.exons[i].overlaps(&b.exons[j]) {
            first = Some((i, j));
            break;
        }
        if a.exons[i].start() < b.exons[j].start() {
            i += 1;
        } else {
            j += 1;
        }
    }
    let Some((mut i, mut j)) = first else {
        return false;
    };
    // one of the chains must be mapped from its first exon on
    if i != 0 && j != 0 {
        return false;
    }

    while i < a.exons.len() && j < b.exons.len() {
        let (ea, eb) = (a.exons[i], b.exons[j]);
        if !ea.overlaps(&eb) {
            return false;
        }

        let (acc_a, acc_b) = (a.has_acceptor_site(i), b.has_acceptor_site(j));
        if acc_a && acc_b {
            if ea.start() != eb.start() {
                return false;
            }
        } else if (acc_a && eb.start() < ea.start()) || (acc_b && ea.start() < eb.start()) {
            return false;
        }

        let (don_a, don_b) = (a.has_donor_site(i), b.has_donor_site(j));
        if don_a && don_b {
            if ea.end() != eb.end() {
                return false;
            }
        } else if (don_a && eb.end() > ea.end()) || (don_b && ea.end() > eb.end()) {
            return false;
        }

        i += 1;
        j += 1;
    }
    true
}

#[inline]
fn contains(a: &Alignment, b: &Alignment) -> bool {
    a.range.contains(&b.range) && compatible(a, b)
}

/// Row `sa` of a relation matrix: every `x` with `related(sa, x)`.
fn relation_rows<F>(sas: &[Alignment], related: F) -> Vec<Bittab>
where
    F: Fn(&Alignment, &Alignment) -> bool + Sync,
{
    let n = sas.len();
    (0..n)
        .into_par_iter()
        .map(|sa| {
            let mut row = Bittab::new(n);
            for (x, other) in sas.iter().enumerate() {
                if related(&sas[sa], other) {
                    row.set_bit(x);
                }
            }
            row
        })
        .collect()
}

/// Grow the best extension for each alignment from its neighbours.
///
/// `order` must visit every neighbour before the alignments that refer
/// to it.
fn extend(
    contained: &[Bittab],
    neighbours: &[Bittab],
    order: impl Iterator<Item = usize>,
) -> Vec<Bittab> {
    let mut extended = contained.to_vec();
    for sa in order {
        if !neighbours[sa].is_true() {
            continue;
        }
        let mut best: Option<(usize, usize)> = None;
        for x in neighbours[sa].iter_ones() {
            let size = extended[x].union_count(&contained[sa]);
            if best.map_or(true, |(_, best_size)| size > best_size) {
                best = Some((x, size));
            }
        }
        if let Some((x, _)) = best {
            extended[sa] = extended[x].or(&contained[sa]);
        }
    }
    extended
}

fn splice_form_is_valid(form: &Bittab, sas: &[Alignment]) -> bool {
    (0..sas.len())
        .filter(|&other| !form.bit_is_set(other))
        .all(|other| form.iter_ones().any(|sa| !compatible(&sas[sa], &sas[other])))
}

fn extract<T: SplicedAlignment>(sas: &[T]) -> Result<Vec<Alignment>> {
    let mut out = Vec::with_capacity(sas.len());
    for (i, sa) in sas.iter().enumerate() {
        let range = sa.genomic_range();
        let exons = sa.exons();
        if exons.is_empty() {
            return Err(GfiError::Consensus(format!(
                "alignment {} at {} has no exons",
                i, range
            )));
        }
        if !ranges_are_sorted_and_do_not_overlap(&exons) {
            return Err(GfiError::Consensus(format!(
                "exons of alignment {} at {} are not sorted or overlap",
                i, range
            )));
        }
        if let Some(prev) = out.last().map(|a: &Alignment| a.range) {
            if range.start() < prev.start() {
                return Err(GfiError::Consensus(format!(
                    "alignment {} at {} starts before its predecessor at {}",
                    i, range, prev
                )));
            }
        }
        out.push(Alignment {
            range,
            strand: sa.strand(),
            exons,
        });
    }
    Ok(out)
}

/// Compute the consensus splice forms of `sas` and pass each one to
/// `process_splice_form` as ascending indices into `sas`.
///
/// The alignments must be sorted by the start of their genomic range.
/// Every alignment ends up in at least one splice form; an alignment can
/// belong to several.
pub fn consensus_sa<T, F>(sas: &[T], mut process_splice_form: F) -> Result<()>
where
    T: SplicedAlignment,
    F: FnMut(&[usize]),
{
    let alignments = extract(sas)?;
    let n = alignments.len();
    if n == 0 {
        return Ok(());
    }
    debug!("computing consensus of {} spliced alignments", n);

    let contained = relation_rows(&alignments, contains);
    let left = relation_rows(&alignments, |sa, x| {
        sa.range.start() > x.range.start() && sa.range.end() > x.range.end() && compatible(sa, x)
    });
    let right = relation_rows(&alignments, |sa, x| {
        sa.range.start() < x.range.start() && sa.range.end() < x.range.end() && compatible(sa, x)
    });
    let l = extend(&contained, &left, 0..n);
    let r = extend(&contained, &right, (0..n).rev());

    let mut uncovered = Bittab::full(n);
    let mut splice_form = Vec::new();
    while uncovered.is_true() {
        let mut best: Option<(usize, usize)> = None;
        for sa in uncovered.iter_ones() {
            let size = l[sa].union_count(&r[sa]);
            if best.map_or(true, |(_, best_size)| size > best_size) {
                best = Some((sa, size));
            }
        }
        let Some((sa, _)) = best else {
            break;
        };
        let form = l[sa].or(&r[sa]);
        debug_assert!(splice_form_is_valid(&form, &alignments));

        splice_form.clear();
        splice_form.extend(form.iter_ones());
        process_splice_form(&splice_form);

        let remaining = uncovered.nand(&form);
        debug_assert!(remaining.count_set_bits() < uncovered.count_set_bits());
        uncovered = remaining;
    }
    Ok(())
}

/// Collect all splice forms of `sas`.
pub fn consensus_splice_forms<T: SplicedAlignment>(sas: &[T]) -> Result<Vec<Vec<usize>>> {
    let mut forms = Vec::new();
    consensus_sa(sas, |form| forms.push(form.to_vec()))?;
    Ok(forms)
}

/// Range spanned by the alignments of one splice form.
pub fn splice_form_range<T: SplicedAlignment>(sas: &[T], form: &[usize]) -> Option<Range> {
    form.iter()
        .map(|&i| sas[i].genomic_range())
        .reduce(|acc, r| acc.join(&r))
}
