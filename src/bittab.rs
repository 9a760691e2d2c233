//! Fixed-size bit table used by the consensus splice form computation.

use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-size set of bit numbers `0..num_of_bits`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bittab {
    words: Vec<u64>,
    num_of_bits: usize,
}

impl Bittab {
    /// Create a bit table with all `num_of_bits` bits unset.
    pub fn new(num_of_bits: usize) -> Self {
        Self {
            words: vec![0; num_of_bits.div_ceil(WORD_BITS)],
            num_of_bits,
        }
    }

    /// Create a bit table with every bit set.
    pub fn full(num_of_bits: usize) -> Self {
        let mut b = Self::new(num_of_bits);
        for bit in 0..num_of_bits {
            b.set_bit(bit);
        }
        b
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.num_of_bits
    }

    #[inline]
    pub fn set_bit(&mut self, bit: usize) {
        assert!(bit < self.num_of_bits);
        self.words[bit / WORD_BITS] |= 1 << (bit % WORD_BITS);
    }

    #[inline]
    pub fn unset_bit(&mut self, bit: usize) {
        assert!(bit < self.num_of_bits);
        self.words[bit / WORD_BITS] &= !(1 << (bit % WORD_BITS));
    }

    #[inline]
    pub fn bit_is_set(&self, bit: usize) -> bool {
        assert!(bit < self.num_of_bits);
        self.words[bit / WORD_BITS] & (1 << (bit % WORD_BITS)) != 0
    }

    /// Check if at least one bit is set.
    #[inline]
    pub fn is_true(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// `self |= other`
    pub fn or_equal(&mut self, other: &Bittab) {
        assert_eq!(self.num_of_bits, other.num_of_bits);
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= *src;
        }
    }

    /// `self & !other`, i.e. every bit of `self` that is not set in `other`.
    pub fn nand(&self, other: &Bittab) -> Bittab {
        assert_eq!(self.num_of_bits, other.num_of_bits);
        Bittab {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| a & !b)
                .collect(),
            num_of_bits: self.num_of_bits,
        }
    }

    /// Union of two bit tables.
    pub fn or(&self, other: &Bittab) -> Bittab {
        let mut out = self.clone();
        out.or_equal(other);
        out
    }

    /// Number of set bits.
    #[inline]
    pub fn count_set_bits(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Size of the union with `other` without materializing it.
    #[inline]
    pub fn union_count(&self, other: &Bittab) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a | b).count_ones() as usize)
            .sum()
    }

    /// Iterate over the numbers of all set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }
}

impl fmt::Debug for Bittab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in 0..self.num_of_bits {
            f.write_str(if self.bit_is_set(bit) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_unset() {
        let mut b = Bittab::new(130);
        assert!(!b.is_true());
        b.set_bit(0);
        b.set_bit(64);
        b.set_bit(129);
        assert!(b.bit_is_set(64));
        assert_eq!(b.count_set_bits(), 3);
        b.unset_bit(64);
        assert!(!b.bit_is_set(64));
        assert_eq!(b.iter_ones().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn test_set_operations() {
        let mut a = Bittab::new(10);
        let mut b = Bittab::new(10);
        a.set_bit(1);
        a.set_bit(2);
        b.set_bit(2);
        b.set_bit(3);
        assert_eq!(a.union_count(&b), 3);
        assert_eq!(a.or(&b).iter_ones().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(a.nand(&b).iter_ones().collect::<Vec<_>>(), vec![1]);
        assert_eq!(Bittab::full(10).count_set_bits(), 10);
        assert_eq!(format!("{:?}", a), "0110000000");
    }
}
