//! A small growable bitset over dense variable indices, used as the
//! per-node variable-dependency cache (spec §3, §9 "expression graph with
//! sharing").

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitset {
    words: Vec<u64>,
}

const BITS: usize = 64;

impl Bitset {
    pub fn new() -> Self {
        Bitset { words: Vec::new() }
    }

    pub fn singleton(i: usize) -> Self {
        let mut b = Bitset::new();
        b.set(i);
        b
    }

    fn ensure(&mut self, word: usize) {
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
    }

    pub fn set(&mut self, i: usize) {
        self.ensure(i / BITS);
        self.words[i / BITS] |= 1u64 << (i % BITS);
    }

    pub fn get(&self, i: usize) -> bool {
        self.words
            .get(i / BITS)
            .map(|w| (w >> (i % BITS)) & 1 == 1)
            .unwrap_or(false)
    }

    pub fn union(&self, other: &Bitset) -> Bitset {
        let len = self.words.len().max(other.words.len());
        let mut words = vec![0u64; len];
        for (i, w) in self.words.iter().enumerate() {
            words[i] |= w;
        }
        for (i, w) in other.words.iter().enumerate() {
            words[i] |= w;
        }
        Bitset { words }
    }

    pub fn union_with(&mut self, other: &Bitset) {
        self.ensure(other.words.len().saturating_sub(1));
        for (i, w) in other.words.iter().enumerate() {
            self.words[i] |= w;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, w)| {
            (0..BITS).filter(move |b| (w >> b) & 1 == 1).map(move |b| wi * BITS + b)
        })
    }

    /// Is every set bit in `self` also set in `other`.
    pub fn is_subset_of(&self, other: &Bitset) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let ow = other.words.get(i).copied().unwrap_or(0);
            w & !ow == 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_combines_distinct_words() {
        let mut a = Bitset::new();
        a.set(0);
        a.set(70);
        let mut b = Bitset::new();
        b.set(1);
        let u = a.union(&b);
        assert!(u.get(0) && u.get(1) && u.get(70));
    }

    #[test]
    fn subset_check() {
        let a = Bitset::singleton(5);
        let mut b = Bitset::singleton(5);
        b.set(6);
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
    }
}
