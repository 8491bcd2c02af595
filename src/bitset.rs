//! Compact variable sets used for circuit scope checks.
//!
//! The *scope* of a circuit node is the set of variables tested anywhere
//! beneath it. Validating decomposability (product children have pairwise
//! disjoint scopes) and smoothness (sum children have identical scopes)
//! needs one scope per node, so the representation has to be small and the
//! set operations word-parallel.

/// A set of variable indices, one bit per variable.
///
/// Words are appended on demand and never trimmed, so equality compares
/// members only: trailing zero words are ignored.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

const WORD: usize = u64::BITS as usize;

impl BitSet {
    /// An empty set with room for variables `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD)],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The scope of a single terminal.
    pub fn singleton(var: usize) -> Self {
        let mut s = Self::new(var + 1);
        s.insert(var);
        s
    }

    /// Number of variables in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn contains(&self, var: usize) -> bool {
        self.words
            .get(var / WORD)
            .is_some_and(|w| w >> (var % WORD) & 1 == 1)
    }

    /// Adds `var`; returns false if it was already there.
    pub fn insert(&mut self, var: usize) -> bool {
        let i = var / WORD;
        if i >= self.words.len() {
            self.words.resize(i + 1, 0);
        }
        let bit = 1u64 << (var % WORD);
        let fresh = self.words[i] & bit == 0;
        self.words[i] |= bit;
        fresh
    }

    /// In-place union.
    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    /// The smallest variable in both sets, if any. Used to name the
    /// offending variable of a non-decomposable product.
    pub fn first_common(&self, other: &BitSet) -> Option<usize> {
        self.words
            .iter()
            .zip(&other.words)
            .position(|(a, b)| a & b != 0)
            .map(|i| i * WORD + (self.words[i] & other.words[i]).trailing_zeros() as usize)
    }

    pub fn is_disjoint(&self, other: &BitSet) -> bool {
        self.first_common(other).is_none()
    }

    /// Members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            let mut rest = w;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD + bit)
            })
        })
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let (short, long) = if self.words.len() <= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        short.iter().zip(long.iter()).all(|(a, b)| a == b) && long[short.len()..].iter().all(|&w| w == 0)
    }
}

impl Eq for BitSet {}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut s = BitSet::empty();
        for var in iter {
            s.insert(var);
        }
        s
    }
}
