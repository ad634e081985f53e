use itertools::Itertools;

/// The reserved pseudo-symbol for transitions that consume no input. It may appear as a
/// regex literal (denoting the empty-string match) and as a row label in serialized NFA
/// tables, but it is never part of an automaton's alphabet.
pub const EPSILON: char = 'ε';

/// Represents an alphabet where a symbol is just a single `char`. The symbols are kept
/// sorted and deduplicated, so iteration order is stable. [`EPSILON`] is filtered out on
/// construction, guaranteeing that an alphabet only ever contains proper input symbols.
#[derive(Clone, Hash, PartialEq, Eq, Debug, PartialOrd, Ord, Default)]
pub struct CharAlphabet(Vec<char>);

impl CharAlphabet {
    /// Creates a new alphabet from the given symbols. Duplicates and [`EPSILON`] are removed.
    pub fn new<I: IntoIterator<Item = char>>(symbols: I) -> Self {
        symbols.into_iter().collect()
    }

    /// Returns the number of symbols in the alphabet.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// True if the alphabet contains no symbols at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether `sym` belongs to the alphabet.
    pub fn contains(&self, sym: char) -> bool {
        self.0.binary_search(&sym).is_ok()
    }

    /// Iterates over all symbols in ascending order.
    pub fn universe(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }
}

impl std::ops::Index<usize> for CharAlphabet {
    type Output = char;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<char> for CharAlphabet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .filter(|&sym| sym != EPSILON)
                .unique()
                .sorted()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CharAlphabet, EPSILON};

    #[test]
    fn alphabet_is_sorted_deduped_and_epsilon_free() {
        let alphabet = CharAlphabet::new(['b', 'a', EPSILON, 'b', 'c']);
        assert_eq!(alphabet.size(), 3);
        assert_eq!(alphabet.universe().collect::<Vec<_>>(), vec!['a', 'b', 'c']);
        assert!(alphabet.contains('b'));
        assert!(!alphabet.contains(EPSILON));
    }
}
