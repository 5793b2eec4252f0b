//! Compact symbol sets for table construction and lex modes.

use std::hash::{Hash, Hasher};

use super::Symbol;

/// A growable bit set of symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolSet {
    words: Vec<u64>,
}

impl SymbolSet {
    fn significant(&self) -> &[u64] {
        let len = self
            .words
            .iter()
            .rposition(|word| *word != 0)
            .map_or(0, |index| index + 1);
        &self.words[..len]
    }
}

impl PartialEq for SymbolSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for SymbolSet {}

impl Hash for SymbolSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl SymbolSet {
    /// Creates an empty set able to hold `capacity` symbols.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
        }
    }

    /// Adds a symbol. Returns true if it was not present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let (word, bit) = Self::slot(symbol);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let added = self.words[word] & mask == 0;
        self.words[word] |= mask;
        added
    }

    /// Returns true if `symbol` is in the set.
    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        let (word, bit) = Self::slot(symbol);
        self.words
            .get(word)
            .is_some_and(|bits| bits & (1u64 << bit) != 0)
    }

    /// Adds every member of `other`. Returns true if anything changed.
    pub fn union_with(&mut self, other: &SymbolSet) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *mine | theirs;
            changed |= merged != *mine;
            *mine = merged;
        }
        changed
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..64u16)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .filter_map(move |bit| u16::try_from(index * 64).ok().map(|base| Symbol::new(base + bit)))
        })
    }

    fn slot(symbol: Symbol) -> (usize, usize) {
        (symbol.index() / 64, symbol.index() % 64)
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = SymbolSet::default();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_iterate_in_order() {
        let mut set = SymbolSet::with_capacity(10);
        assert!(set.insert(Symbol::new(70)));
        assert!(set.insert(Symbol::new(3)));
        assert!(!set.insert(Symbol::new(3)));
        let members: Vec<_> = set.iter().map(Symbol::id).collect();
        assert_eq!(members, vec![3, 70]);
        assert!(set.contains(Symbol::new(70)));
        assert!(!set.contains(Symbol::new(4)));
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut wide = SymbolSet::with_capacity(256);
        wide.insert(Symbol::new(5));
        let narrow: SymbolSet = [Symbol::new(5)].into_iter().collect();
        assert_eq!(wide, narrow);
    }

    #[test]
    fn test_union_reports_change() {
        let mut a: SymbolSet = [Symbol::new(1)].into_iter().collect();
        let b: SymbolSet = [Symbol::new(1), Symbol::new(2)].into_iter().collect();
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().count(), 2);
    }
}
