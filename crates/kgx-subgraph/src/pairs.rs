//! Query pairs: the `(head, tail)` combinations a subgraph is sought for.

use std::io::Read;
use std::path::Path;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::store::{fields, open, LoadError, TableFormat, TripleStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub head: String,
    pub tail: String,
}

impl Pair {
    pub fn new(head: impl Into<String>, tail: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            tail: tail.into(),
        }
    }
}

/// Distinct `(head, tail)` combinations of the store, in first-seen row order.
/// Triples that differ only in relation collapse to one pair.
pub fn unique_pairs(store: &TripleStore) -> Vec<Pair> {
    let mut seen = AHashSet::with_capacity(store.len());
    store
        .triples()
        .iter()
        .filter(|t| seen.insert((t.head.as_str(), t.tail.as_str())))
        .map(|t| Pair::new(t.head.as_str(), t.tail.as_str()))
        .collect()
}

/// Drop repeated pairs, keeping the first occurrence's position.
pub fn dedup_pairs<I>(pairs: I) -> Vec<Pair>
where
    I: IntoIterator<Item = Pair>,
{
    let mut seen = AHashSet::new();
    pairs
        .into_iter()
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}

/// Read a companion pair file (`head, tail` per row), deduplicated.
pub fn read_pairs<R: Read>(reader: R, format: TableFormat) -> Result<Vec<Pair>, LoadError> {
    let mut reader = format.reader_builder().from_reader(reader);
    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(LoadError::read)?;
        let [head, tail] = fields::<2>(&record)?;
        pairs.push(Pair::new(head, tail));
    }
    Ok(dedup_pairs(pairs))
}

pub fn load_pairs(path: &Path, format: Option<TableFormat>) -> Result<Vec<Pair>, LoadError> {
    let format = format.unwrap_or_else(|| TableFormat::from_path(path));
    read_pairs(open(path)?, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Triple;

    #[test]
    fn pairs_collapse_across_relations() {
        let store = TripleStore::from_triples([
            Triple::new("a", "r1", "b"),
            Triple::new("c", "r1", "d"),
            Triple::new("a", "r2", "b"),
            Triple::new("b", "r1", "a"),
        ])
        .unwrap();

        assert_eq!(
            unique_pairs(&store),
            vec![Pair::new("a", "b"), Pair::new("c", "d"), Pair::new("b", "a")]
        );
    }

    #[test]
    fn pair_file_is_deduplicated() {
        let text = "head,tail\nx,y\nx,y\ny,x\n";
        let pairs = read_pairs(text.as_bytes(), TableFormat::Csv).unwrap();
        assert_eq!(pairs, vec![Pair::new("x", "y"), Pair::new("y", "x")]);
    }

    #[test]
    fn pair_file_rejects_triples() {
        let text = "x\tr\ty\n";
        let err = read_pairs(text.as_bytes(), TableFormat::Tsv).unwrap_err();
        assert!(matches!(err, LoadError::FieldCount { expected: 2, found: 3, .. }));
    }
}
