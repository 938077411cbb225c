//! TripleStore: row-indexed `(head, relation, tail)` facts.
//!
//! Rows keep their input order; the 0-based row index is the unit of subgraph
//! membership and is never renumbered. Entity strings are interned to dense
//! ids, and each entity carries two Roaring bitmaps:
//!
//! - `rows_by_head[e]`: rows whose head is `e`
//! - `rows_by_tail[e]`: rows whose tail is `e`
//!
//! Neighborhood expansion only ever unions these bitmaps, so the store is
//! read-only once loaded and can be shared across worker threads.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

impl Triple {
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
        }
    }
}

/// Interned entity ID (dense, assigned in first-seen order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Dialect of a tabular input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Tab-separated, no header (raw benchmark `train.txt` files).
    #[default]
    Tsv,
    /// Comma-separated with a header row (normalized dataset files).
    Csv,
}

impl TableFormat {
    /// `.csv` files are read as [`TableFormat::Csv`], everything else as TSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => TableFormat::Csv,
            _ => TableFormat::Tsv,
        }
    }

    pub(crate) fn reader_builder(self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        // Field counts are checked by the loaders so the error names the line.
        builder.flexible(true);
        match self {
            TableFormat::Tsv => {
                builder.delimiter(b'\t').has_headers(false).quoting(false);
            }
            TableFormat::Csv => {
                builder.has_headers(true);
            }
        }
        builder
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed row on line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("failed to read row on line {line}: {source}")]
    Read { line: u64, source: csv::Error },
    #[error("too many rows: row indices are limited to {max}")]
    TooManyRows { max: u64 },
}

impl LoadError {
    pub(crate) fn read(source: csv::Error) -> Self {
        let line = source.position().map(|p| p.line()).unwrap_or(0);
        LoadError::Read { line, source }
    }
}

pub(crate) fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Pulls exactly `N` fields out of a record, or reports the offending line.
pub(crate) fn fields<const N: usize>(record: &csv::StringRecord) -> Result<[&str; N], LoadError> {
    if record.len() != N {
        return Err(LoadError::FieldCount {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            expected: N,
            found: record.len(),
        });
    }
    Ok(std::array::from_fn(|i| &record[i]))
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct TripleStore {
    triples: Vec<Triple>,
    heads: Vec<EntityId>,
    tails: Vec<EntityId>,
    entity_ids: AHashMap<String, EntityId>,
    entity_names: Vec<String>,
    rows_by_head: Vec<RoaringBitmap>,
    rows_by_tail: Vec<RoaringBitmap>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples<I>(triples: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut store = Self::new();
        for triple in triples {
            store.push(triple)?;
        }
        Ok(store)
    }

    /// Load a triple file, inferring the dialect from the extension when
    /// `format` is `None`.
    pub fn load(path: &Path, format: Option<TableFormat>) -> Result<Self, LoadError> {
        let format = format.unwrap_or_else(|| TableFormat::from_path(path));
        let store = Self::read(open(path)?, format)?;
        tracing::info!(
            path = %path.display(),
            triples = store.len(),
            entities = store.entity_count(),
            "loaded triple store"
        );
        Ok(store)
    }

    pub fn read<R: Read>(reader: R, format: TableFormat) -> Result<Self, LoadError> {
        let mut reader = format.reader_builder().from_reader(reader);
        let mut store = Self::new();
        for record in reader.records() {
            let record = record.map_err(LoadError::read)?;
            let [head, relation, tail] = fields::<3>(&record)?;
            store.push(Triple::new(head, relation, tail))?;
        }
        Ok(store)
    }

    /// Append a triple, returning its row index.
    pub fn push(&mut self, triple: Triple) -> Result<u32, LoadError> {
        let row = u32::try_from(self.triples.len()).map_err(|_| LoadError::TooManyRows {
            max: u64::from(u32::MAX),
        })?;
        let head = self.intern(&triple.head);
        let tail = self.intern(&triple.tail);

        self.rows_by_head[head.0 as usize].insert(row);
        self.rows_by_tail[tail.0 as usize].insert(row);
        self.heads.push(head);
        self.tails.push(tail);
        self.triples.push(triple);
        Ok(row)
    }

    fn intern(&mut self, name: &str) -> EntityId {
        if let Some(&id) = self.entity_ids.get(name) {
            return id;
        }
        let id = EntityId(self.entity_names.len() as u32);
        self.entity_ids.insert(name.to_string(), id);
        self.entity_names.push(name.to_string());
        self.rows_by_head.push(RoaringBitmap::new());
        self.rows_by_tail.push(RoaringBitmap::new());
        id
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_names.len()
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn triple(&self, row: u32) -> Option<&Triple> {
        self.triples.get(row as usize)
    }

    /// Look up an entity without inserting it.
    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.entity_ids.get(name).copied()
    }

    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entity_names.get(id.0 as usize).map(String::as_str)
    }

    /// Rows where `entity` appears as head or tail.
    pub fn rows_touching(&self, entity: EntityId) -> RoaringBitmap {
        self.rows_with_head(entity) | self.rows_with_tail(entity)
    }

    pub fn rows_with_head(&self, entity: EntityId) -> &RoaringBitmap {
        &self.rows_by_head[entity.0 as usize]
    }

    pub fn rows_with_tail(&self, entity: EntityId) -> &RoaringBitmap {
        &self.rows_by_tail[entity.0 as usize]
    }

    /// Interned `(head, tail)` of a row. Panics on an out-of-range row; every
    /// row handed out by the store is in range.
    pub(crate) fn endpoints(&self, row: u32) -> (EntityId, EntityId) {
        (self.heads[row as usize], self.tails[row as usize])
    }
}
