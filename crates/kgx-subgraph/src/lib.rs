//! Smallest enclosing subgraphs for knowledge-graph entity pairs.
//!
//! Given a triple store and a set of `(head, tail)` pairs, find for each pair
//! the smallest hop count at which the neighborhoods of both entities share
//! at least one triple, and report the shared triples by row index. The
//! resulting `(head, tail, index)` table is used as explanatory context for
//! link-prediction experiments.
//!
//! ## Pieces
//!
//! - [`TripleStore`]: row-indexed triples with per-entity Roaring bitmaps
//! - [`neighborhood`] / [`Expansion`]: bounded relational expansion
//! - [`smallest_subgraph_for_pair`]: escalating search over `min..=max` hops,
//!   returning [`SubgraphSearch::Found`] or [`SubgraphSearch::NotFound`]
//! - [`subgraphs`]: parallel batch driver with per-pair failure isolation
//!
//! ```
//! use kgx_subgraph::{smallest_subgraph_for_pair, Triple, TripleStore};
//!
//! let store = TripleStore::from_triples([
//!     Triple::new("A", "r1", "B"),
//!     Triple::new("B", "r2", "C"),
//! ])
//! .unwrap();
//!
//! let found = smallest_subgraph_for_pair(&store, "A", "C", 2, 4);
//! assert_eq!(found.size(), 2);
//! assert_eq!(found.rows().unwrap().len(), 2);
//! ```

pub mod batch;
pub mod config;
pub mod neighborhood;
pub mod pairs;
pub mod store;

pub use batch::{
    subgraphs, subgraphs_with_cancel, BatchError, BatchReport, BatchSummary, CancellationToken,
    PairOutcome, PairReport, PairStatus, ResultRow, TaskError,
};
pub use config::{ConfigError, ExtractConfig, TimeoutPolicy};
pub use neighborhood::{
    neighborhood, smallest_subgraph_for_pair, subgraph_for_pair, Expansion, SubgraphSearch,
};
pub use pairs::{dedup_pairs, load_pairs, read_pairs, unique_pairs, Pair};
pub use store::{EntityId, LoadError, TableFormat, Triple, TripleStore};
