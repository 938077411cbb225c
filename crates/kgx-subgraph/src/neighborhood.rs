//! Neighborhood expansion and smallest enclosing subgraphs.
//!
//! `Neighborhood(e, 1)` is every row touching `e`. Each further hop adds the
//! rows whose head is a tail of an included row, or whose tail is a head of
//! an included row. Expansion is tracked incrementally: only the rows added
//! in the previous round (the frontier) can contribute new endpoints, so each
//! endpoint's bitmap is unioned at most once per direction.

use std::time::Instant;

use roaring::RoaringBitmap;

use crate::store::TripleStore;

/// Hop-by-hop expansion of one entity's neighborhood.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    store: &'a TripleStore,
    hops: u32,
    rows: RoaringBitmap,
    frontier: RoaringBitmap,
    /// Entities whose `rows_with_head` bitmap has been unioned in.
    expanded_as_tail: RoaringBitmap,
    /// Entities whose `rows_with_tail` bitmap has been unioned in.
    expanded_as_head: RoaringBitmap,
}

impl<'a> Expansion<'a> {
    /// Start at one hop. Unknown entities start (and stay) empty.
    pub fn new(store: &'a TripleStore, entity: &str) -> Self {
        let rows = store
            .entity_id(entity)
            .map(|id| store.rows_touching(id))
            .unwrap_or_default();
        Self {
            store,
            hops: 1,
            frontier: rows.clone(),
            rows,
            expanded_as_tail: RoaringBitmap::new(),
            expanded_as_head: RoaringBitmap::new(),
        }
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn rows(&self) -> &RoaringBitmap {
        &self.rows
    }

    pub fn into_rows(self) -> RoaringBitmap {
        self.rows
    }

    /// The last round added nothing; every further round is a no-op.
    pub fn is_saturated(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Run one expansion round. Returns whether any row was added.
    pub fn step(&mut self) -> bool {
        self.hops = self.hops.saturating_add(1);
        if self.frontier.is_empty() {
            return false;
        }

        let mut added = RoaringBitmap::new();
        for row in &self.frontier {
            let (head, tail) = self.store.endpoints(row);
            if self.expanded_as_tail.insert(tail.raw()) {
                added |= self.store.rows_with_head(tail);
            }
            if self.expanded_as_head.insert(head.raw()) {
                added |= self.store.rows_with_tail(head);
            }
        }
        added -= &self.rows;
        self.rows |= &added;
        self.frontier = added;
        !self.frontier.is_empty()
    }

    /// Expand until `hops` rounds have been applied.
    pub fn advance_to(&mut self, hops: u32) {
        while self.hops < hops {
            if self.is_saturated() {
                self.hops = hops;
                return;
            }
            self.step();
        }
    }
}

/// Rows reachable from `entity` within `hops` rounds. `hops` below 1 is
/// treated as 1.
pub fn neighborhood(store: &TripleStore, entity: &str, hops: u32) -> RoaringBitmap {
    let mut expansion = Expansion::new(store, entity);
    expansion.advance_to(hops.max(1));
    expansion.into_rows()
}

/// `Neighborhood(head, size) ∩ Neighborhood(tail, size)`.
pub fn subgraph_for_pair(store: &TripleStore, head: &str, tail: &str, size: u32) -> RoaringBitmap {
    neighborhood(store, head, size) & neighborhood(store, tail, size)
}

/// Outcome of the smallest-subgraph search for one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SubgraphSearch {
    /// The smallest size in range with a non-empty intersection.
    Found { size: u32, rows: RoaringBitmap },
    /// Every size up to `max_size` intersected to nothing.
    NotFound { max_size: u32 },
}

impl SubgraphSearch {
    pub fn is_found(&self) -> bool {
        matches!(self, SubgraphSearch::Found { .. })
    }

    /// Size the search stopped at (`max_size` when nothing was found).
    pub fn size(&self) -> u32 {
        match self {
            SubgraphSearch::Found { size, .. } => *size,
            SubgraphSearch::NotFound { max_size } => *max_size,
        }
    }

    pub fn rows(&self) -> Option<&RoaringBitmap> {
        match self {
            SubgraphSearch::Found { rows, .. } => Some(rows),
            SubgraphSearch::NotFound { .. } => None,
        }
    }

    pub fn row_count(&self) -> u64 {
        self.rows().map_or(0, RoaringBitmap::len)
    }
}

/// Try sizes `min_size..=max_size` in order and stop at the first non-empty
/// intersection.
pub fn smallest_subgraph_for_pair(
    store: &TripleStore,
    head: &str,
    tail: &str,
    min_size: u32,
    max_size: u32,
) -> SubgraphSearch {
    // Without a deadline the search never expires.
    search(store, head, tail, min_size, max_size, None)
        .unwrap_or(SubgraphSearch::NotFound { max_size })
}

/// The wall-clock deadline passed before `size` could be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeadlineExceeded {
    pub size: u32,
}

pub(crate) fn search(
    store: &TripleStore,
    head: &str,
    tail: &str,
    min_size: u32,
    max_size: u32,
    deadline: Option<Instant>,
) -> Result<SubgraphSearch, DeadlineExceeded> {
    let min_size = min_size.max(1);
    let mut from_head = Expansion::new(store, head);
    let mut from_tail = Expansion::new(store, tail);

    for size in min_size..=max_size {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DeadlineExceeded { size });
        }

        from_head.advance_to(size);
        from_tail.advance_to(size);

        let rows = from_head.rows() & from_tail.rows();
        if !rows.is_empty() {
            return Ok(SubgraphSearch::Found { size, rows });
        }
        if settled(&from_head, &from_tail) {
            break;
        }
    }

    Ok(SubgraphSearch::NotFound { max_size })
}

/// No later size can produce a non-empty intersection.
fn settled(a: &Expansion<'_>, b: &Expansion<'_>) -> bool {
    let dead = |e: &Expansion<'_>| e.is_saturated() && e.rows().is_empty();
    dead(a) || dead(b) || (a.is_saturated() && b.is_saturated())
}
