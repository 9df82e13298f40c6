use crate::config::LEDGER_CAPACITY;
use rustc_hash::FxHashSet;

/// Run-scoped set of PMIDs that are final: either already written or deleted by a newer snapshot.
///
/// Sources are fed newest first, so the first sighting of an identifier wins and
/// every later (older) occurrence is dropped. The set only grows.
pub struct ConsolidationLedger {
    seen: FxHashSet<u64>,
}

impl ConsolidationLedger {
    pub fn new() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut seen = FxHashSet::default();
        seen.reserve(capacity);
        Self { seen }
    }

    pub fn already_seen(&self, pmid: u64) -> bool {
        self.seen.contains(&pmid)
    }

    /// Returns true if the identifier was not in the ledger before.
    pub fn mark_seen(&mut self, pmid: u64) -> bool {
        self.seen.insert(pmid)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for ConsolidationLedger {
    fn default() -> Self {
        Self::new()
    }
}
