use std::collections::BTreeSet;

use crate::foundation::core::SeqIndex;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::sequence::op::{SequenceOp, TransferMode};

/// Model of which frame indices will exist on disk, used to check a timeline while it is planned.
///
/// Rendered frames are registered first; ops are then replayed transfer by transfer exactly as
/// the compiler will execute them. A transfer must read an existing index and must never land on
/// an index that is still occupied.
#[derive(Clone, Debug, Default)]
pub struct IndexCoverage {
    present: BTreeSet<u64>,
    rendered: u64,
    synthesized: u64,
}

impl IndexCoverage {
    /// Empty coverage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame produced by a render job.
    pub fn render(&mut self, idx: SeqIndex) -> QuakereelResult<()> {
        if !self.present.insert(idx.0) {
            return Err(QuakereelError::planning(format!(
                "sequence index {idx} is planned twice"
            )));
        }
        self.rendered += 1;
        Ok(())
    }

    /// Replay an op against the modelled file set.
    pub fn apply(&mut self, op: &SequenceOp) -> QuakereelResult<()> {
        for t in op.transfers()? {
            if !self.present.contains(&t.from.0) {
                return Err(QuakereelError::planning(format!(
                    "{op:?} reads index {} which does not exist yet",
                    t.from
                )));
            }
            if self.present.contains(&t.to.0) {
                return Err(QuakereelError::planning(format!(
                    "{op:?} overwrites existing index {}",
                    t.to
                )));
            }
            if t.mode == TransferMode::Move {
                self.present.remove(&t.from.0);
            } else {
                self.synthesized += 1;
            }
            self.present.insert(t.to.0);
        }
        Ok(())
    }

    /// Whether `idx` exists.
    pub fn contains(&self, idx: SeqIndex) -> bool {
        self.present.contains(&idx.0)
    }

    /// Number of indices that exist.
    pub fn len(&self) -> u64 {
        self.present.len() as u64
    }

    /// Whether nothing exists.
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Highest existing index.
    pub fn last(&self) -> Option<SeqIndex> {
        self.present.last().copied().map(SeqIndex)
    }

    /// Frames registered through [`IndexCoverage::render`].
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Frames produced by copy transfers.
    pub fn synthesized(&self) -> u64 {
        self.synthesized
    }

    /// Check that exactly `0..total` exists.
    pub fn ensure_contiguous(&self, total: u64) -> QuakereelResult<()> {
        if self.len() != total || self.last().is_some_and(|l| l.0 + 1 != total) {
            let missing = (0..total).find(|i| !self.present.contains(i));
            return Err(QuakereelError::planning(format!(
                "timeline is not contiguous over 0..{total}: {} frames exist, first gap at {:?}",
                self.len(),
                missing
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/coverage.rs"]
mod tests;
