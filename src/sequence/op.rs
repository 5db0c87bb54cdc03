use crate::foundation::core::SeqIndex;
use crate::foundation::error::{QuakereelError, QuakereelResult};

/// A post-render transform over frame files, recorded while planning and executed once all
/// frames exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceOp {
    /// Copy `source` to the `count` indices after it (`count > 0`) or before it (`count < 0`).
    Duplicate {
        /// Frame to repeat.
        source: SeqIndex,
        /// Number of copies; the sign selects the direction.
        count: i64,
    },
    /// Mirror `source..source+length` into a reversed run starting `gap` frames after it.
    ReverseCopy {
        /// First frame of the forward run.
        source: SeqIndex,
        /// Length of the forward run.
        length: u64,
        /// Frames between the forward run and its mirror.
        gap: u64,
    },
    /// Move `source..source+length` by `offset` frames.
    Shift {
        /// First frame of the moved block.
        source: SeqIndex,
        /// Length of the moved block.
        length: u64,
        /// Signed displacement.
        offset: i64,
    },
}

/// How a single file is carried to its new index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// The source file stays in place.
    Copy,
    /// The source file is renamed.
    Move,
}

/// One file-level step of a [`SequenceOp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Index read.
    pub from: SeqIndex,
    /// Index written.
    pub to: SeqIndex,
    /// Copy or move.
    pub mode: TransferMode,
}

impl SequenceOp {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Duplicate { .. } => "duplicate",
            Self::ReverseCopy { .. } => "reverse_copy",
            Self::Shift { .. } => "shift",
        }
    }

    /// Expand the op into file transfers, in the order they must execute.
    ///
    /// Shifts run from the far end of the block first so that no transfer overwrites a source
    /// that has not been read yet.
    pub fn transfers(&self) -> QuakereelResult<Vec<Transfer>> {
        let mut out = Vec::new();
        match *self {
            Self::Duplicate { source, count } => {
                let offsets: Box<dyn Iterator<Item = i64>> = if count >= 0 {
                    Box::new(1..=count)
                } else {
                    Box::new(count..0)
                };
                for d in offsets {
                    out.push(Transfer {
                        from: source,
                        to: displaced(source, d, self)?,
                        mode: TransferMode::Copy,
                    });
                }
            }
            Self::ReverseCopy {
                source,
                length,
                gap,
            } => {
                for i in 0..length {
                    out.push(Transfer {
                        from: source.after(i),
                        to: source.after(2 * length + gap - 1 - i),
                        mode: TransferMode::Copy,
                    });
                }
            }
            Self::Shift {
                source,
                length,
                offset,
            } => {
                if offset == 0 {
                    return Ok(out);
                }
                let indices: Box<dyn Iterator<Item = u64>> = if offset > 0 {
                    Box::new((0..length).rev())
                } else {
                    Box::new(0..length)
                };
                for i in indices {
                    let from = source.after(i);
                    out.push(Transfer {
                        from,
                        to: displaced(from, offset, self)?,
                        mode: TransferMode::Move,
                    });
                }
            }
        }
        Ok(out)
    }
}

fn displaced(idx: SeqIndex, delta: i64, op: &SequenceOp) -> QuakereelResult<SeqIndex> {
    idx.offset(delta).ok_or_else(|| {
        QuakereelError::sequence(format!(
            "{op:?} maps index {idx} by {delta} outside the timeline"
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/op.rs"]
mod tests;
