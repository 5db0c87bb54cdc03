use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::sequence::digest::digest_file;
use crate::sequence::op::{SequenceOp, TransferMode};
use crate::sequence::store::FrameStore;

/// Options for [`SequenceCompiler`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CompileOpts {
    /// Re-read every copied file and compare fingerprints with its source.
    pub verify_copies: bool,
}

/// Counters from one compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Ops executed.
    pub ops: usize,
    /// Files copied.
    pub copies: u64,
    /// Files moved.
    pub moves: u64,
}

/// Executes recorded [`SequenceOp`]s over the rendered frame files.
///
/// Must only run once every render job has completed. Ops run strictly in order, and every
/// transfer is a blocking filesystem call, so later ops see the files earlier ops produced.
pub struct SequenceCompiler<'a> {
    store: &'a FrameStore,
    opts: CompileOpts,
}

impl<'a> SequenceCompiler<'a> {
    /// Compiler writing into `store`.
    pub fn new(store: &'a FrameStore, opts: CompileOpts) -> Self {
        Self { store, opts }
    }

    /// Apply `ops` in order.
    #[tracing::instrument(skip_all, fields(ops = ops.len()))]
    pub fn compile(&self, ops: &[SequenceOp]) -> QuakereelResult<CompileStats> {
        let mut stats = CompileStats::default();
        for (n, op) in ops.iter().enumerate() {
            tracing::debug!(n, op = ?op, "apply sequence op");
            for t in op.transfers()? {
                let from = self.store.frame_path(t.from);
                let to = self.store.frame_path(t.to);
                match t.mode {
                    TransferMode::Copy => {
                        std::fs::copy(&from, &to).map_err(|e| {
                            QuakereelError::sequence(format!(
                                "op #{n} {}: copy '{}' -> '{}': {e}",
                                op.label(),
                                from.display(),
                                to.display()
                            ))
                        })?;
                        if self.opts.verify_copies && digest_file(&from)? != digest_file(&to)? {
                            return Err(QuakereelError::sequence(format!(
                                "op #{n} {}: '{}' differs from its source '{}'",
                                op.label(),
                                to.display(),
                                from.display()
                            )));
                        }
                        stats.copies += 1;
                    }
                    TransferMode::Move => {
                        std::fs::rename(&from, &to).map_err(|e| {
                            QuakereelError::sequence(format!(
                                "op #{n} {}: move '{}' -> '{}': {e}",
                                op.label(),
                                from.display(),
                                to.display()
                            ))
                        })?;
                        stats.moves += 1;
                    }
                }
            }
            stats.ops += 1;
        }
        tracing::info!(
            copies = stats.copies,
            moves = stats.moves,
            "frame sequence compiled"
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/compiler.rs"]
mod tests;
