use std::path::{Path, PathBuf};

use crate::foundation::error::QuakereelResult;
use crate::plan::job::FrameParams;

/// Draws one frame to a file.
///
/// Implementations must be deterministic: the same parameters always produce the same bytes, so
/// frames synthesized by sequence ops are indistinguishable from rendered ones. Each call writes
/// exactly `out` and nothing else.
pub trait Renderer: Sync {
    fn render(&self, params: &FrameParams, out: &Path) -> QuakereelResult<()>;
}

/// Precomputes the time-varying ground-motion overlays.
pub trait OverlayPrep: Sync {
    /// Global pass over the whole simulation, returning the colour-scale ceiling.
    fn prepare(&self) -> QuakereelResult<f64>;

    /// Produce the overlay for one timestep.
    ///
    /// `Ok(None)` means the timestep has nothing worth drawing; renderers then draw no overlay.
    fn prepare_timestep(&self, ceiling: f64, timestep: u32) -> QuakereelResult<Option<PathBuf>>;

    /// Timesteps in the ground-motion grid.
    fn timesteps(&self) -> u32;
}
