use std::path::PathBuf;

use anyhow::Context;

use crate::config::model::GroundMotionSummary;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::render::backend::OverlayPrep;
use crate::sequence::store::FrameStore;

/// Timesteps weaker than this fraction of the ceiling produce no overlay.
pub const ABSENT_FRACTION: f64 = 0.03;

/// Analytic stand-in for a simulated ground-motion grid.
///
/// Amplitude follows a pulse `peak * x * e^(1 - x)` with `x = t * dt / rise_secs`, peaking at
/// `rise_secs`. Each overlay is a grayscale ring expanding from the image centre, scaled by the
/// timestep's amplitude relative to the ceiling.
#[derive(Clone, Debug)]
pub struct SyntheticGroundMotion {
    store: FrameStore,
    timesteps: u32,
    dt: f64,
    peak: f64,
    rise_secs: f64,
    width: u32,
    height: u32,
}

impl SyntheticGroundMotion {
    /// Overlay source for `summary`, writing into `store`'s overlay directory.
    pub fn new(store: FrameStore, summary: &GroundMotionSummary) -> Self {
        let duration = summary.dt * f64::from(summary.timesteps);
        Self {
            store,
            timesteps: summary.timesteps,
            dt: summary.dt,
            peak: 1.0,
            rise_secs: (duration / 10.0).max(summary.dt),
            width: 64,
            height: 64,
        }
    }

    /// Override the peak amplitude.
    pub fn with_peak(mut self, peak: f64) -> Self {
        self.peak = peak;
        self
    }

    /// Override the overlay image size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Amplitude at `timestep`.
    pub fn amplitude(&self, timestep: u32) -> f64 {
        let x = f64::from(timestep) * self.dt / self.rise_secs;
        self.peak * x * (1.0 - x).exp()
    }
}

impl OverlayPrep for SyntheticGroundMotion {
    #[tracing::instrument(skip(self), fields(timesteps = self.timesteps))]
    fn prepare(&self) -> QuakereelResult<f64> {
        let ceiling = (0..self.timesteps)
            .map(|t| self.amplitude(t))
            .fold(0.0f64, f64::max);
        if ceiling <= 0.0 || !ceiling.is_finite() {
            return Err(QuakereelError::render(
                "ground motion never exceeds zero amplitude",
            ));
        }
        Ok(ceiling)
    }

    fn prepare_timestep(&self, ceiling: f64, timestep: u32) -> QuakereelResult<Option<PathBuf>> {
        if timestep >= self.timesteps {
            return Err(QuakereelError::render(format!(
                "timestep {timestep} is outside the grid of {}",
                self.timesteps
            )));
        }
        let amp = self.amplitude(timestep);
        if amp < ABSENT_FRACTION * ceiling {
            return Ok(None);
        }

        let level = (amp / ceiling).clamp(0.0, 1.0);
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let (cx, cy) = (w / 2.0, h / 2.0);
        let max_r = (cx * cx + cy * cy).sqrt();
        let radius = max_r * f64::from(timestep + 1) / f64::from(self.timesteps);
        let spread = (w.min(h) / 8.0).max(1.0);

        let img = image::GrayImage::from_fn(self.width, self.height, |x, y| {
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt() - radius;
            let v = level * (-(d * d) / (2.0 * spread * spread)).exp();
            image::Luma([(v * 255.0).round() as u8])
        });

        let path = self.store.overlay_path(timestep);
        img.save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write overlay '{}'", path.display()))?;
        Ok(Some(path))
    }

    fn timesteps(&self) -> u32 {
        self.timesteps
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
