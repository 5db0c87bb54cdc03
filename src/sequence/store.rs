use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, SeqIndex};
use crate::foundation::error::{QuakereelError, QuakereelResult};

/// Naming scheme for frame and overlay files on the shared filesystem.
///
/// Frames are `{dir}/{stem}_{index}.png` with a zero-padded index; a still image is
/// `{dir}/{stem}.png`. Overlay timesteps live in `{dir}/overlay/ts{timestep:04}.png`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameStore {
    dir: PathBuf,
    stem: String,
    digits: usize,
}

/// Description of the image sequence handed to an external video encoder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct EncoderInput {
    /// printf-style input pattern, for example `frames/quake_%04d.png`.
    pub pattern: String,
    /// Playback frame rate.
    pub fps: Fps,
    /// Number of frames, indices `0..frames`.
    pub frames: u64,
}

impl FrameStore {
    /// Store rooted at `dir` with four-digit indices.
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            digits: 4,
        }
    }

    /// Override the index padding width.
    pub fn with_digits(mut self, digits: usize) -> Self {
        self.digits = digits.max(1);
        self
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the frame and overlay directories.
    pub fn ensure_dirs(&self) -> QuakereelResult<()> {
        std::fs::create_dir_all(self.overlay_dir())?;
        Ok(())
    }

    /// Path of the frame at `idx`.
    pub fn frame_path(&self, idx: SeqIndex) -> PathBuf {
        self.dir.join(format!(
            "{}_{:0width$}.png",
            self.stem,
            idx.0,
            width = self.digits
        ))
    }

    /// Path of the single still image.
    pub fn still_path(&self) -> PathBuf {
        self.dir.join(format!("{}.png", self.stem))
    }

    /// Frame path for an optional index; `None` is the still image.
    pub fn path_for(&self, idx: Option<SeqIndex>) -> PathBuf {
        match idx {
            Some(idx) => self.frame_path(idx),
            None => self.still_path(),
        }
    }

    /// Directory holding precomputed overlays.
    pub fn overlay_dir(&self) -> PathBuf {
        self.dir.join("overlay")
    }

    /// Path of the overlay for a ground-motion timestep.
    pub fn overlay_path(&self, timestep: u32) -> PathBuf {
        self.overlay_dir().join(format!("ts{timestep:04}.png"))
    }

    /// Check the encoder contract: exactly the indices `0..total` exist.
    pub fn verify_contiguous(&self, total: u64) -> QuakereelResult<()> {
        for i in 0..total {
            let p = self.frame_path(SeqIndex(i));
            if !p.is_file() {
                return Err(QuakereelError::sequence(format!(
                    "frame sequence has a gap: '{}' is missing",
                    p.display()
                )));
            }
        }
        let beyond = self.frame_path(SeqIndex(total));
        if beyond.exists() {
            return Err(QuakereelError::sequence(format!(
                "frame sequence continues past {total}: '{}' exists",
                beyond.display()
            )));
        }
        Ok(())
    }

    /// Encoder input for `frames` frames played at `fps`.
    pub fn encoder_input(&self, fps: Fps, frames: u64) -> EncoderInput {
        EncoderInput {
            pattern: self
                .dir
                .join(format!("{}_%0{}d.png", self.stem, self.digits))
                .to_string_lossy()
                .into_owned(),
            fps,
            frames,
        }
    }
}
