use crate::foundation::error::{QuakereelError, QuakereelResult};

/// Absolute 0-based position of a frame in the output timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SeqIndex(pub u64);

impl SeqIndex {
    /// Offset this index by a signed number of frames.
    ///
    /// Returns `None` when the result would be negative or overflow.
    pub fn offset(self, delta: i64) -> Option<SeqIndex> {
        if delta >= 0 {
            self.0.checked_add(delta as u64).map(SeqIndex)
        } else {
            self.0.checked_sub(delta.unsigned_abs()).map(SeqIndex)
        }
    }

    /// Index `n` frames after this one.
    pub fn after(self, n: u64) -> SeqIndex {
        SeqIndex(self.0 + n)
    }
}

impl std::fmt::Display for SeqIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> QuakereelResult<Self> {
        if den == 0 {
            return Err(QuakereelError::config("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(QuakereelError::config("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }

    /// Convert seconds to frame count rounding to the nearest frame.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
