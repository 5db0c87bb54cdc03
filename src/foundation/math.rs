//! Angle and progression helpers shared by the stage generators.

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_deg(a: f64) -> f64 {
    let r = a.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

/// Signed smallest rotation in degrees taking `from` to `to`, in `(-180, 180]`.
pub fn angle_diff(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Which way round the compass an azimuth transition travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rotation {
    /// The arc of at most 180 degrees.
    Shorter,
    /// The complementary arc (a full turn when both ends coincide).
    Longer,
}

/// Signed total rotation in degrees from `from` to `to` travelling the requested way.
pub fn sweep(from: f64, to: f64, rotation: Rotation) -> f64 {
    let d = angle_diff(from, to);
    match rotation {
        Rotation::Shorter => d,
        Rotation::Longer => {
            if d < 0.0 {
                d + 360.0
            } else {
                d - 360.0
            }
        }
    }
}

/// Azimuth at progress `p` in `[0, 1]` along a rotation from `from` to `to`.
pub fn lerp_azimuth(from: f64, to: f64, p: f64, rotation: Rotation) -> f64 {
    normalize_deg(from + sweep(from, to, rotation) * p)
}

/// Linear interpolation.
pub fn lerp(a: f64, b: f64, p: f64) -> f64 {
    a + (b - a) * p
}

/// Normalized progress of local frame `i` within a run of `n` frames, first frame 0, last 1.
///
/// A single-frame run sits at its end state.
pub fn progress(i: u64, n: u64) -> f64 {
    if n <= 1 {
        1.0
    } else {
        i as f64 / (n - 1) as f64
    }
}

/// Ease-in ramp that reaches 1 after `frames` frames and holds.
pub fn ramp_in(i: u64, frames: u64) -> f64 {
    if frames == 0 {
        1.0
    } else {
        (i.min(frames) as f64) / frames as f64
    }
}

/// Zoom progression used while playing back the simulation.
///
/// A tanh S-curve over the effective range `tanh(-3..3)`, plus a linear term that closes the gap
/// left by the curve's tails, clamped to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomCurve {
    zfac: f64,
}

impl ZoomCurve {
    /// Seconds after which the zoom has fully settled for long simulations.
    pub const SETTLE_SECS: f64 = 12.5;

    /// Build the curve for a playback of `frames` frames at `fps`.
    pub fn for_playback(frames: u64, fps: f64) -> Self {
        let zfac = if frames as f64 / fps >= Self::SETTLE_SECS {
            Self::SETTLE_SECS * fps * 0.2
        } else {
            frames as f64 * 0.618 * 0.2
        };
        Self {
            zfac: zfac.max(f64::EPSILON),
        }
    }

    /// Progress in `[0, 1]` at playback frame `i`.
    pub fn at(self, i: u64) -> f64 {
        let gap = (0.5 + 0.5 * (-3.0f64).tanh()) / 3.0;
        let x = i as f64 / self.zfac - 3.0;
        (0.5 + 0.5 * x.tanh() + gap * x).min(1.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
