use std::path::PathBuf;

use crate::foundation::core::{Fps, SeqIndex};
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::foundation::math::{
    Rotation, ZoomCurve, lerp, lerp_azimuth, normalize_deg, progress, ramp_in,
};
use crate::plan::job::{Camera, FrameLayer, FrameParams, TiltResolution, ViewFocus, ViewTransition};
use crate::sequence::op::SequenceOp;

/// Scalar progression over the frames of a stage.
#[derive(Clone, Debug, PartialEq)]
pub enum Ramp {
    /// Constant value.
    Hold(f64),
    /// `from` on the first frame, `to` on the last.
    Linear { from: f64, to: f64 },
    /// `from` until `delay`, then reaches `to` after `frames` more frames and holds.
    Rise {
        from: f64,
        to: f64,
        delay: u64,
        frames: u64,
    },
    /// `from` on the first frame, `to` from frame `over - 1` on.
    Settle { from: f64, to: f64, over: u64 },
    /// `before` for frames `0..at`, `after` from `at` on, both sampled with the stage's frame.
    Split {
        at: u64,
        before: Box<Ramp>,
        after: Box<Ramp>,
    },
    /// Playback zoom progression.
    Zoom(ZoomCurve),
}

impl Ramp {
    /// Value at local frame `i` of `n`.
    pub fn at(&self, i: u64, n: u64) -> f64 {
        match self {
            Self::Hold(v) => *v,
            Self::Linear { from, to } => lerp(*from, *to, progress(i, n)),
            Self::Rise {
                from,
                to,
                delay,
                frames,
            } => match i.checked_sub(*delay) {
                Some(k) => lerp(*from, *to, ramp_in(k, *frames)),
                None => *from,
            },
            Self::Settle { from, to, over } => {
                lerp(*from, *to, progress(i.min(over.saturating_sub(1)), *over))
            }
            Self::Split { at, before, after } => {
                if i < *at {
                    before.at(i, n)
                } else {
                    after.at(i, n)
                }
            }
            Self::Zoom(curve) => curve.at(i),
        }
    }
}

/// Azimuth behaviour of a stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AzimuthPath {
    /// Keep the incoming azimuth.
    Hold,
    /// Rotate towards `target`, arriving after `over` frames (the whole stage when `None`).
    To {
        target: f64,
        rotation: Rotation,
        over: Option<u64>,
    },
}

/// Tilt behaviour of a stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TiltPath {
    /// Keep the incoming tilt.
    Hold,
    /// Linear move from the incoming tilt to `target`, arriving on the last frame.
    To(f64),
    /// Sink below the map plane down to `floor` degrees, sampled on a sine.
    ///
    /// The stage is expected to be played back in reverse afterwards, so the camera leaving the
    /// stage is the incoming one.
    Dip { floor: f64 },
}

/// Camera motion of a stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPath {
    pub azimuth: AzimuthPath,
    pub tilt: TiltPath,
}

impl CameraPath {
    /// Camera that does not move.
    pub fn hold() -> Self {
        Self {
            azimuth: AzimuthPath::Hold,
            tilt: TiltPath::Hold,
        }
    }

    fn at(&self, start: Camera, map_tilt: f64, i: u64, n: u64) -> Camera {
        let azimuth = match self.azimuth {
            AzimuthPath::Hold => start.azimuth,
            AzimuthPath::To {
                target,
                rotation,
                over,
            } => {
                let span = over.unwrap_or(n);
                let p = progress(i.min(span.saturating_sub(1)), span);
                lerp_azimuth(start.azimuth, target, p, rotation)
            }
        };
        let tilt = match self.tilt {
            TiltPath::Hold => start.tilt,
            TiltPath::To(target) => lerp(start.tilt, target, progress(i, n)),
            TiltPath::Dip { floor } => {
                let deg = 90.0 - (90.0 - floor) * (i + 1) as f64 / n as f64;
                deg.to_radians().sin() * map_tilt
            }
        };
        Camera { azimuth, tilt }
    }

    fn end(&self, start: Camera, map_tilt: f64, n: u64) -> Camera {
        match self.tilt {
            TiltPath::Dip { .. } => start,
            _ => self.at(start, map_tilt, n.saturating_sub(1), n),
        }
    }
}

/// Maps a requested tilt onto what the renderer can project.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiltModel {
    /// Lowest tilt the map is projected at.
    pub map_tilt: f64,
}

impl TiltModel {
    /// Resolve `tilt`; anything below `map_tilt` becomes a virtual tilt over a backdrop.
    pub fn resolve(self, tilt: f64) -> TiltResolution {
        if tilt < self.map_tilt {
            TiltResolution {
                render_tilt: self.map_tilt,
                virtual_tilt: Some((tilt / self.map_tilt).clamp(-1.0, 1.0).asin()),
            }
        } else {
            TiltResolution {
                render_tilt: tilt,
                virtual_tilt: None,
            }
        }
    }
}

/// Layer content per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerRule {
    /// Same layer on every frame.
    Fixed(FrameLayer),
    /// Simulation playback at one simulated second per output second.
    Playback {
        /// Ground-motion grid `(dt, timesteps)`; slip rates only when absent.
        ground_motion: Option<(f64, u32)>,
    },
    /// Progressive reveal of a path file.
    PathReveal { file: PathBuf, proportion: Ramp },
}

impl LayerRule {
    fn at(&self, fps: Fps, i: u64, n: u64) -> FrameLayer {
        match self {
            Self::Fixed(layer) => layer.clone(),
            Self::Playback { ground_motion } => {
                let sim_time = fps.frames_to_secs(i);
                match *ground_motion {
                    Some((dt, nt)) => FrameLayer::GroundMotion {
                        sim_time,
                        timestep: timestep_at(sim_time, dt, nt),
                    },
                    None => FrameLayer::SlipRate { sim_time },
                }
            }
            Self::PathReveal { file, proportion } => FrameLayer::PathNetwork {
                file: file.clone(),
                proportion: proportion.at(i, n),
            },
        }
    }
}

/// Grid timestep shown at `sim_time`, clamped into `0..nt`.
pub fn timestep_at(sim_time: f64, dt: f64, nt: u32) -> u32 {
    let x = (sim_time / dt).round();
    let last = nt.saturating_sub(1);
    if x <= 0.0 {
        0
    } else if x >= f64::from(last) {
        last
    } else {
        x as u32
    }
}

/// View window per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewRule {
    Fixed(ViewFocus, f64),
    Transition {
        from: (ViewFocus, f64),
        to: (ViewFocus, f64),
        progress: Ramp,
    },
}

impl ViewRule {
    fn at(&self, i: u64, n: u64) -> ViewTransition {
        match self {
            Self::Fixed(focus, zoom) => ViewTransition::fixed(focus.clone(), *zoom),
            Self::Transition { from, to, progress } => {
                ViewTransition::between(from.clone(), to.clone(), progress.at(i, n))
            }
        }
    }
}

/// What follows the rendered frames of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Afterward {
    /// Nothing.
    None,
    /// Hold the last frame for this many extra frames.
    Hold(u64),
    /// Hold the last frame for `pause` frames, then play the stage back in reverse.
    Boomerang { pause: u64 },
}

impl Afterward {
    /// Ops for a stage of `frames` frames rendered from `start`, plus the frames they add.
    pub fn ops(self, start: SeqIndex, frames: u64) -> (Vec<SequenceOp>, u64) {
        let last = start.after(frames - 1);
        match self {
            Self::None | Self::Hold(0) => (Vec::new(), 0),
            Self::Hold(n) => (
                vec![SequenceOp::Duplicate {
                    source: last,
                    count: n as i64,
                }],
                n,
            ),
            Self::Boomerang { pause } => {
                let mut ops = Vec::with_capacity(2);
                if pause > 0 {
                    ops.push(SequenceOp::Duplicate {
                        source: last,
                        count: pause as i64,
                    });
                }
                ops.push(SequenceOp::ReverseCopy {
                    source: start,
                    length: frames,
                    gap: pause,
                });
                (ops, pause + frames)
            }
        }
    }
}

/// Declarative description of one animation stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub name: String,
    pub frames: u64,
    pub camera: CameraPath,
    pub scale_t: Ramp,
    pub scale_x: Ramp,
    pub transparency: Ramp,
    pub layer: LayerRule,
    pub view: ViewRule,
    pub subtitle: Option<String>,
    pub after: Afterward,
}

/// Immutable planning state threaded from one stage to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageContext {
    /// First free sequence index.
    pub next_index: SeqIndex,
    /// Camera at the end of the previous stage.
    pub camera: Camera,
    pub tilt_model: TiltModel,
    /// Camera pinned to look towards `rotation + 180`, overriding every azimuth path.
    pub fixed_rotation: Option<f64>,
}

/// Frames and ops produced by one stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageOutput {
    pub frames: Vec<FrameParams>,
    pub ops: Vec<SequenceOp>,
    pub next: StageContext,
}

impl Stage {
    /// Stage of `floor(secs * fps)` frames with everything else at rest.
    pub fn timed(name: impl Into<String>, secs: f64, fps: Fps) -> Self {
        Self::with_frames(name, fps.secs_to_frames_floor(secs))
    }

    /// Stage of exactly `frames` frames with everything else at rest.
    pub fn with_frames(name: impl Into<String>, frames: u64) -> Self {
        Self {
            name: name.into(),
            frames,
            camera: CameraPath::hold(),
            scale_t: Ramp::Hold(1.0),
            scale_x: Ramp::Hold(0.0),
            transparency: Ramp::Hold(0.0),
            layer: LayerRule::Fixed(FrameLayer::Slip),
            view: ViewRule::Fixed(ViewFocus::Fault, 1.0),
            subtitle: None,
            after: Afterward::None,
        }
    }

    /// Emit this stage's frames starting from `ctx`.
    pub fn generate(&self, ctx: &StageContext, fps: Fps) -> QuakereelResult<StageOutput> {
        let n = self.frames;
        if n == 0 {
            return Err(QuakereelError::config(format!(
                "stage '{}' is shorter than one frame at {} fps",
                self.name,
                fps.as_f64()
            )));
        }
        let map_tilt = ctx.tilt_model.map_tilt;
        let pinned = ctx.fixed_rotation.map(|r| normalize_deg(r + 180.0));

        let frames = (0..n)
            .map(|i| {
                let mut camera = self.camera.at(ctx.camera, map_tilt, i, n);
                if let Some(az) = pinned {
                    camera.azimuth = az;
                }
                FrameParams {
                    index: Some(ctx.next_index.after(i)),
                    camera,
                    tilt: ctx.tilt_model.resolve(camera.tilt),
                    scale_t: self.scale_t.at(i, n),
                    scale_x: self.scale_x.at(i, n),
                    transparency: self.transparency.at(i, n),
                    layer: self.layer.at(fps, i, n),
                    view: self.view.at(i, n),
                    subtitle: self.subtitle.clone(),
                    overlay_ceiling: None,
                }
            })
            .collect();

        let (ops, extra) = self.after.ops(ctx.next_index, n);
        let mut camera = self.camera.end(ctx.camera, map_tilt, n);
        if matches!(self.after, Afterward::Boomerang { .. }) {
            camera = ctx.camera;
        }
        if let Some(az) = pinned {
            camera.azimuth = az;
        }

        Ok(StageOutput {
            frames,
            ops,
            next: StageContext {
                next_index: ctx.next_index.after(n + extra),
                camera,
                ..*ctx
            },
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plan/stage.rs"]
mod tests;
