use std::path::PathBuf;

use crate::foundation::core::SeqIndex;

/// Discriminant of a [`Job`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Global overlay preparation producing the colour-scale ceiling.
    Prep,
    /// One partition of the per-timestep overlay precomputation.
    PrepStep,
    /// One output frame.
    RenderFrame,
}

impl JobKind {
    /// Label used in logs and worker reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Prep => "prep",
            Self::PrepStep => "prep_step",
            Self::RenderFrame => "render_frame",
        }
    }
}

/// What a gated job waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKey {
    /// Released once every prep step has completed.
    AfterPrep,
    /// Released by the prep step whose partition contains this overlay timestep.
    Timestep(u32),
}

/// A unit of work handed to a worker. Immutable once created; consumed exactly once.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Job {
    /// Global overlay preparation.
    Prep(PrepJob),
    /// Overlay precomputation for one partition of timesteps.
    PrepStep(PrepStepJob),
    /// Render one frame.
    RenderFrame(FrameJob),
}

impl Job {
    /// Kind of this job.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Prep(_) => JobKind::Prep,
            Self::PrepStep(_) => JobKind::PrepStep,
            Self::RenderFrame(_) => JobKind::RenderFrame,
        }
    }

    /// Output index for frame jobs; `None` for prep work and still images.
    pub fn sequence_index(&self) -> Option<SeqIndex> {
        match self {
            Self::RenderFrame(f) => f.params.index,
            Self::Prep(_) | Self::PrepStep(_) => None,
        }
    }

    /// Gate this job waits behind, if any.
    pub fn dependency_key(&self) -> Option<DependencyKey> {
        match self {
            Self::RenderFrame(f) => f.dependency,
            Self::Prep(_) | Self::PrepStep(_) => None,
        }
    }
}

/// Global overlay preparation over `timesteps` grid timesteps.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PrepJob {
    /// Timesteps in the ground-motion grid.
    pub timesteps: u32,
}

/// Round-robin slice of timesteps: `start, start + stride, ...` below `timesteps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Partition {
    /// First timestep.
    pub start: u32,
    /// Distance between consecutive timesteps.
    pub stride: u32,
    /// Exclusive upper bound.
    pub timesteps: u32,
}

impl Partition {
    /// Timesteps belonging to this partition.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (self.start..self.timesteps).step_by(self.stride.max(1) as usize)
    }

    /// Whether `timestep` belongs to this partition.
    pub fn contains(self, timestep: u32) -> bool {
        timestep >= self.start
            && timestep < self.timesteps
            && (timestep - self.start) % self.stride.max(1) == 0
    }
}

/// Overlay precomputation for one partition.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PrepStepJob {
    /// Timesteps this job computes.
    pub partition: Partition,
    /// Colour-scale ceiling produced by the prep job.
    pub ceiling: f64,
}

/// Render job for one frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameJob {
    /// Everything the renderer needs.
    pub params: FrameParams,
    /// Gate this frame waits behind.
    pub dependency: Option<DependencyKey>,
}

/// Camera orientation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    /// Compass direction the camera looks towards (degrees).
    pub azimuth: f64,
    /// Elevation above the map plane (degrees, 90 is straight down).
    pub tilt: f64,
}

/// How a requested tilt is realised by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TiltResolution {
    /// Tilt the map is actually projected at.
    pub render_tilt: f64,
    /// Simulated flattening below the minimum renderable tilt (radians), drawn over a sky and
    /// ground backdrop.
    pub virtual_tilt: Option<f64>,
}

/// Area the view is fitted to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewFocus {
    /// Fault plane outline.
    Fault,
    /// Simulation domain.
    GroundMotion,
    /// Extent of a hazard overlay.
    Hazard(String),
    /// Extent of the path network.
    PathNetwork,
}

/// View window, optionally part way through a transition from another window.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewTransition {
    /// Final focus.
    pub focus: ViewFocus,
    /// Padding factor around the final focus.
    pub zoom: f64,
    /// Starting window and progress towards the final one.
    pub from: Option<ViewOrigin>,
}

/// Start of a view transition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewOrigin {
    /// Starting focus.
    pub focus: ViewFocus,
    /// Padding factor around the starting focus.
    pub zoom: f64,
    /// Progress in `[0, 1]` from the origin to the final window.
    pub progress: f64,
}

impl ViewTransition {
    /// Static view.
    pub fn fixed(focus: ViewFocus, zoom: f64) -> Self {
        Self {
            focus,
            zoom,
            from: None,
        }
    }

    /// View part way between `from` and `to`.
    pub fn between(from: (ViewFocus, f64), to: (ViewFocus, f64), progress: f64) -> Self {
        Self {
            focus: to.0,
            zoom: to.1,
            from: Some(ViewOrigin {
                focus: from.0,
                zoom: from.1,
                progress,
            }),
        }
    }
}

/// What is drawn on the map for a frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayer {
    /// Final slip distribution on the fault planes.
    Slip,
    /// Slip rate at a simulation time.
    SlipRate {
        /// Simulation time in seconds.
        sim_time: f64,
    },
    /// Surface ground motion at a simulation time, drawn from a precomputed overlay.
    GroundMotion {
        /// Simulation time in seconds.
        sim_time: f64,
        /// Overlay grid timestep.
        timestep: u32,
    },
    /// Static hazard overlay.
    Hazard {
        /// Overlay name.
        overlay: String,
        /// Colour-scale label.
        label: String,
    },
    /// Proportion of a path-network file.
    PathNetwork {
        /// Path file.
        file: PathBuf,
        /// Fraction of segments drawn.
        proportion: f64,
    },
}

/// Parameters of one rendered frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameParams {
    /// Output index; `None` for a still image.
    pub index: Option<SeqIndex>,
    /// Requested camera.
    pub camera: Camera,
    /// How the requested tilt is rendered.
    pub tilt: TiltResolution,
    /// Fade of the fault and time annotations in `[0, 1]`.
    pub scale_t: f64,
    /// Fade of the ground-motion colour scale in `[0, 1]`.
    pub scale_x: f64,
    /// Overlay transparency in percent (100 is invisible).
    pub transparency: f64,
    /// Content drawn on the map.
    pub layer: FrameLayer,
    /// View window.
    pub view: ViewTransition,
    /// Caption.
    pub subtitle: Option<String>,
    /// Ground-motion colour-scale ceiling, known once overlay preparation has run.
    pub overlay_ceiling: Option<f64>,
}

#[cfg(test)]
#[path = "../../tests/unit/plan/job.rs"]
mod tests;
