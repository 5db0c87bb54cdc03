use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::core::Fps;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::foundation::math::{angle_diff, normalize_deg};

/// Lowest frame rate the planner accepts.
pub const MIN_FRAMERATE: u32 = 5;
/// Flattest tilt (degrees from horizontal) the map is ever rendered at.
pub const MAP_TILT_LOWER: f64 = 20.0;
/// Steepest resting tilt of the map.
pub const MAP_TILT_UPPER: f64 = 40.0;

/// Animation configuration: timing knobs plus a summary of the pre-parsed scene.
///
/// This is the JSON-facing, human-edited input. Geometry and grid files are parsed elsewhere; only
/// the facts the timeline needs are carried here.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationConfig {
    /// Output frame rate (frames per second).
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    /// Major camera transition time in seconds.
    #[serde(default = "default_transition_secs")]
    pub transition_secs: f64,
    /// Minor transition time (fades, ramps) in seconds.
    #[serde(default = "default_minor_transition_secs")]
    pub minor_transition_secs: f64,
    /// Length of a pause in seconds.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: f64,
    /// Hold on the first frame before the animation starts, in seconds.
    #[serde(default = "default_start_delay_secs")]
    pub start_delay_secs: f64,
    /// Hold on the last frame after the animation ends, in seconds.
    #[serde(default = "default_end_delay_secs")]
    pub end_delay_secs: f64,
    /// Fixed camera rotation (north degrees). Overrides every planned azimuth when set.
    #[serde(default)]
    pub fixed_rotation: Option<f64>,
    /// Plan a full animation (`true`) or a single still frame (`false`).
    #[serde(default = "default_animate")]
    pub animate: bool,
    /// Scene facts extracted from the rupture and simulation inputs.
    pub scene: SceneSummary,
}

/// Facts about the rupture and its optional hazard products.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneSummary {
    /// Length-weighted average strike of the fault planes (degrees).
    pub strike: f64,
    /// Dip of the first fault plane (degrees).
    pub dip: f64,
    /// Time until the last subfault stops slipping (seconds).
    pub rupture_secs: f64,
    /// Slip-rate time step of the rupture model (seconds).
    pub slip_dt: f64,
    /// Simulated surface ground motion, if any.
    #[serde(default)]
    pub ground_motion: Option<GroundMotionSummary>,
    /// Additional hazard overlays, revealed in order after peak ground velocity.
    #[serde(default)]
    pub hazard_layers: Vec<HazardLayer>,
    /// Path-network snapshots (for example road status by day), revealed in order.
    #[serde(default)]
    pub path_network: Vec<PathStep>,
}

/// Shape of the time-varying surface ground-motion grid.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundMotionSummary {
    /// Number of grid timesteps.
    pub timesteps: u32,
    /// Seconds between grid timesteps.
    pub dt: f64,
    /// Stop playing back ground motion after this many seconds.
    #[serde(default)]
    pub cutoff_secs: Option<f64>,
    /// Bearing of the simulation domain's long axis (degrees), used for the final camera azimuth.
    pub long_axis_bearing: f64,
}

/// One hazard overlay revealed with a fade in, pause and reversed fade out.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HazardLayer {
    /// Overlay name, also the overlay file stem.
    pub name: String,
    /// Colour-scale label.
    pub label: String,
}

/// One path-network snapshot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathStep {
    /// Path file drawn for this snapshot.
    pub file: PathBuf,
    /// Days since the event; snapshots later than a month are held briefly.
    pub day: u32,
}

fn default_framerate() -> u32 {
    30
}
fn default_transition_secs() -> f64 {
    6.0
}
fn default_minor_transition_secs() -> f64 {
    0.5
}
fn default_pause_secs() -> f64 {
    5.0
}
fn default_start_delay_secs() -> f64 {
    1.5
}
fn default_end_delay_secs() -> f64 {
    3.0
}
fn default_animate() -> bool {
    true
}

impl AnimationConfig {
    /// Configuration with default timing for a scene.
    pub fn with_scene(scene: SceneSummary) -> Self {
        Self {
            framerate: default_framerate(),
            transition_secs: default_transition_secs(),
            minor_transition_secs: default_minor_transition_secs(),
            pause_secs: default_pause_secs(),
            start_delay_secs: default_start_delay_secs(),
            end_delay_secs: default_end_delay_secs(),
            fixed_rotation: None,
            animate: default_animate(),
            scene,
        }
    }

    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> QuakereelResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| QuakereelError::config(format!("parse animation config JSON: {e}")))
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> QuakereelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            QuakereelError::config(format!("open animation config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validate structural constraints. Fails fast on the first violation.
    pub fn validate(&self) -> QuakereelResult<()> {
        if self.framerate < MIN_FRAMERATE {
            return Err(QuakereelError::config(format!(
                "framerate too low: {} (minimum {MIN_FRAMERATE})",
                self.framerate
            )));
        }
        positive("transition_secs", self.transition_secs)?;
        positive("minor_transition_secs", self.minor_transition_secs)?;
        positive("pause_secs", self.pause_secs)?;
        non_negative("start_delay_secs", self.start_delay_secs)?;
        non_negative("end_delay_secs", self.end_delay_secs)?;
        if self.minor_transition_secs > self.transition_secs {
            return Err(QuakereelError::config(
                "minor_transition_secs must not exceed transition_secs",
            ));
        }
        if let Some(rot) = self.fixed_rotation
            && !rot.is_finite()
        {
            return Err(QuakereelError::config("fixed_rotation must be finite"));
        }
        self.scene.validate()
    }

    /// Check that every input file the plan references exists.
    pub fn verify_inputs(&self) -> QuakereelResult<()> {
        for step in &self.scene.path_network {
            if !step.file.is_file() {
                return Err(QuakereelError::config(format!(
                    "could not find path network file: {}",
                    step.file.display()
                )));
            }
        }
        Ok(())
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        Fps {
            num: self.framerate,
            den: 1,
        }
    }

    /// Resting map tilt derived from the fault dip.
    pub fn map_tilt(&self) -> f64 {
        (90.0 - self.scene.dip).clamp(MAP_TILT_LOWER, MAP_TILT_UPPER)
    }

    /// Camera azimuth facing the fault plane.
    pub fn strike_normal_azimuth(&self) -> f64 {
        normalize_deg(self.scene.strike + 90.0)
    }

    /// Camera azimuth the simulation playback settles on.
    ///
    /// Looks across the long axis of the ground-motion domain, from the same side as the
    /// strike-normal view. Defaults to south when there is no ground motion.
    pub fn final_azimuth(&self) -> f64 {
        let Some(gm) = self.scene.ground_motion.as_ref() else {
            return 180.0;
        };
        let bearing = gm.long_axis_bearing;
        if angle_diff(self.strike_normal_azimuth(), bearing).abs() > 90.0 {
            normalize_deg(bearing + 180.0)
        } else {
            normalize_deg(bearing)
        }
    }

    /// Frames in a major transition.
    pub fn transition_frames(&self) -> u64 {
        self.fps().secs_to_frames_floor(self.transition_secs)
    }

    /// Frames in a minor transition.
    pub fn minor_frames(&self) -> u64 {
        self.fps().secs_to_frames_floor(self.minor_transition_secs)
    }

    /// Frames in a pause.
    pub fn pause_frames(&self) -> u64 {
        self.fps().secs_to_frames_round(self.pause_secs)
    }

    /// Frames held at the start of the movie.
    pub fn start_frames(&self) -> u64 {
        self.fps().secs_to_frames_floor(self.start_delay_secs)
    }

    /// Frames held at the end of the movie.
    pub fn end_frames(&self) -> u64 {
        self.fps().secs_to_frames_floor(self.end_delay_secs)
    }

    /// Frames showing slip rates, covering the whole rupture.
    ///
    /// The slip-rate step is decimated so that no more than one step advances per frame, then the
    /// rupture time is rounded up to whole decimated steps.
    pub fn slip_rate_frames(&self) -> u64 {
        let fps = self.fps().as_f64();
        let dt = self.scene.slip_dt;
        let decimation = (1.0 / (dt * fps)).floor().max(1.0);
        let ddt = decimation * dt;
        let steps = (self.scene.rupture_secs / ddt).ceil();
        self.fps().secs_to_frames_floor(steps * ddt)
    }

    /// Frames of ground-motion playback, zero without ground motion.
    pub fn ground_motion_frames(&self) -> u64 {
        let Some(gm) = self.scene.ground_motion.as_ref() else {
            return 0;
        };
        let fps = self.fps();
        let frames = fps.secs_to_frames_floor(gm.dt * (f64::from(gm.timesteps) - 0.6));
        match gm.cutoff_secs {
            Some(cut) => frames.min(fps.secs_to_frames_floor(cut)),
            None => frames,
        }
    }
}

impl SceneSummary {
    fn validate(&self) -> QuakereelResult<()> {
        finite("scene.strike", self.strike)?;
        finite("scene.dip", self.dip)?;
        if !(0.0..=90.0).contains(&self.dip) {
            return Err(QuakereelError::config(format!(
                "scene.dip must be within [0, 90], got {}",
                self.dip
            )));
        }
        positive("scene.rupture_secs", self.rupture_secs)?;
        positive("scene.slip_dt", self.slip_dt)?;

        if let Some(gm) = self.ground_motion.as_ref() {
            if gm.timesteps == 0 {
                return Err(QuakereelError::config(
                    "scene.ground_motion.timesteps must be > 0",
                ));
            }
            positive("scene.ground_motion.dt", gm.dt)?;
            finite(
                "scene.ground_motion.long_axis_bearing",
                gm.long_axis_bearing,
            )?;
            if let Some(cut) = gm.cutoff_secs {
                positive("scene.ground_motion.cutoff_secs", cut)?;
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for layer in &self.hazard_layers {
            if layer.name.trim().is_empty() {
                return Err(QuakereelError::config("hazard layer name must be non-empty"));
            }
            if layer.name == PGV_LAYER || !seen.insert(layer.name.as_str()) {
                return Err(QuakereelError::config(format!(
                    "duplicate hazard layer '{}'",
                    layer.name
                )));
            }
        }
        Ok(())
    }
}

/// Overlay name of the peak ground velocity layer derived from ground motion.
pub const PGV_LAYER: &str = "pgv";

fn finite(name: &str, v: f64) -> QuakereelResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(QuakereelError::config(format!("{name} must be finite")))
    }
}

fn positive(name: &str, v: f64) -> QuakereelResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(QuakereelError::config(format!(
            "{name} must be positive, got {v}"
        )))
    }
}

fn non_negative(name: &str, v: f64) -> QuakereelResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(QuakereelError::config(format!(
            "{name} must be non-negative, got {v}"
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
