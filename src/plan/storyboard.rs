//! The earthquake animation: fly-in, dip, fade, simulation playback, camera return, hazard
//! reveals, path-network reveal and padding, in that order.

use crate::config::model::{AnimationConfig, PGV_LAYER};
use crate::foundation::core::SeqIndex;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::foundation::math::{Rotation, ZoomCurve};
use crate::plan::job::{Camera, FrameLayer, PrepJob, ViewFocus};
use crate::plan::stage::{
    Afterward, AzimuthPath, CameraPath, LayerRule, Ramp, Stage, StageContext, TiltModel, TiltPath,
    ViewRule,
};
use crate::plan::timeline::{Gate, Timeline, TimelinePlan};

/// Transparency of the slip and ground-motion overlays while shown.
pub const OVERLAY_T: f64 = 40.0;
/// Lowest tilt reached while dipping below the map plane.
pub const TILT_DIP: f64 = 1.0;
/// Padding around the fault outline.
pub const FAULT_ZOOM: f64 = 1.618;
/// Padding around the ground-motion domain and hazard overlays.
pub const GROUND_MOTION_ZOOM: f64 = 1.2;
/// Padding around path networks.
pub const REGION_ZOOM: f64 = 1.5;
/// Fraction of the playback over which the camera sweeps round.
pub const SWEEP_FRACTION: f64 = 0.85;
/// Path-network steps after this many days are held for a third of a minor transition.
pub const LATE_DAY: u32 = 29;

const START_AZIMUTH: f64 = 180.0;
const TOP_DOWN: f64 = 90.0;

const SLIP_SUBTITLE: &str = "Fault Slip Distribution";
const PATHS_SUBTITLE: &str = "Transport Network";

/// Plan the full animation (or still image) for `cfg`.
#[tracing::instrument(skip_all, fields(fps = cfg.framerate, animate = cfg.animate))]
pub fn plan_animation(cfg: &AnimationConfig) -> QuakereelResult<TimelinePlan> {
    cfg.validate()?;
    let fps = cfg.fps();
    let ctx = StageContext {
        next_index: SeqIndex(0),
        camera: Camera {
            azimuth: START_AZIMUTH,
            tilt: TOP_DOWN,
        },
        tilt_model: TiltModel {
            map_tilt: cfg.map_tilt(),
        },
        fixed_rotation: cfg.fixed_rotation,
    };

    if !cfg.animate {
        return plan_still(cfg, ctx);
    }

    let gm = cfg.scene.ground_motion.as_ref();
    let mut tl = Timeline::new(fps, ctx);
    if let Some(gm) = gm {
        tl = tl.with_prep(PrepJob {
            timesteps: gm.timesteps,
        });
    }
    let late_gate = if gm.is_some() {
        Gate::AfterPrep
    } else {
        Gate::Ready
    };

    let t = cfg.minor_frames();
    let pause = cfg.pause_frames();
    let map_tilt = cfg.map_tilt();
    let playback_focus = if gm.is_some() {
        (ViewFocus::GroundMotion, GROUND_MOTION_ZOOM)
    } else {
        (ViewFocus::Fault, FAULT_ZOOM)
    };

    let mut fly_in = Stage::with_frames("fly-in", cfg.transition_frames());
    fly_in.camera = CameraPath {
        azimuth: AzimuthPath::To {
            target: cfg.strike_normal_azimuth(),
            rotation: Rotation::Shorter,
            over: None,
        },
        tilt: TiltPath::To(map_tilt),
    };
    fly_in.scale_t = Ramp::Rise {
        from: 0.0,
        to: 1.0,
        delay: 0,
        frames: t,
    };
    fly_in.transparency = Ramp::Hold(OVERLAY_T);
    fly_in.view = ViewRule::Fixed(ViewFocus::Fault, FAULT_ZOOM);
    fly_in.subtitle = Some(SLIP_SUBTITLE.to_string());
    tl.render_stage(&fly_in, Gate::Ready)?;

    let mut dip = Stage::with_frames("dip", pause);
    dip.camera.tilt = TiltPath::Dip { floor: TILT_DIP };
    dip.transparency = Ramp::Hold(OVERLAY_T);
    dip.view = ViewRule::Fixed(ViewFocus::Fault, FAULT_ZOOM);
    dip.subtitle = fly_in.subtitle.clone();
    dip.after = Afterward::Boomerang { pause };
    tl.render_stage(&dip, Gate::Ready)?;

    let mut fade = Stage::with_frames("fade", t);
    fade.scale_t = Ramp::Linear { from: 1.0, to: 0.0 };
    fade.transparency = Ramp::Linear {
        from: OVERLAY_T,
        to: 100.0,
    };
    fade.view = ViewRule::Fixed(ViewFocus::Fault, FAULT_ZOOM);
    fade.subtitle = fly_in.subtitle.clone();
    tl.render_stage(&fade, Gate::Ready)?;

    let frames_sr = cfg.slip_rate_frames();
    let playback_frames = frames_sr.max(cfg.ground_motion_frames());
    let mut playback = Stage::with_frames("playback", playback_frames);
    playback.camera.azimuth = AzimuthPath::To {
        target: cfg.final_azimuth(),
        rotation: Rotation::Longer,
        over: Some((playback_frames as f64 * SWEEP_FRACTION).floor() as u64),
    };
    let slip_in = Ramp::Rise {
        from: 0.0,
        to: 1.0,
        delay: 0,
        frames: t,
    };
    playback.transparency = Ramp::Hold(OVERLAY_T);
    playback.layer = LayerRule::Playback {
        ground_motion: gm.map(|g| (g.dt, g.timesteps)),
    };
    match gm {
        Some(_) => {
            // frames past the rupture show ground motion only, with the slip scale complete
            playback.scale_t = Ramp::Split {
                at: frames_sr,
                before: Box::new(slip_in),
                after: Box::new(Ramp::Hold(1.0)),
            };
            playback.subtitle = Some("Simulation".to_string());
            playback.scale_x = Ramp::Rise {
                from: 0.0,
                to: 1.0,
                delay: frames_sr,
                frames: t,
            };
            playback.view = ViewRule::Transition {
                from: (ViewFocus::Fault, FAULT_ZOOM),
                to: playback_focus.clone(),
                progress: Ramp::Zoom(ZoomCurve::for_playback(playback_frames, fps.as_f64())),
            };
            tl.render_stage(&playback, Gate::Timestep)?;
        }
        None => {
            playback.scale_t = slip_in;
            playback.subtitle = Some("Cumulative Slip".to_string());
            playback.view = ViewRule::Fixed(ViewFocus::Fault, FAULT_ZOOM);
            tl.render_stage(&playback, Gate::Ready)?;
        }
    }

    let mut ret = Stage::with_frames("return", 4 * t);
    ret.camera = CameraPath {
        azimuth: AzimuthPath::To {
            target: START_AZIMUTH,
            rotation: Rotation::Shorter,
            over: None,
        },
        tilt: TiltPath::To(TOP_DOWN),
    };
    ret.scale_t = Ramp::Settle {
        from: 1.0,
        to: 0.0,
        over: t,
    };
    ret.scale_x = Ramp::Hold(if gm.is_some() { 1.0 } else { 0.0 });
    ret.transparency = Ramp::Settle {
        from: OVERLAY_T,
        to: 100.0,
        over: t,
    };
    ret.layer = LayerRule::Fixed(match gm {
        Some(g) => FrameLayer::GroundMotion {
            sim_time: fps.frames_to_secs(playback_frames.saturating_sub(1)),
            timestep: g.timesteps - 1,
        },
        None => FrameLayer::Slip,
    });
    ret.view = ViewRule::Fixed(playback_focus.0.clone(), playback_focus.1);
    tl.render_stage(&ret, late_gate)?;

    // (overlay, colour-scale label, subtitle)
    let mut layers: Vec<(String, String, String)> = Vec::new();
    if gm.is_some() {
        layers.push((
            PGV_LAYER.to_string(),
            "Peak Ground Velocity (cm/s)".to_string(),
            "PGV".to_string(),
        ));
    }
    layers.extend(
        cfg.scene
            .hazard_layers
            .iter()
            .map(|l| (l.name.clone(), l.label.clone(), l.label.clone())),
    );
    for (name, label, subtitle) in layers {
        let mut reveal = Stage::with_frames(format!("hazard:{name}"), t);
        reveal.scale_t = Ramp::Linear { from: 0.0, to: 1.0 };
        reveal.transparency = Ramp::Linear {
            from: 100.0,
            to: OVERLAY_T,
        };
        reveal.view = ViewRule::Transition {
            from: playback_focus.clone(),
            to: (ViewFocus::Hazard(name.clone()), GROUND_MOTION_ZOOM),
            progress: Ramp::Linear { from: 0.0, to: 1.0 },
        };
        reveal.subtitle = Some(subtitle);
        reveal.layer = LayerRule::Fixed(FrameLayer::Hazard {
            overlay: name,
            label,
        });
        reveal.after = Afterward::Boomerang { pause };
        tl.render_stage(&reveal, late_gate)?;
    }

    if let Some((first, rest)) = cfg.scene.path_network.split_first() {
        let mut reveal = Stage::with_frames("paths", t);
        reveal.scale_t = Ramp::Hold(0.0);
        reveal.transparency = Ramp::Linear {
            from: 100.0,
            to: 0.0,
        };
        reveal.layer = LayerRule::PathReveal {
            file: first.file.clone(),
            proportion: Ramp::Linear { from: 0.0, to: 1.0 },
        };
        reveal.view = ViewRule::Transition {
            from: playback_focus.clone(),
            to: (ViewFocus::PathNetwork, REGION_ZOOM),
            progress: Ramp::Linear { from: 0.0, to: 1.0 },
        };
        reveal.subtitle = Some(PATHS_SUBTITLE.to_string());
        reveal.after = Afterward::Hold(t);
        tl.render_stage(&reveal, Gate::Ready)?;

        let mut hold = t;
        for (k, step) in rest.iter().enumerate() {
            if k + 1 == rest.len() {
                hold = pause;
            } else if step.day > LATE_DAY {
                hold = t / 3;
            }
            hold = hold.max(1);
            let mut frame = Stage::with_frames(format!("paths:day{}", step.day), 1);
            frame.scale_t = Ramp::Hold(0.0);
            frame.transparency = Ramp::Hold(0.0);
            frame.layer = LayerRule::Fixed(FrameLayer::PathNetwork {
                file: step.file.clone(),
                proportion: 1.0,
            });
            frame.view = ViewRule::Fixed(ViewFocus::PathNetwork, REGION_ZOOM);
            frame.subtitle = Some(PATHS_SUBTITLE.to_string());
            frame.after = Afterward::Hold(hold - 1);
            tl.render_stage(&frame, Gate::Ready)?;
        }

        let last = rest.last().unwrap_or(first);
        let mut fade_out = Stage::with_frames("paths:fade", t);
        fade_out.scale_t = Ramp::Hold(0.0);
        fade_out.transparency = Ramp::Linear {
            from: 0.0,
            to: 100.0,
        };
        fade_out.layer = LayerRule::PathReveal {
            file: last.file.clone(),
            proportion: Ramp::Linear { from: 1.0, to: 0.0 },
        };
        fade_out.view = ViewRule::Transition {
            from: (ViewFocus::PathNetwork, REGION_ZOOM),
            to: playback_focus,
            progress: Ramp::Linear { from: 0.0, to: 1.0 },
        };
        fade_out.subtitle = Some(PATHS_SUBTITLE.to_string());
        tl.render_stage(&fade_out, Gate::Ready)?;
    }

    tl.pad(cfg.start_frames(), cfg.end_frames())?;
    tl.finish()
}

fn plan_still(cfg: &AnimationConfig, ctx: StageContext) -> QuakereelResult<TimelinePlan> {
    let mut still = Stage::with_frames("still", 1);
    still.camera = CameraPath {
        azimuth: AzimuthPath::To {
            target: cfg.strike_normal_azimuth(),
            rotation: Rotation::Shorter,
            over: None,
        },
        tilt: TiltPath::To(cfg.map_tilt()),
    };
    still.transparency = Ramp::Hold(OVERLAY_T);
    still.view = ViewRule::Fixed(ViewFocus::Fault, FAULT_ZOOM);
    let out = still.generate(&ctx, cfg.fps())?;
    let params = out
        .frames
        .into_iter()
        .next()
        .ok_or_else(|| QuakereelError::planning("still frame missing"))?;
    tracing::info!("still image planned");
    Ok(TimelinePlan::still(params))
}

#[cfg(test)]
#[path = "../../tests/unit/plan/storyboard.rs"]
mod tests;
