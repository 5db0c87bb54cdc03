use std::collections::BTreeSet;

use super::*;
use crate::config::model::{GroundMotionSummary, HazardLayer, PathStep, SceneSummary};
use crate::foundation::error::QuakereelError;
use crate::plan::job::{DependencyKey, FrameParams, Job, JobKind};
use crate::sequence::coverage::IndexCoverage;
use crate::sequence::op::SequenceOp;

fn config() -> AnimationConfig {
    let mut cfg = AnimationConfig::with_scene(SceneSummary {
        strike: 40.0,
        dip: 60.0,
        rupture_secs: 3.0,
        slip_dt: 0.25,
        ground_motion: None,
        hazard_layers: vec![],
        path_network: vec![],
    });
    cfg.framerate = 10;
    cfg.transition_secs = 2.0;
    cfg.minor_transition_secs = 0.5;
    cfg.pause_secs = 1.0;
    cfg.start_delay_secs = 0.5;
    cfg.end_delay_secs = 0.3;
    cfg
}

fn with_ground_motion(mut cfg: AnimationConfig) -> AnimationConfig {
    cfg.scene.ground_motion = Some(GroundMotionSummary {
        timesteps: 20,
        dt: 0.2,
        cutoff_secs: None,
        long_axis_bearing: 0.0,
    });
    cfg
}

fn all_frame_indices(plan: &TimelinePlan) -> Vec<SeqIndex> {
    let mut out: Vec<SeqIndex> = plan.ready.iter().filter_map(Job::sequence_index).collect();
    out.extend(plan.gated.after_prep.iter().filter_map(|j| j.params.index));
    for jobs in plan.gated.by_timestep.values() {
        out.extend(jobs.iter().filter_map(|j| j.params.index));
    }
    out
}

fn assert_sound(plan: &TimelinePlan) {
    let indices = all_frame_indices(plan);
    let distinct: BTreeSet<_> = indices.iter().copied().collect();
    assert_eq!(distinct.len(), indices.len(), "render indices must be distinct");

    let mut cov = IndexCoverage::new();
    for idx in indices {
        cov.render(idx).unwrap();
    }
    for op in &plan.ops {
        cov.apply(op).unwrap();
    }
    cov.ensure_contiguous(plan.total_frames).unwrap();
}

#[test]
fn slip_only_animation_has_expected_length() {
    let plan = plan_animation(&config()).unwrap();
    // fly-in 20, dip 10 + 10 + 10, fade 5, playback 30, return 20, end 3, start 5
    assert_eq!(plan.total_frames, 113);
    assert_eq!(plan.rendered_frames, 85);
    assert_eq!(plan.prep, None);
    assert!(plan.gated.is_empty());
    assert_sound(&plan);
}

#[test]
fn dip_is_mirrored_around_a_pause() {
    let plan = plan_animation(&config()).unwrap();
    assert_eq!(
        &plan.ops[..2],
        &[
            SequenceOp::Duplicate {
                source: SeqIndex(29),
                count: 10
            },
            SequenceOp::ReverseCopy {
                source: SeqIndex(20),
                length: 10,
                gap: 10
            },
        ]
    );
    let first_fade = plan
        .ready
        .iter()
        .find_map(|j| j.sequence_index().filter(|i| i.0 >= 30));
    assert_eq!(first_fade, Some(SeqIndex(50)));
}

#[test]
fn padding_ops_come_last() {
    let plan = plan_animation(&config()).unwrap();
    let n = plan.ops.len();
    assert_eq!(
        &plan.ops[n - 3..],
        &[
            SequenceOp::Duplicate {
                source: SeqIndex(104),
                count: 3
            },
            SequenceOp::Shift {
                source: SeqIndex(0),
                length: 108,
                offset: 5
            },
            SequenceOp::Duplicate {
                source: SeqIndex(5),
                count: -5
            },
        ]
    );
}

#[test]
fn ground_motion_gates_playback_and_late_stages() {
    let cfg = with_ground_motion(config());
    let plan = plan_animation(&cfg).unwrap();
    assert_eq!(plan.ready[0].kind(), JobKind::Prep);
    assert_eq!(plan.prep.map(|p| p.timesteps), Some(20));
    assert_eq!(plan.timesteps, 20);

    let by_timestep: usize = plan.gated.by_timestep.values().map(Vec::len).sum();
    assert_eq!(by_timestep as u64, cfg.ground_motion_frames().max(cfg.slip_rate_frames()));
    assert!(plan.gated.by_timestep.keys().all(|&t| t < 20));
    // return (20) plus the pgv reveal (5)
    assert_eq!(plan.gated.after_prep.len(), 25);
    assert!(plan
        .gated
        .after_prep
        .iter()
        .all(|j| j.dependency == Some(DependencyKey::AfterPrep)));
    assert!(plan.ready[1..]
        .iter()
        .all(|j| j.kind() == JobKind::RenderFrame && j.dependency_key().is_none()));
    assert_sound(&plan);
}

#[test]
fn hazard_layers_follow_pgv_in_order() {
    let mut cfg = with_ground_motion(config());
    cfg.scene.hazard_layers = vec![
        HazardLayer {
            name: "liquefaction_s".into(),
            label: "Susceptibility".into(),
        },
        HazardLayer {
            name: "landslide_p".into(),
            label: "Probability".into(),
        },
    ];
    let plan = plan_animation(&cfg).unwrap();
    let order: Vec<String> = plan
        .gated
        .after_prep
        .iter()
        .filter_map(|j| match &j.params.layer {
            FrameLayer::Hazard { overlay, .. } => Some(overlay.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .chunks(5)
        .map(|c| c[0].clone())
        .collect();
    assert_eq!(order, vec!["pgv", "liquefaction_s", "landslide_p"]);
    assert_sound(&plan);
}

#[test]
fn path_network_holds_follow_day_rules() {
    let mut cfg = config();
    cfg.scene.path_network = vec![
        PathStep {
            file: "roads/day1.gmt".into(),
            day: 1,
        },
        PathStep {
            file: "roads/day40.gmt".into(),
            day: 40,
        },
        PathStep {
            file: "roads/day60.gmt".into(),
            day: 60,
        },
    ];
    let plan = plan_animation(&cfg).unwrap();
    // 26 path frames on top of the slip-only timeline
    assert_eq!(plan.total_frames, 139);
    assert!(plan.ops.contains(&SequenceOp::Duplicate {
        source: SeqIndex(109),
        count: 5
    }));
    // day 40 is held for t / 3 = 1 frame: nothing to duplicate
    assert!(plan.ops.contains(&SequenceOp::Duplicate {
        source: SeqIndex(116),
        count: 9
    }));
    assert_sound(&plan);
}

#[test]
fn fixed_rotation_applies_to_every_frame() {
    let mut cfg = config();
    cfg.fixed_rotation = Some(10.0);
    let plan = plan_animation(&cfg).unwrap();
    for job in &plan.ready {
        if let Job::RenderFrame(f) = job {
            assert_eq!(f.params.camera.azimuth, 190.0);
        }
    }
}

#[test]
fn dipped_frames_are_rendered_with_virtual_tilt() {
    let plan = plan_animation(&config()).unwrap();
    let dip: Vec<_> = plan
        .ready
        .iter()
        .filter_map(|j| match j {
            Job::RenderFrame(f) if (20..30).contains(&f.params.index.map_or(0, |i| i.0)) => {
                Some(f.params.tilt)
            }
            _ => None,
        })
        .collect();
    assert_eq!(dip.len(), 10);
    assert!(dip.iter().all(|t| t.render_tilt == 30.0 && t.virtual_tilt.is_some()));
}

#[test]
fn minor_transition_below_one_frame_is_fatal() {
    let mut cfg = config();
    cfg.minor_transition_secs = 0.05;
    let err = plan_animation(&cfg).unwrap_err();
    assert!(matches!(err, QuakereelError::Config(_)));
}

#[test]
fn still_mode_plans_one_unindexed_frame() {
    let mut cfg = with_ground_motion(config());
    cfg.animate = false;
    let plan = plan_animation(&cfg).unwrap();
    assert!(plan.is_still());
    assert_eq!(plan.ready.len(), 1);
    assert_eq!(plan.ready[0].sequence_index(), None);
    assert!(plan.ops.is_empty());
    assert!(plan.gated.is_empty());
    assert_eq!(plan.prep, None);
}

#[test]
fn planning_is_deterministic() {
    let cfg = with_ground_motion(config());
    assert_eq!(plan_animation(&cfg).unwrap(), plan_animation(&cfg).unwrap());
}

fn all_frames(plan: &TimelinePlan) -> Vec<FrameParams> {
    let mut out: Vec<FrameParams> = plan
        .ready
        .iter()
        .filter_map(|j| match j {
            Job::RenderFrame(f) => Some(f.params.clone()),
            _ => None,
        })
        .collect();
    out.extend(plan.gated.after_prep.iter().map(|f| f.params.clone()));
    for jobs in plan.gated.by_timestep.values() {
        out.extend(jobs.iter().map(|f| f.params.clone()));
    }
    out.sort_by_key(|p| p.index);
    out
}

fn frame(frames: &[FrameParams], idx: u64) -> &FrameParams {
    frames
        .iter()
        .find(|p| p.index == Some(SeqIndex(idx)))
        .unwrap_or_else(|| panic!("frame {idx} not planned"))
}

fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len(), "{got:?} vs {want:?}");
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-9, "{got:?} vs {want:?}");
    }
}

#[test]
fn slip_fades_in_during_playback_and_out_on_return() {
    let plan = plan_animation(&config()).unwrap();
    let frames = all_frames(&plan);

    // playback renders 55..85
    let scale: Vec<f64> = (55..61).map(|i| frame(&frames, i).scale_t).collect();
    assert_close(&scale, &[0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
    assert_eq!(frame(&frames, 84).scale_t, 1.0);
    assert!((55..85).all(|i| frame(&frames, i).transparency == OVERLAY_T));
    assert_eq!(
        frame(&frames, 55).subtitle.as_deref(),
        Some("Cumulative Slip")
    );

    // return renders 85..105; the slip is gone after t frames
    let scale: Vec<f64> = (85..91).map(|i| frame(&frames, i).scale_t).collect();
    assert_close(&scale, &[1.0, 0.75, 0.5, 0.25, 0.0, 0.0]);
    let over: Vec<f64> = (85..91).map(|i| frame(&frames, i).transparency).collect();
    assert_close(&over, &[40.0, 55.0, 70.0, 85.0, 100.0, 100.0]);
    assert_eq!(frame(&frames, 104).transparency, 100.0);
    assert_eq!(frame(&frames, 85).subtitle, None);
}

#[test]
fn ground_motion_past_the_rupture_shows_the_full_slip_scale() {
    let mut cfg = with_ground_motion(config());
    // two slip-rate frames, shorter than the five-frame fade in
    cfg.scene.rupture_secs = 0.2;
    assert_eq!(cfg.slip_rate_frames(), 2);
    let plan = plan_animation(&cfg).unwrap();
    let frames = all_frames(&plan);

    let scale: Vec<f64> = (55..60).map(|i| frame(&frames, i).scale_t).collect();
    assert_close(&scale, &[0.0, 0.2, 1.0, 1.0, 1.0]);
    let scale_x: Vec<f64> = (55..60).map(|i| frame(&frames, i).scale_x).collect();
    assert_close(&scale_x, &[0.0, 0.0, 0.0, 0.2, 0.4]);
    assert_eq!(frame(&frames, 55).subtitle.as_deref(), Some("Simulation"));
}

#[test]
fn hazard_reveal_fades_in_with_its_colour_scale() {
    let plan = plan_animation(&with_ground_motion(config())).unwrap();
    let pgv: Vec<FrameParams> = all_frames(&plan)
        .into_iter()
        .filter(|p| matches!(&p.layer, FrameLayer::Hazard { overlay, .. } if overlay == "pgv"))
        .collect();
    assert_eq!(pgv.len(), 5);
    let scale: Vec<f64> = pgv.iter().map(|p| p.scale_t).collect();
    assert_close(&scale, &[0.0, 0.25, 0.5, 0.75, 1.0]);
    let over: Vec<f64> = pgv.iter().map(|p| p.transparency).collect();
    assert_close(&over, &[100.0, 85.0, 70.0, 55.0, 40.0]);
    assert!(pgv.iter().all(|p| p.subtitle.as_deref() == Some("PGV")));
    assert!(matches!(
        &pgv[0].layer,
        FrameLayer::Hazard { label, .. } if label == "Peak Ground Velocity (cm/s)"
    ));
}

#[test]
fn path_network_fades_in_holds_opaque_and_fades_out() {
    let mut cfg = config();
    cfg.scene.path_network = vec![
        PathStep {
            file: "roads/day1.gmt".into(),
            day: 1,
        },
        PathStep {
            file: "roads/day60.gmt".into(),
            day: 60,
        },
    ];
    let plan = plan_animation(&cfg).unwrap();
    let paths: Vec<(f64, f64)> = all_frames(&plan)
        .into_iter()
        .filter_map(|p| match p.layer {
            FrameLayer::PathNetwork { proportion, .. } => {
                assert_eq!(p.subtitle.as_deref(), Some("Transport Network"));
                Some((p.transparency, proportion))
            }
            _ => None,
        })
        .collect();
    // reveal 5, one later step, fade out 5
    assert_eq!(paths.len(), 11);
    let (over, shown): (Vec<f64>, Vec<f64>) = paths.into_iter().unzip();
    assert_close(
        &over,
        &[100.0, 75.0, 50.0, 25.0, 0.0, 0.0, 0.0, 25.0, 50.0, 75.0, 100.0],
    );
    assert_close(
        &shown,
        &[0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 0.75, 0.5, 0.25, 0.0],
    );
}

#[test]
fn opening_stages_are_captioned_as_slip() {
    let plan = plan_animation(&config()).unwrap();
    let frames = all_frames(&plan);
    // fly-in, dip and fade
    for idx in [0, 19, 20, 29, 50, 54] {
        assert_eq!(
            frame(&frames, idx).subtitle.as_deref(),
            Some("Fault Slip Distribution"),
            "frame {idx}"
        );
    }
}
