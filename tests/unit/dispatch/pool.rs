use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::*;
use crate::config::model::{AnimationConfig, GroundMotionSummary, SceneSummary};
use crate::plan::job::FrameParams;
use crate::plan::storyboard::plan_animation;
use crate::render::backend::Renderer;
use crate::render::overlay::SyntheticGroundMotion;
use crate::sequence::store::FrameStore;

/// Records every output path; checks that gated frames find their overlay settled.
struct CountingRenderer<'a> {
    store: &'a FrameStore,
    outs: Mutex<Vec<PathBuf>>,
}

impl Renderer for CountingRenderer<'_> {
    fn render(&self, params: &FrameParams, out: &Path) -> QuakereelResult<()> {
        if let crate::plan::job::FrameLayer::GroundMotion { .. } = params.layer {
            assert!(params.overlay_ceiling.is_some());
        }
        assert!(out.starts_with(self.store.dir()));
        self.outs.lock().unwrap().push(out.to_path_buf());
        Ok(())
    }
}

fn config() -> AnimationConfig {
    let mut cfg = AnimationConfig::with_scene(SceneSummary {
        strike: 10.0,
        dip: 45.0,
        rupture_secs: 2.0,
        slip_dt: 0.5,
        ground_motion: Some(GroundMotionSummary {
            timesteps: 12,
            dt: 0.25,
            cutoff_secs: None,
            long_axis_bearing: 30.0,
        }),
        hazard_layers: vec![],
        path_network: vec![],
    });
    cfg.framerate = 5;
    cfg.transition_secs = 1.0;
    cfg.minor_transition_secs = 0.4;
    cfg.pause_secs = 0.4;
    cfg.start_delay_secs = 0.0;
    cfg.end_delay_secs = 0.0;
    cfg
}

fn store(name: &str) -> FrameStore {
    let dir = PathBuf::from("target").join("unit_dispatch_pool").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    let store = FrameStore::new(dir, "quake");
    store.ensure_dirs().unwrap();
    store
}

#[test]
fn threads_render_every_planned_frame_once() {
    let cfg = config();
    let plan = plan_animation(&cfg).unwrap();
    assert!(plan.prep.is_some());

    let store = store("threads");
    let overlays =
        SyntheticGroundMotion::new(store.clone(), cfg.scene.ground_motion.as_ref().unwrap())
            .with_size(8, 8);
    let renderer = CountingRenderer {
        store: &store,
        outs: Mutex::new(Vec::new()),
    };
    let env = WorkerEnv {
        renderer: &renderer,
        overlays: Some(&overlays),
        store: &store,
        wait_interval: Duration::from_millis(1),
    };

    let report = run_pool(Dispatcher::from_plan(&plan), env, 3).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.prep_steps, 3);
    assert_eq!(report.counter_history, vec![0, 3, 2, 1, 0]);
    assert_eq!(report.frames_rendered as usize, plan.frame_jobs());
    assert_eq!(report.logs.len(), 3);

    let mut outs = renderer.outs.into_inner().unwrap();
    let n = outs.len();
    outs.sort();
    outs.dedup();
    assert_eq!(outs.len(), n, "a frame was rendered twice");
    assert_eq!(n, plan.frame_jobs());

    let logged: usize = report.logs.iter().map(|l| l.count("render_frame")).sum();
    assert_eq!(logged, n);
}

#[test]
fn missing_overlay_source_is_reported_not_hung() {
    let cfg = config();
    let plan = plan_animation(&cfg).unwrap();
    let store = store("no_overlays");
    let renderer = CountingRenderer {
        store: &store,
        outs: Mutex::new(Vec::new()),
    };
    let env = WorkerEnv {
        renderer: &renderer,
        overlays: None,
        store: &store,
        wait_interval: Duration::from_millis(1),
    };
    let report = run_pool(Dispatcher::from_plan(&plan), env, 2).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.dropped, plan.gated.len());
    assert_eq!(
        report.frames_rendered as usize,
        plan.frame_jobs() - plan.gated.len()
    );
}

#[test]
fn zero_workers_is_an_error() {
    let store = FrameStore::new("unused", "quake");
    let renderer = CountingRenderer {
        store: &store,
        outs: Mutex::new(Vec::new()),
    };
    let env = WorkerEnv {
        renderer: &renderer,
        overlays: None,
        store: &store,
        wait_interval: Duration::from_millis(1),
    };
    let err = run_pool(Dispatcher::new(Vec::new(), Default::default(), 0), env, 0).unwrap_err();
    assert!(matches!(err, QuakereelError::Dispatch(_)));
}
