use std::collections::{BTreeMap, BTreeSet};

use super::*;
use crate::dispatch::worker::WorkerLog;
use crate::plan::job::{
    Camera, DependencyKey, FrameLayer, FrameParams, PrepJob, TiltResolution, ViewFocus,
    ViewTransition,
};

fn frame(i: u64, dependency: Option<DependencyKey>) -> FrameJob {
    let layer = match dependency {
        Some(DependencyKey::Timestep(t)) => FrameLayer::GroundMotion {
            sim_time: i as f64,
            timestep: t,
        },
        _ => FrameLayer::Slip,
    };
    FrameJob {
        params: FrameParams {
            index: Some(SeqIndex(i)),
            camera: Camera {
                azimuth: 180.0,
                tilt: 90.0,
            },
            tilt: TiltResolution {
                render_tilt: 90.0,
                virtual_tilt: None,
            },
            scale_t: 0.0,
            scale_x: 0.0,
            transparency: 40.0,
            layer,
            view: ViewTransition::fixed(ViewFocus::Fault, 1.0),
            subtitle: None,
            overlay_ceiling: None,
        },
        dependency,
    }
}

/// Ready queue (prep first, then `ready` frames) and gated work over `timesteps` timesteps.
fn workload(ready: u64, timesteps: u32, per_timestep: u64, after_prep: u64) -> (Vec<Job>, GatedWork) {
    let mut jobs = vec![Job::Prep(PrepJob { timesteps })];
    let mut next = 0;
    for _ in 0..ready {
        jobs.push(Job::RenderFrame(frame(next, None)));
        next += 1;
    }
    let mut gated = GatedWork::default();
    for t in 0..timesteps {
        for _ in 0..per_timestep {
            gated
                .by_timestep
                .entry(t)
                .or_default()
                .push(frame(next, Some(DependencyKey::Timestep(t))));
            next += 1;
        }
    }
    for _ in 0..after_prep {
        gated
            .after_prep
            .push(frame(next, Some(DependencyKey::AfterPrep)));
        next += 1;
    }
    (jobs, gated)
}

/// In-memory stand-in for a worker pool.
///
/// Workers answer instantly but replies are delivered in a pseudo-random order. Every dispatch is
/// checked against the guarantees the master gives.
struct ScriptedLink {
    workers: usize,
    pending: BTreeMap<WorkerId, (Reply, Option<Job>)>,
    rng: u64,
    ceiling: f64,
    fail_prep: bool,
    scalar_for_frames: bool,
    delivered_steps: Vec<Partition>,
    dispatched: BTreeSet<u64>,
    gated_sent: Vec<(DependencyKey, usize)>,
    runs: Vec<(WorkerId, JobKind)>,
}

impl ScriptedLink {
    fn new(workers: usize, seed: u64) -> Self {
        Self {
            workers,
            pending: (0..workers).map(|w| (w, (Reply::Ready(None), None))).collect(),
            rng: seed,
            ceiling: 2.5,
            fail_prep: false,
            scalar_for_frames: false,
            delivered_steps: Vec::new(),
            dispatched: BTreeSet::new(),
            gated_sent: Vec::new(),
            runs: Vec::new(),
        }
    }

    fn next_rand(&mut self) -> u64 {
        self.rng = self
            .rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.rng >> 33
    }
}

impl MasterLink for ScriptedLink {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn recv_any(&mut self) -> QuakereelResult<(WorkerId, Reply)> {
        assert!(!self.pending.is_empty(), "master waits on a silent pool");
        let pick = (self.next_rand() as usize) % self.pending.len();
        let w = *self.pending.keys().nth(pick).unwrap();
        let (reply, job) = self.pending.remove(&w).unwrap();
        if let Some(Job::PrepStep(step)) = job {
            self.delivered_steps.push(step.partition);
        }
        Ok((w, reply))
    }

    fn send(&mut self, worker: WorkerId, msg: Dispatch) -> QuakereelResult<()> {
        assert!(
            !self.pending.contains_key(&worker),
            "worker {worker} got a second job while one is in flight"
        );
        let reply = match &msg {
            Dispatch::Wait => (Reply::Ready(None), None),
            Dispatch::Stop => (
                Reply::Retired(WorkerLog {
                    worker,
                    entries: Vec::new(),
                }),
                None,
            ),
            Dispatch::Run(job) => {
                self.runs.push((worker, job.kind()));
                let out = match job {
                    Job::Prep(_) if self.fail_prep => Some(JobOutput::Failed("no grid".into())),
                    Job::Prep(_) => Some(JobOutput::Scalar(self.ceiling)),
                    Job::PrepStep(step) => {
                        assert_eq!(step.ceiling, self.ceiling);
                        None
                    }
                    Job::RenderFrame(f) => {
                        let idx = f.params.index.unwrap().0;
                        assert!(self.dispatched.insert(idx), "frame {idx} dispatched twice");
                        if let Some(dep) = f.dependency {
                            assert_eq!(f.params.overlay_ceiling, Some(self.ceiling));
                            match dep {
                                DependencyKey::Timestep(t) => assert!(
                                    self.delivered_steps.iter().any(|p| p.contains(t)),
                                    "frame {idx} released before timestep {t} was prepared"
                                ),
                                DependencyKey::AfterPrep => assert_eq!(
                                    self.delivered_steps.len(),
                                    self.workers,
                                    "after-prep frame {idx} released early"
                                ),
                            }
                            self.gated_sent.push((dep, self.delivered_steps.len()));
                        }
                        self.scalar_for_frames.then_some(JobOutput::Scalar(1.0))
                    }
                };
                (Reply::Ready(out), Some(job.clone()))
            }
        };
        self.pending.insert(worker, reply);
        Ok(())
    }
}

#[test]
fn four_workers_count_prep_steps_down_before_releasing_the_batch() {
    let (ready, gated) = workload(6, 10, 2, 8);
    let mut link = ScriptedLink::new(4, 7);
    let report = Dispatcher::new(ready, gated, 10).run(&mut link).unwrap();

    assert_eq!(report.counter_history, vec![0, 4, 3, 2, 1, 0]);
    assert_eq!(report.prep_steps, 4);
    assert_eq!(report.ceiling, Some(2.5));
    assert_eq!(report.frames_rendered, 6 + 20 + 8);
    assert!(report.is_clean());
    assert_eq!(report.logs.len(), 4);
    assert_eq!(link.dispatched.len(), 34);
    let after_prep: Vec<_> = link
        .gated_sent
        .iter()
        .filter(|(dep, _)| *dep == DependencyKey::AfterPrep)
        .collect();
    assert_eq!(after_prep.len(), 8);
    assert!(after_prep.iter().all(|(_, steps)| *steps == 4));
}

#[test]
fn guarantees_hold_under_many_delivery_orders() {
    for seed in 0..25 {
        for workers in [1, 2, 3, 5, 16] {
            let (ready, gated) = workload(3, 7, 3, 4);
            let mut link = ScriptedLink::new(workers, seed);
            let report = Dispatcher::new(ready, gated, 7).run(&mut link).unwrap();
            assert_eq!(report.frames_rendered, 3 + 21 + 4, "seed {seed} workers {workers}");
            assert_eq!(report.counter_history.len(), 2 + workers);
            assert_eq!(report.logs.len(), workers);
            assert!(link.pending.is_empty());
        }
    }
}

#[test]
fn idle_workers_wait_while_prep_runs() {
    let (ready, gated) = workload(0, 4, 1, 1);
    let mut link = ScriptedLink::new(3, 1);
    let report = Dispatcher::new(ready, gated, 4).run(&mut link).unwrap();
    assert!(report.waits > 0);
    assert_eq!(report.frames_rendered, 5);
}

#[test]
fn plain_frames_need_no_gates() {
    let ready: Vec<Job> = (0..10).map(|i| Job::RenderFrame(frame(i, None))).collect();
    let mut link = ScriptedLink::new(3, 3);
    let report = Dispatcher::new(ready, GatedWork::default(), 0)
        .run(&mut link)
        .unwrap();
    assert_eq!(report.frames_rendered, 10);
    assert_eq!(report.waits, 0);
    assert_eq!(report.counter_history, vec![0]);
    assert!(link.runs.iter().all(|(_, k)| *k == JobKind::RenderFrame));
}

#[test]
fn failed_prep_drops_gated_work_and_terminates() {
    let (ready, gated) = workload(2, 4, 2, 3);
    let mut link = ScriptedLink::new(2, 5);
    link.fail_prep = true;
    let report = Dispatcher::new(ready, gated, 4).run(&mut link).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, JobKind::Prep);
    assert_eq!(report.failures[0].message, "no grid");
    assert_eq!(report.dropped, 11);
    assert_eq!(report.frames_rendered, 2);
    assert!(!report.is_clean());
    assert!(link.runs.iter().all(|(_, k)| *k != JobKind::PrepStep));
}

#[test]
fn scalar_reply_for_a_frame_is_fatal() {
    let ready: Vec<Job> = (0..3).map(|i| Job::RenderFrame(frame(i, None))).collect();
    let mut link = ScriptedLink::new(1, 0);
    link.scalar_for_frames = true;
    let err = Dispatcher::new(ready, GatedWork::default(), 0)
        .run(&mut link)
        .unwrap_err();
    assert!(matches!(err, QuakereelError::Dispatch(_)));
}

#[test]
fn zero_workers_is_rejected() {
    let mut link = ScriptedLink::new(0, 0);
    let err = Dispatcher::new(Vec::new(), GatedWork::default(), 0)
        .run(&mut link)
        .unwrap_err();
    assert!(matches!(err, QuakereelError::Dispatch(_)));
}
