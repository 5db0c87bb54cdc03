use std::collections::VecDeque;

use crate::dispatch::message::{Dispatch, JobOutput, Reply, WorkerId};
use crate::dispatch::tracker::DependencyTracker;
use crate::dispatch::worker::WorkerLog;
use crate::foundation::core::SeqIndex;
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::plan::job::{FrameJob, Job, JobKind, Partition, PrepStepJob};
use crate::plan::timeline::{GatedWork, TimelinePlan};

/// Master side of the worker transport.
pub trait MasterLink {
    /// Number of workers on the other end.
    fn worker_count(&self) -> usize;
    /// Block until any worker replies.
    fn recv_any(&mut self) -> QuakereelResult<(WorkerId, Reply)>;
    /// Send one message to `worker`.
    fn send(&mut self, worker: WorkerId, msg: Dispatch) -> QuakereelResult<()>;
}

/// A job a worker reported as failed.
#[derive(Clone, Debug, PartialEq)]
pub struct JobFailure {
    pub worker: WorkerId,
    pub kind: JobKind,
    pub index: Option<SeqIndex>,
    pub message: String,
}

/// Outcome of a dispatch run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchReport {
    /// Frame jobs that completed without failure.
    pub frames_rendered: u64,
    /// Prep steps that completed.
    pub prep_steps: u64,
    /// Colour-scale ceiling from the prep job.
    pub ceiling: Option<f64>,
    /// Wait signals handed out.
    pub waits: u64,
    pub failures: Vec<JobFailure>,
    /// Gated frames abandoned because their prerequisites failed.
    pub dropped: usize,
    /// Every value the prep-step counter took.
    pub counter_history: Vec<u64>,
    /// One log per worker, ordered by worker id.
    pub logs: Vec<WorkerLog>,
}

impl DispatchReport {
    /// Whether every job succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.dropped == 0
    }
}

#[derive(Debug, Default)]
struct WorkerSlot {
    in_flight: Option<Job>,
    stopped: bool,
    log: Option<WorkerLog>,
}

/// Single-threaded master loop.
///
/// Reacts to one reply at a time: settles the job the replying worker held, releases whatever
/// that completion unlocked, then answers the same worker with its next job, a wait or a stop.
#[derive(Debug)]
pub struct Dispatcher {
    queue: VecDeque<Job>,
    gated: GatedWork,
    tracker: DependencyTracker,
    timesteps: u32,
    report: DispatchReport,
}

impl Dispatcher {
    /// Dispatcher over ready jobs and the gated work behind them.
    pub fn new(ready: Vec<Job>, gated: GatedWork, timesteps: u32) -> Self {
        let has_prep = ready.iter().any(|j| j.kind() == JobKind::Prep);
        Self {
            queue: ready.into(),
            gated,
            tracker: DependencyTracker::new(has_prep),
            timesteps,
            report: DispatchReport::default(),
        }
    }

    /// Dispatcher for everything a plan needs rendered.
    pub fn from_plan(plan: &TimelinePlan) -> Self {
        Self::new(plan.ready.clone(), plan.gated.clone(), plan.timesteps)
    }

    /// Drive `link` until every worker has been stopped and has returned its log.
    #[tracing::instrument(skip_all, fields(workers = link.worker_count()))]
    pub fn run<L: MasterLink>(mut self, link: &mut L) -> QuakereelResult<DispatchReport> {
        let workers = link.worker_count();
        if workers == 0 {
            return Err(QuakereelError::dispatch("no workers to dispatch to"));
        }
        let mut slots: Vec<WorkerSlot> = (0..workers).map(|_| WorkerSlot::default()).collect();
        let mut stopped = 0usize;
        let mut retired = 0usize;

        while stopped < workers {
            let (w, reply) = link.recv_any()?;
            let slot = slots
                .get_mut(w)
                .ok_or_else(|| QuakereelError::dispatch(format!("reply from unknown worker {w}")))?;
            match reply {
                Reply::Retired(log) => {
                    if !slot.stopped || slot.log.is_some() {
                        return Err(QuakereelError::dispatch(format!(
                            "worker {w} retired without being stopped"
                        )));
                    }
                    slot.log = Some(log);
                    retired += 1;
                }
                Reply::Ready(output) => {
                    if slot.stopped {
                        return Err(QuakereelError::dispatch(format!(
                            "worker {w} asked for work after being stopped"
                        )));
                    }
                    let done = slot.in_flight.take();
                    self.settle(w, done, output, workers)?;

                    let next = self.next_dispatch();
                    match &next {
                        Dispatch::Run(job) => {
                            tracing::debug!(worker = w, kind = job.kind().label(), index = ?job.sequence_index(), "dispatch");
                            slots[w].in_flight = Some(job.clone());
                        }
                        Dispatch::Wait => {
                            self.report.waits += 1;
                        }
                        Dispatch::Stop => {
                            tracing::debug!(worker = w, "stop");
                            slots[w].stopped = true;
                            stopped += 1;
                        }
                    }
                    link.send(w, next)?;
                }
            }
        }

        while retired < workers {
            let (w, reply) = link.recv_any()?;
            match (slots.get_mut(w), reply) {
                (Some(slot), Reply::Retired(log)) if slot.log.is_none() => {
                    slot.log = Some(log);
                    retired += 1;
                }
                (_, reply) => {
                    return Err(QuakereelError::dispatch(format!(
                        "unexpected reply from worker {w} during shutdown: {reply:?}"
                    )));
                }
            }
        }

        self.report.logs = slots.into_iter().filter_map(|s| s.log).collect();
        self.report.ceiling = self.tracker.ceiling();
        self.report.counter_history = self.tracker.history().to_vec();
        if !self.gated.is_empty() {
            self.report.dropped += self.gated.len();
        }
        tracing::info!(
            frames = self.report.frames_rendered,
            failures = self.report.failures.len(),
            dropped = self.report.dropped,
            waits = self.report.waits,
            "dispatch finished"
        );
        Ok(self.report)
    }

    fn next_dispatch(&mut self) -> Dispatch {
        match self.queue.pop_front() {
            Some(job) => {
                match job.kind() {
                    JobKind::Prep => self.tracker.prep_dispatched(),
                    JobKind::PrepStep => self.tracker.step_dispatched(),
                    JobKind::RenderFrame => {}
                }
                Dispatch::Run(job)
            }
            None if self.tracker.has_pending() => Dispatch::Wait,
            None => Dispatch::Stop,
        }
    }

    fn settle(
        &mut self,
        worker: WorkerId,
        done: Option<Job>,
        output: Option<JobOutput>,
        workers: usize,
    ) -> QuakereelResult<()> {
        let Some(job) = done else {
            return match output {
                None => Ok(()),
                Some(out) => Err(QuakereelError::dispatch(format!(
                    "worker {worker} returned {out:?} with no job in flight"
                ))),
            };
        };

        if let Some(JobOutput::Failed(message)) = output {
            tracing::warn!(worker, kind = job.kind().label(), index = ?job.sequence_index(), %message, "job failed");
            self.report.failures.push(JobFailure {
                worker,
                kind: job.kind(),
                index: job.sequence_index(),
                message,
            });
            return match job {
                Job::Prep(_) => {
                    self.tracker.prep_failed();
                    self.drop_gated();
                    Ok(())
                }
                Job::PrepStep(step) => self.step_done(step),
                Job::RenderFrame(_) => Ok(()),
            };
        }

        match (job, output) {
            (Job::Prep(_), Some(JobOutput::Scalar(ceiling))) => {
                self.tracker.prep_completed(ceiling)?;
                let n = u32::try_from(workers)
                    .map_err(|_| QuakereelError::dispatch("too many workers"))?;
                for start in 0..n {
                    self.queue.push_back(Job::PrepStep(PrepStepJob {
                        partition: Partition {
                            start,
                            stride: n,
                            timesteps: self.timesteps,
                        },
                        ceiling,
                    }));
                }
                self.tracker.steps_spawned(u64::from(n));
                Ok(())
            }
            (Job::PrepStep(step), None) => self.step_done(step),
            (Job::RenderFrame(f), None) => {
                tracing::debug!(worker, index = ?f.params.index, "frame done");
                self.report.frames_rendered += 1;
                Ok(())
            }
            (job, output) => Err(QuakereelError::dispatch(format!(
                "worker {worker} answered {} job with {output:?}",
                job.kind().label()
            ))),
        }
    }

    fn step_done(&mut self, step: PrepStepJob) -> QuakereelResult<()> {
        self.report.prep_steps += 1;
        let mut released = 0usize;
        for t in step.partition.iter() {
            if let Some(frames) = self.gated.by_timestep.remove(&t) {
                released += frames.len();
                self.release(frames, step.ceiling);
            }
        }
        if released > 0 {
            tracing::debug!(start = step.partition.start, released, "timestep frames released");
        }
        if self.tracker.step_completed()? {
            let after = std::mem::take(&mut self.gated.after_prep);
            tracing::info!(frames = after.len(), "after-prep batch released");
            self.release(after, step.ceiling);
        }
        Ok(())
    }

    fn release(&mut self, frames: Vec<FrameJob>, ceiling: f64) {
        for mut f in frames {
            f.params.overlay_ceiling = Some(ceiling);
            self.queue.push_back(Job::RenderFrame(f));
        }
    }

    fn drop_gated(&mut self) {
        let dropped = self.gated.len();
        self.gated = GatedWork::default();
        self.report.dropped += dropped;
        tracing::warn!(dropped, "gated frames dropped after prep failure");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/master.rs"]
mod tests;
