use std::time::{Duration, Instant};

use crate::dispatch::message::{Dispatch, JobOutput, Reply, WorkerId};
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::plan::job::{FrameJob, Job, PrepStepJob};
use crate::render::backend::{OverlayPrep, Renderer};
use crate::sequence::store::FrameStore;

/// Pause between asking for work after a [`Dispatch::Wait`].
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Worker side of the transport.
pub trait WorkerLink {
    fn send(&mut self, reply: Reply) -> QuakereelResult<()>;
    fn recv(&mut self) -> QuakereelResult<Dispatch>;
}

/// How one log entry ended.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    Done,
    Scalar(f64),
    /// Overlay timesteps written and skipped as empty.
    Overlays { written: u32, absent: u32 },
    Slept,
    Failed(String),
}

/// One executed job or wait.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LogEntry {
    pub label: &'static str,
    pub duration: Duration,
    pub outcome: EntryOutcome,
}

/// Append-only record a worker sends back when it is stopped.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct WorkerLog {
    pub worker: WorkerId,
    pub entries: Vec<LogEntry>,
}

impl WorkerLog {
    /// Entries with the given label.
    pub fn count(&self, label: &str) -> usize {
        self.entries.iter().filter(|e| e.label == label).count()
    }

    /// Time spent executing jobs, waits excluded.
    pub fn busy(&self) -> Duration {
        self.entries
            .iter()
            .filter(|e| e.outcome != EntryOutcome::Slept)
            .map(|e| e.duration)
            .sum()
    }
}

/// Collaborators shared by every worker of a pool.
#[derive(Clone, Copy)]
pub struct WorkerEnv<'a> {
    pub renderer: &'a dyn Renderer,
    /// Overlay source; required when the plan contains prep work.
    pub overlays: Option<&'a dyn OverlayPrep>,
    pub store: &'a FrameStore,
    pub wait_interval: Duration,
}

/// Pulls jobs one at a time and executes them synchronously.
pub struct Worker<'a> {
    id: WorkerId,
    env: WorkerEnv<'a>,
    log: WorkerLog,
}

impl<'a> Worker<'a> {
    pub fn new(id: WorkerId, env: WorkerEnv<'a>) -> Self {
        Self {
            id,
            env,
            log: WorkerLog {
                worker: id,
                entries: Vec::new(),
            },
        }
    }

    /// Request, execute, repeat until stopped; then hand the log over.
    pub fn run<L: WorkerLink>(mut self, link: &mut L) -> QuakereelResult<()> {
        let mut output = None;
        loop {
            link.send(Reply::Ready(output.take()))?;
            match link.recv()? {
                Dispatch::Run(job) => output = self.execute(&job),
                Dispatch::Wait => {
                    std::thread::sleep(self.env.wait_interval);
                    self.log.entries.push(LogEntry {
                        label: "sleep",
                        duration: self.env.wait_interval,
                        outcome: EntryOutcome::Slept,
                    });
                }
                Dispatch::Stop => break,
            }
        }
        tracing::debug!(worker = self.id, entries = self.log.entries.len(), "worker retiring");
        link.send(Reply::Retired(self.log))
    }

    /// Execute one job and log it. Errors become [`JobOutput::Failed`].
    pub fn execute(&mut self, job: &Job) -> Option<JobOutput> {
        let started = Instant::now();
        let result = match job {
            Job::Prep(_) => self.prep(),
            Job::PrepStep(step) => self.prep_step(step),
            Job::RenderFrame(frame) => self.render(frame),
        };
        let duration = started.elapsed();
        let label = job.kind().label();
        match result {
            Ok((outcome, output)) => {
                self.log.entries.push(LogEntry {
                    label,
                    duration,
                    outcome,
                });
                output
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(worker = self.id, label, index = ?job.sequence_index(), %message, "job failed");
                self.log.entries.push(LogEntry {
                    label,
                    duration,
                    outcome: EntryOutcome::Failed(message.clone()),
                });
                Some(JobOutput::Failed(message))
            }
        }
    }

    fn overlays(&self) -> QuakereelResult<&'a dyn OverlayPrep> {
        self.env
            .overlays
            .ok_or_else(|| QuakereelError::render("no overlay source configured"))
    }

    fn prep(&self) -> QuakereelResult<(EntryOutcome, Option<JobOutput>)> {
        let ceiling = self.overlays()?.prepare()?;
        Ok((EntryOutcome::Scalar(ceiling), Some(JobOutput::Scalar(ceiling))))
    }

    fn prep_step(&self, step: &PrepStepJob) -> QuakereelResult<(EntryOutcome, Option<JobOutput>)> {
        let overlays = self.overlays()?;
        let (mut written, mut absent) = (0, 0);
        for t in step.partition.iter() {
            match overlays.prepare_timestep(step.ceiling, t)? {
                Some(_) => written += 1,
                None => absent += 1,
            }
        }
        Ok((EntryOutcome::Overlays { written, absent }, None))
    }

    fn render(&self, frame: &FrameJob) -> QuakereelResult<(EntryOutcome, Option<JobOutput>)> {
        let out = self.env.store.path_for(frame.params.index);
        self.env.renderer.render(&frame.params, &out)?;
        Ok((EntryOutcome::Done, None))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/worker.rs"]
mod tests;
