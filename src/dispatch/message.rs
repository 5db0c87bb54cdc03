use crate::dispatch::worker::WorkerLog;
use crate::plan::job::Job;

/// Position of a worker in the pool, `0..worker_count`.
pub type WorkerId = usize;

/// Master to worker.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Nothing runnable yet; ask again after a pause.
    Wait,
    /// No work remains; send the log and exit.
    Stop,
    /// Execute this job.
    Run(Job),
}

/// Worker to master.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Ready for the next job, carrying the result of the previous one if it had any.
    Ready(Option<JobOutput>),
    /// Final message after a stop.
    Retired(WorkerLog),
}

/// Result carried back with [`Reply::Ready`].
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutput {
    /// Scalar produced by a prep job.
    Scalar(f64),
    /// The job failed with this message.
    Failed(String),
}
