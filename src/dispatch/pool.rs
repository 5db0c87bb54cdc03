use std::sync::mpsc;

use crate::dispatch::master::{DispatchReport, Dispatcher, MasterLink};
use crate::dispatch::message::{Dispatch, Reply, WorkerId};
use crate::dispatch::worker::{Worker, WorkerEnv, WorkerLink};
use crate::foundation::error::{QuakereelError, QuakereelResult};

/// Master end of the in-process transport: one shared reply channel, one command channel per
/// worker.
pub struct ChannelMaster {
    replies: mpsc::Receiver<(WorkerId, Reply)>,
    commands: Vec<mpsc::Sender<Dispatch>>,
}

impl MasterLink for ChannelMaster {
    fn worker_count(&self) -> usize {
        self.commands.len()
    }

    fn recv_any(&mut self) -> QuakereelResult<(WorkerId, Reply)> {
        self.replies
            .recv()
            .map_err(|_| QuakereelError::dispatch("every worker hung up"))
    }

    fn send(&mut self, worker: WorkerId, msg: Dispatch) -> QuakereelResult<()> {
        let tx = self
            .commands
            .get(worker)
            .ok_or_else(|| QuakereelError::dispatch(format!("no worker {worker}")))?;
        tx.send(msg)
            .map_err(|_| QuakereelError::dispatch(format!("worker {worker} is not accepting jobs")))
    }
}

/// Worker end of the in-process transport.
pub struct ChannelWorker {
    id: WorkerId,
    replies: mpsc::Sender<(WorkerId, Reply)>,
    commands: mpsc::Receiver<Dispatch>,
}

impl WorkerLink for ChannelWorker {
    fn send(&mut self, reply: Reply) -> QuakereelResult<()> {
        self.replies
            .send((self.id, reply))
            .map_err(|_| QuakereelError::dispatch("master is not accepting replies"))
    }

    fn recv(&mut self) -> QuakereelResult<Dispatch> {
        self.commands
            .recv()
            .map_err(|_| QuakereelError::dispatch("master hung up"))
    }
}

/// Run `dispatcher` against `workers` scoped worker threads.
pub fn run_pool(
    dispatcher: Dispatcher,
    env: WorkerEnv<'_>,
    workers: usize,
) -> QuakereelResult<DispatchReport> {
    if workers == 0 {
        return Err(QuakereelError::dispatch("worker count must be > 0"));
    }

    std::thread::scope(|scope| -> QuakereelResult<DispatchReport> {
        let (reply_tx, reply_rx) = mpsc::channel::<(WorkerId, Reply)>();
        let mut commands = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (cmd_tx, cmd_rx) = mpsc::channel::<Dispatch>();
            commands.push(cmd_tx);
            let mut link = ChannelWorker {
                id,
                replies: reply_tx.clone(),
                commands: cmd_rx,
            };
            let worker = Worker::new(id, env);
            handles.push(scope.spawn(move || worker.run(&mut link)));
        }
        drop(reply_tx);

        let mut master = ChannelMaster {
            replies: reply_rx,
            commands,
        };
        let report = dispatcher.run(&mut master);
        // unblocks workers still waiting for a command if the master bailed out
        drop(master);

        let mut worker_err = None;
        for h in handles {
            let res = h
                .join()
                .map_err(|_| QuakereelError::dispatch("worker thread panicked"))
                .and_then(|r| r);
            if let Err(e) = res
                && worker_err.is_none()
            {
                worker_err = Some(e);
            }
        }

        let report = report?;
        match worker_err {
            Some(e) => Err(e),
            None => Ok(report),
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/pool.rs"]
mod tests;
