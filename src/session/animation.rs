use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::AnimationConfig;
use crate::dispatch::master::{DispatchReport, Dispatcher};
use crate::dispatch::pool::run_pool;
use crate::dispatch::worker::{DEFAULT_WAIT_INTERVAL, WorkerEnv};
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::plan::storyboard::plan_animation;
use crate::plan::timeline::TimelinePlan;
use crate::render::backend::{OverlayPrep, Renderer};
use crate::sequence::compiler::{CompileOpts, CompileStats, SequenceCompiler};
use crate::sequence::store::{EncoderInput, FrameStore};

/// Options controlling an [`AnimationSession`] run.
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Worker threads. Also the number of overlay partitions.
    pub workers: usize,
    /// Pause a worker takes when told to wait.
    pub wait_interval: Duration,
    /// Compare every copied frame against its source.
    pub verify_copies: bool,
    /// Report job failures instead of failing the run. Compilation is skipped when any job failed.
    pub keep_going: bool,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            wait_interval: DEFAULT_WAIT_INTERVAL,
            verify_copies: false,
            keep_going: false,
        }
    }
}

/// What a run left on disk.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutput {
    /// Contiguous frame sequence ready for an encoder.
    Sequence(EncoderInput),
    /// Single still image.
    Still(PathBuf),
    /// Jobs failed and `keep_going` was set; frames were left uncompiled.
    Incomplete,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub total_frames: u64,
    pub rendered_frames: u64,
    pub dispatch: DispatchReport,
    pub compile: CompileStats,
    pub output: SessionOutput,
}

/// Runs planning, dispatch, sequence compilation and the contiguity check for one animation.
pub struct AnimationSession {
    config: AnimationConfig,
    store: FrameStore,
    opts: SessionOpts,
}

impl AnimationSession {
    /// Validate `config` and its inputs and set up a session writing into `store`.
    pub fn new(config: AnimationConfig, store: FrameStore, opts: SessionOpts) -> QuakereelResult<Self> {
        config.validate()?;
        config.verify_inputs()?;
        if opts.workers == 0 {
            return Err(QuakereelError::config("workers must be > 0"));
        }
        Ok(Self {
            config,
            store,
            opts,
        })
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Plan without rendering anything.
    pub fn plan(&self) -> QuakereelResult<TimelinePlan> {
        plan_animation(&self.config)
    }

    /// Render every planned frame through `renderer` and assemble the final sequence.
    ///
    /// `overlays` is required when the scene has ground motion and the run is animated.
    #[tracing::instrument(skip_all, fields(workers = self.opts.workers, dir = %self.store.dir().display()))]
    pub fn run(
        &self,
        renderer: &dyn Renderer,
        overlays: Option<&dyn OverlayPrep>,
    ) -> QuakereelResult<SessionReport> {
        let plan = self.plan()?;
        if let Some(prep) = plan.prep {
            let source = overlays.ok_or_else(|| {
                QuakereelError::config("ground motion is animated but no overlay source was given")
            })?;
            if source.timesteps() != prep.timesteps {
                return Err(QuakereelError::config(format!(
                    "overlay source has {} timesteps, scene has {}",
                    source.timesteps(),
                    prep.timesteps
                )));
            }
        }
        self.store.ensure_dirs()?;

        let env = WorkerEnv {
            renderer,
            overlays,
            store: &self.store,
            wait_interval: self.opts.wait_interval,
        };
        let dispatch = run_pool(Dispatcher::from_plan(&plan), env, self.opts.workers)?;

        if !dispatch.is_clean() {
            let summary = dispatch
                .failures
                .iter()
                .map(|f| format!("{} {:?}: {}", f.kind.label(), f.index, f.message))
                .collect::<Vec<_>>()
                .join("; ");
            if !self.opts.keep_going {
                return Err(QuakereelError::dispatch(format!(
                    "{} jobs failed, {} gated frames dropped: {summary}",
                    dispatch.failures.len(),
                    dispatch.dropped
                )));
            }
            tracing::warn!(
                failures = dispatch.failures.len(),
                dropped = dispatch.dropped,
                "jobs failed, leaving frames uncompiled"
            );
            return Ok(SessionReport {
                total_frames: plan.total_frames,
                rendered_frames: dispatch.frames_rendered,
                dispatch,
                compile: CompileStats::default(),
                output: SessionOutput::Incomplete,
            });
        }

        if plan.is_still() {
            let path = self.store.still_path();
            tracing::info!(path = %path.display(), "still image rendered");
            return Ok(SessionReport {
                total_frames: 0,
                rendered_frames: dispatch.frames_rendered,
                dispatch,
                compile: CompileStats::default(),
                output: SessionOutput::Still(path),
            });
        }

        let compile = SequenceCompiler::new(
            &self.store,
            CompileOpts {
                verify_copies: self.opts.verify_copies,
            },
        )
        .compile(&plan.ops)?;
        self.store.verify_contiguous(plan.total_frames)?;

        let input = self.store.encoder_input(self.config.fps(), plan.total_frames);
        tracing::info!(
            frames = plan.total_frames,
            rendered = dispatch.frames_rendered,
            pattern = %input.pattern,
            "animation assembled"
        );
        Ok(SessionReport {
            total_frames: plan.total_frames,
            rendered_frames: dispatch.frames_rendered,
            dispatch,
            compile,
            output: SessionOutput::Sequence(input),
        })
    }
}
