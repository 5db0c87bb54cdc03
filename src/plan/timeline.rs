use std::collections::BTreeMap;

use crate::foundation::core::{Fps, SeqIndex};
use crate::foundation::error::{QuakereelError, QuakereelResult};
use crate::plan::job::{DependencyKey, FrameJob, FrameLayer, FrameParams, Job, PrepJob};
use crate::plan::stage::{Stage, StageContext};
use crate::sequence::coverage::IndexCoverage;
use crate::sequence::op::SequenceOp;

/// Which queue a stage's frames go to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Dispatchable immediately.
    Ready,
    /// Held until every prep step has completed.
    AfterPrep,
    /// Held until the overlay timestep each frame shows has been prepared.
    Timestep,
}

/// Frames held back until their prerequisites complete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GatedWork {
    /// Frames keyed by the overlay timestep they show.
    pub by_timestep: BTreeMap<u32, Vec<FrameJob>>,
    /// Frames released once all prep steps are done.
    pub after_prep: Vec<FrameJob>,
}

impl GatedWork {
    /// Number of gated frames.
    pub fn len(&self) -> usize {
        self.after_prep.len() + self.by_timestep.values().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing is gated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, job: FrameJob) {
        match job.dependency {
            Some(DependencyKey::Timestep(t)) => self.by_timestep.entry(t).or_default().push(job),
            Some(DependencyKey::AfterPrep) | None => self.after_prep.push(job),
        }
    }
}

/// Complete output of planning.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelinePlan {
    /// Jobs dispatchable immediately, in order. Starts with the prep job when there is one.
    pub ready: Vec<Job>,
    pub gated: GatedWork,
    /// Ops to run over the rendered files, in order.
    pub ops: Vec<SequenceOp>,
    /// Length of the final contiguous sequence; 0 for a still image.
    pub total_frames: u64,
    /// Ground-motion timesteps needing overlay preparation.
    pub timesteps: u32,
    pub prep: Option<PrepJob>,
    /// Frames rendered (as opposed to synthesized by ops).
    pub rendered_frames: u64,
}

impl TimelinePlan {
    /// Plan producing a single still image.
    pub fn still(params: FrameParams) -> Self {
        Self {
            ready: vec![Job::RenderFrame(FrameJob {
                params: FrameParams {
                    index: None,
                    ..params
                },
                dependency: None,
            })],
            gated: GatedWork::default(),
            ops: Vec::new(),
            total_frames: 0,
            timesteps: 0,
            prep: None,
            rendered_frames: 1,
        }
    }

    /// Whether this plan produces a still image rather than a sequence.
    pub fn is_still(&self) -> bool {
        self.total_frames == 0 && self.rendered_frames == 1
    }

    /// Render jobs across the ready and gated queues.
    pub fn frame_jobs(&self) -> usize {
        self.ready
            .iter()
            .filter(|j| matches!(j, Job::RenderFrame(_)))
            .count()
            + self.gated.len()
    }
}

/// Where a rendered stage landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSpan {
    /// First rendered index.
    pub start: SeqIndex,
    /// Rendered frames.
    pub frames: u64,
}

/// Incremental timeline builder.
///
/// Every rendered index and every op is checked against an [`IndexCoverage`] as it is emitted,
/// so an invalid timeline fails at the call that broke it.
#[derive(Debug)]
pub struct Timeline {
    fps: Fps,
    ctx: StageContext,
    coverage: IndexCoverage,
    ready: Vec<Job>,
    gated: GatedWork,
    ops: Vec<SequenceOp>,
    prep: Option<PrepJob>,
}

impl Timeline {
    /// Empty timeline starting at `ctx`.
    pub fn new(fps: Fps, ctx: StageContext) -> Self {
        Self {
            fps,
            ctx,
            coverage: IndexCoverage::new(),
            ready: Vec::new(),
            gated: GatedWork::default(),
            ops: Vec::new(),
            prep: None,
        }
    }

    /// Put a prep job at the head of the ready queue.
    pub fn with_prep(mut self, prep: PrepJob) -> Self {
        self.ready.insert(0, Job::Prep(prep));
        self.prep = Some(prep);
        self
    }

    /// Next free sequence index.
    pub fn next_index(&self) -> SeqIndex {
        self.ctx.next_index
    }

    /// Render `stage` and record its ops, routing frames through `gate`.
    pub fn render_stage(&mut self, stage: &Stage, gate: Gate) -> QuakereelResult<StageSpan> {
        let out = stage.generate(&self.ctx, self.fps)?;
        let span = StageSpan {
            start: self.ctx.next_index,
            frames: out.frames.len() as u64,
        };
        for params in out.frames {
            let idx = params.index.ok_or_else(|| {
                QuakereelError::planning(format!("stage '{}' emitted a frame without index", stage.name))
            })?;
            self.coverage.render(idx)?;
            let dependency = match gate {
                Gate::Ready => None,
                Gate::AfterPrep => Some(DependencyKey::AfterPrep),
                Gate::Timestep => match params.layer {
                    FrameLayer::GroundMotion { timestep, .. } => {
                        Some(DependencyKey::Timestep(timestep))
                    }
                    _ => {
                        return Err(QuakereelError::planning(format!(
                            "stage '{}' is gated by timestep but frame {idx} shows no ground motion",
                            stage.name
                        )));
                    }
                },
            };
            let job = FrameJob { params, dependency };
            if dependency.is_some() {
                self.gated.push(job);
            } else {
                self.ready.push(Job::RenderFrame(job));
            }
        }
        for op in out.ops {
            self.record(op)?;
        }
        self.ctx = out.next;
        tracing::debug!(
            stage = %stage.name,
            start = span.start.0,
            frames = span.frames,
            next = self.ctx.next_index.0,
            "stage planned"
        );
        Ok(span)
    }

    /// Validate and append an op, advancing the next index past anything it creates.
    pub fn record(&mut self, op: SequenceOp) -> QuakereelResult<()> {
        self.coverage.apply(&op)?;
        if let Some(last) = self.coverage.last()
            && last.0 + 1 > self.ctx.next_index.0
        {
            self.ctx.next_index = last.after(1);
        }
        self.ops.push(op);
        Ok(())
    }

    /// Hold the last existing frame for `frames` extra frames.
    pub fn pause(&mut self, frames: u64) -> QuakereelResult<()> {
        if frames == 0 {
            return Ok(());
        }
        let last = self
            .coverage
            .last()
            .ok_or_else(|| QuakereelError::planning("pause before any frame exists"))?;
        self.record(SequenceOp::Duplicate {
            source: last,
            count: frames as i64,
        })
    }

    /// Hold the last frame for `end` frames and the first for `start` frames.
    pub fn pad(&mut self, start: u64, end: u64) -> QuakereelResult<()> {
        self.pause(end)?;
        if start == 0 {
            return Ok(());
        }
        let total = self.ctx.next_index.0;
        self.record(SequenceOp::Shift {
            source: SeqIndex(0),
            length: total,
            offset: start as i64,
        })?;
        self.record(SequenceOp::Duplicate {
            source: SeqIndex(start),
            count: -(start as i64),
        })
    }

    /// Check the timeline is contiguous and hand over the plan.
    pub fn finish(self) -> QuakereelResult<TimelinePlan> {
        let total = self.ctx.next_index.0;
        self.coverage.ensure_contiguous(total)?;
        if !self.gated.is_empty() && self.prep.is_none() {
            return Err(QuakereelError::planning(format!(
                "{} gated frames have no prep job to release them",
                self.gated.len()
            )));
        }
        let timesteps = self.prep.map_or(0, |p| p.timesteps);
        tracing::info!(
            total,
            rendered = self.coverage.rendered(),
            synthesized = self.coverage.synthesized(),
            ops = self.ops.len(),
            gated = self.gated.len(),
            "timeline planned"
        );
        Ok(TimelinePlan {
            ready: self.ready,
            gated: self.gated,
            ops: self.ops,
            total_frames: total,
            timesteps,
            prep: self.prep,
            rendered_frames: self.coverage.rendered(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plan/timeline.rs"]
mod tests;
