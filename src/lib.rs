//! quakereel plans and renders long perspective animations of earthquake ruptures.
//!
//! Rendering every frame of such an animation is slow, so the work is split:
//!
//! - [`plan_animation`] turns an [`AnimationConfig`] into render jobs plus [`SequenceOp`]s that
//!   synthesize pauses, reversed runs and padding from frames that already exist
//! - a [`Dispatcher`] hands the jobs to a pool of workers, holding back frames whose ground-motion
//!   overlays have not been prepared yet
//! - a [`SequenceCompiler`] replays the ops over the rendered files, leaving a contiguous,
//!   zero-padded PNG sequence for an external encoder
//!
//! [`AnimationSession`] runs all three.
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod foundation;
pub mod plan;
pub mod render;
pub mod sequence;
pub mod session;

pub use crate::config::model::{
    AnimationConfig, GroundMotionSummary, HazardLayer, PathStep, SceneSummary,
};
pub use crate::dispatch::master::{DispatchReport, Dispatcher, MasterLink};
pub use crate::dispatch::message::{Dispatch, JobOutput, Reply, WorkerId};
pub use crate::dispatch::pool::run_pool;
pub use crate::dispatch::worker::{WorkerEnv, WorkerLink, WorkerLog};
pub use crate::foundation::core::{Fps, SeqIndex};
pub use crate::foundation::error::{QuakereelError, QuakereelResult};
pub use crate::plan::job::{DependencyKey, FrameParams, Job, JobKind};
pub use crate::plan::storyboard::plan_animation;
pub use crate::plan::timeline::{Timeline, TimelinePlan};
pub use crate::render::backend::{OverlayPrep, Renderer};
pub use crate::render::overlay::SyntheticGroundMotion;
pub use crate::render::schematic::SchematicRenderer;
pub use crate::sequence::compiler::{CompileOpts, SequenceCompiler};
pub use crate::sequence::op::SequenceOp;
pub use crate::sequence::store::{EncoderInput, FrameStore};
pub use crate::session::animation::{
    AnimationSession, SessionOpts, SessionOutput, SessionReport,
};
