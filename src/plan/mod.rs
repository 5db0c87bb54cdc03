//! Timeline planning: render jobs, their gates and the sequence ops that fill the gaps.

pub mod job;
pub mod stage;
pub mod storyboard;
pub mod timeline;
