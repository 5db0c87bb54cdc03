//! Master/worker execution of a plan's jobs, with prep-gated release of dependent frames.

pub mod master;
pub mod message;
pub mod pool;
pub mod tracker;
pub mod worker;
