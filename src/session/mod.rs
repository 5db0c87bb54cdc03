//! End-to-end runs: plan, dispatch, compile, verify.

pub mod animation;
