//! Animation configuration and its validation.

pub mod model;
