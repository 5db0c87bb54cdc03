//! Rendering seams and the reference collaborators used by tests and smoke runs.

pub mod backend;
pub mod overlay;
pub mod schematic;
