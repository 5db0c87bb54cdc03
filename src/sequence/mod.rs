//! Frame sequence algebra.
//!
//! Rendering produces a sparse set of frames. The ops recorded while planning expand them into
//! the full, contiguous output timeline: pauses become duplicates, return trips become reversed
//! copies, and start padding shifts the whole movie.

/// Ordered execution of ops against frame files.
pub mod compiler;
/// Planning-time model of which indices exist.
pub mod coverage;
/// File fingerprints.
pub mod digest;
/// The op variants and their closed-form index mappings.
pub mod op;
/// Frame and overlay file naming.
pub mod store;
