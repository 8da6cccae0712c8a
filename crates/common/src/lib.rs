//! Common types shared across the mycert crates.

pub mod ids;

pub use ids::{ArtifactKind, ArtifactPrefix};
