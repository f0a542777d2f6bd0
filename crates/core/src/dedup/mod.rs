//! Duplicate detection: weighted scoring of incoming records against the
//! catalog, and the merge rules applied when a duplicate is found.

mod engine;
pub mod merge;
pub mod scoring;
mod types;

pub use engine::DuplicateDetector;
pub use merge::{merge_bio, merge_tags};
pub use types::*;
