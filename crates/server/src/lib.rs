//! HTTP front end for the mosaic mass-import pipeline.

pub mod api;
pub mod metrics;
pub mod state;
