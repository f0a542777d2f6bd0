//! Photo acquisition: fetch, validate and store each photo an artwork
//! record references, independently of its siblings.

mod fetcher;
mod pipeline;
mod types;

pub use fetcher::{HttpPhotoFetcher, PhotoFetcher};
pub use pipeline::PhotoPipeline;
pub use types::*;
