//! Creator resolution: turning an artwork's free-text creator field into
//! linked creator entities, creating stubs where nothing matches.

mod names;
mod resolver;

pub use names::split_creator_names;
pub use resolver::{CreatorResolution, CreatorResolver, ResolveOptions};
