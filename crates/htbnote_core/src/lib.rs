pub mod config;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod frontmatter;
pub mod merge;
pub mod plan;
pub mod slug;
pub mod transport;

pub use enrich::{EnrichReport, EnrichRequest, enrich};
pub use error::EnrichError;
