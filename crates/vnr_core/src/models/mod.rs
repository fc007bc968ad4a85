//! Data model shared across the application.

mod assets;
mod enums;

pub use assets::{format_size, ProcessedAsset, SourceAsset, OUTPUT_MEDIA_TYPE};
pub use enums::{ErrorKind, SessionPhase};
