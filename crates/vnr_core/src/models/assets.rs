//! Source and processed media assets.

use std::sync::Arc;

/// Media type of every processed asset.
///
/// The engine always writes an MP4 container (video stream copied, audio
/// re-encoded to AAC), regardless of the source container.
pub const OUTPUT_MEDIA_TYPE: &str = "video/mp4";

/// The user-selected video, immutable once selected.
///
/// Replaced wholesale when the user selects a new file. Bytes are behind an
/// `Arc` so the presentation layer can hold a preview reference without
/// copying the buffer.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    /// Display name (usually the original file name).
    pub name: String,
    /// Declared media type, e.g. `video/quicktime`.
    pub media_type: String,
    /// File content.
    pub bytes: Arc<Vec<u8>>,
}

impl SourceAsset {
    /// Create a source asset from raw bytes.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// Byte size of the content.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Human-readable size for display.
    pub fn human_size(&self) -> String {
        format_size(self.size())
    }
}

/// Output produced by the engine, owned by the session that produced it.
///
/// Dropped (and its backing buffer released) when a new source is selected
/// or a new run begins.
#[derive(Debug, Clone)]
pub struct ProcessedAsset {
    /// Derived name: `processed-<source name>`.
    pub name: String,
    /// Always [`OUTPUT_MEDIA_TYPE`].
    pub media_type: String,
    /// Output content.
    pub bytes: Arc<Vec<u8>>,
}

impl ProcessedAsset {
    /// Wrap engine output bytes, deriving the name from the source asset.
    pub fn from_engine_output(source_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: format!("processed-{}", source_name),
            media_type: OUTPUT_MEDIA_TYPE.to_string(),
            bytes: Arc::new(bytes),
        }
    }

    /// Byte size of the content.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Format a byte count as a short human-readable string.
///
/// Rounded to two decimals with trailing zeros trimmed: "1.5 KB", not
/// "1.50 KB".
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = (bytes as f64).log(1024.0).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{:.2}", value);
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rounded, UNITS[exp])
}
