use std::path::Path;

use crate::config::{normalize_extension, Config};

/// Extensions of formats that usually carry no EXIF block.
const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mpg", "mpeg", "mp4", "m4v", "mov", "mts", "m2ts", "3gp", "mkv",
];

/// Check if an extension (with or without leading dot, any case) is a recognized media type.
pub fn is_eligible(ext: &str, config: &Config) -> bool {
    let ext = normalize_extension(ext);
    !ext.is_empty() && config.extensions.contains(&ext)
}

/// Check a path by its extension. Paths without an extension are never eligible.
pub fn is_eligible_path(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| is_eligible(ext, config))
}

/// Video containers are expected to fail EXIF decoding.
pub fn is_video(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}
