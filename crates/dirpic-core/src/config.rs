use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Pictures taken before this hour are put in the previous day's album.
pub const DEFAULT_BOUNDARY_HOUR: u32 = 6;

/// Extensions processed when no explicit set is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "heic", "heif", "tiff", "tif", // images
    "avi", "mpg", "mp4", "mov", // videos
];

fn default_boundary_hour() -> u32 {
    DEFAULT_BOUNDARY_HOUR
}

fn default_extensions() -> BTreeSet<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Runtime configuration shared by the classifier and the date resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Hour of day below which a capture belongs to the previous day.
    #[serde(default = "default_boundary_hour")]
    pub boundary_hour: u32,
    /// Recognized media extensions, lowercase, without the leading dot.
    #[serde(default = "default_extensions", deserialize_with = "deserialize_extensions")]
    pub extensions: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            boundary_hour: default_boundary_hour(),
            extensions: default_extensions(),
        }
    }
}

/// Lowercase an extension and strip any leading dot: `".JPG"` -> `"jpg"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

fn deserialize_extensions<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().map(|e| normalize_extension(e)).collect())
}

impl Config {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_boundary_hour(mut self, hour: u32) -> Self {
        self.boundary_hour = hour;
        self
    }

    /// Replace the recognized extension set.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.boundary_hour > 23 {
            anyhow::bail!(
                "boundary hour must be between 0 and 23, got {}",
                self.boundary_hour
            );
        }
        if self.extensions.is_empty() {
            anyhow::bail!("no media extensions configured");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.boundary_hour, 6);
        assert!(config.extensions.contains("jpg"));
        assert!(config.extensions.contains("mov"));
        assert!(!config.extensions.contains("png"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirpic.json");
        File::create(&path)
            .unwrap()
            .write_all(br#"{"extensions": [".PNG", "webp"]}"#)
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.boundary_hour, DEFAULT_BOUNDARY_HOUR);
        assert_eq!(
            config.extensions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["png", "webp"]
        );
    }

    #[test]
    fn test_invalid_boundary_hour() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirpic.json");
        File::create(&path)
            .unwrap()
            .write_all(br#"{"boundary_hour": 24}"#)
            .unwrap();

        assert!(Config::load(&path).is_err());
        assert!(Config::default().with_boundary_hour(25).validate().is_err());
    }

    #[test]
    fn test_with_extensions_normalizes() {
        let config = Config::default().with_extensions([".GIF", "Png", "."]);
        assert_eq!(config.extensions.len(), 2);
        assert!(config.extensions.contains("gif"));
        assert!(config.extensions.contains("png"));
    }
}
