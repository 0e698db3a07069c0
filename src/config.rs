use crate::codec::Scale;
use crate::{error::Result, CodecError};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings shared by the encoder and decoder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodecConfig {
    /// Device pixels per inch, horizontal
    #[serde(default = "default_scale")]
    pub scale_x: f32,
    /// Device pixels per inch, vertical
    #[serde(default = "default_scale")]
    pub scale_y: f32,
    /// WHATWG label of the code page used for non-ASCII text
    #[serde(default = "default_code_page")]
    pub code_page: String,
    /// Content element the annotations belong to, used in `F_NAME`
    #[serde(default = "default_content_element_index")]
    pub content_element_index: u32,
}

fn default_scale() -> f32 {
    96.0
}

fn default_code_page() -> String {
    "windows-1252".to_string()
}

fn default_content_element_index() -> u32 {
    1
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            scale_x: default_scale(),
            scale_y: default_scale(),
            code_page: default_code_page(),
            content_element_index: default_content_element_index(),
        }
    }
}

impl CodecConfig {
    pub fn scale(&self) -> Scale {
        Scale::new(self.scale_x, self.scale_y)
    }

    pub fn code_page(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.code_page.trim().as_bytes()).ok_or_else(|| {
            CodecError::InvalidArgument(format!("Unknown code page label: {}", self.code_page))
        })
    }

    /// Replaces unusable values with defaults. Returns true if anything changed.
    fn normalize(&mut self) -> bool {
        let mut changed = false;
        for scale in [&mut self.scale_x, &mut self.scale_y] {
            if !scale.is_finite() || *scale <= 0.0 {
                *scale = default_scale();
                changed = true;
            }
        }
        if self.content_element_index == 0 {
            self.content_element_index = default_content_element_index();
            changed = true;
        }
        if self.code_page.trim().is_empty() {
            self.code_page = default_code_page();
            changed = true;
        }
        changed
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir()
        .ok_or_else(|| CodecError::Config("Failed to get config directory".to_string()))?;

    path.push("fnanno");
    fs::create_dir_all(&path)?;

    path.push("config.json");
    Ok(path)
}

pub fn load_config(config_path: &Path) -> Result<CodecConfig> {
    if !config_path.exists() {
        info!("No config at {}, writing defaults", config_path.display());
        let default_config = CodecConfig::default();
        save_config(config_path, &default_config)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(config_path)?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CodecError::Config(format!("Failed to parse config: {}", e)))?;
    let mut config: CodecConfig = serde_json::from_value(value.clone())
        .map_err(|e| CodecError::Config(format!("Failed to parse config: {}", e)))?;

    let changed = config.normalize();

    // Persist keys added since the file was written.
    let needs_backfill = value
        .as_object()
        .map(|obj| {
            ["scale_x", "scale_y", "code_page", "content_element_index"]
                .iter()
                .any(|key| !obj.contains_key(*key))
        })
        .unwrap_or(false);
    if needs_backfill || changed {
        debug!("Rewriting config at {}", config_path.display());
        save_config(config_path, &config)?;
    }

    Ok(config)
}

pub fn save_config(config_path: &Path, config: &CodecConfig) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| CodecError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(config_path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = load_config(&path).unwrap();
        assert_eq!(config, CodecConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_is_backfilled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"scale_x": 200.0}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scale_x, 200.0);
        assert_eq!(config.scale_y, 96.0);
        assert_eq!(config.code_page, "windows-1252");

        let content = fs::read_to_string(&path).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(saved["content_element_index"], 1);
    }

    #[test]
    fn test_invalid_values_are_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"scale_x": -1.0, "scale_y": 0.0, "code_page": " ", "content_element_index": 0}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config(&path), Err(CodecError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = CodecConfig {
            scale_x: 300.0,
            scale_y: 150.0,
            code_page: "shift_jis".to_string(),
            content_element_index: 2,
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_code_page_label() {
        let mut config = CodecConfig::default();
        assert_eq!(config.code_page().unwrap(), encoding_rs::WINDOWS_1252);
        config.code_page = "Shift_JIS".to_string();
        assert_eq!(config.code_page().unwrap(), encoding_rs::SHIFT_JIS);
        config.code_page = "klingon".to_string();
        assert!(matches!(config.code_page(), Err(CodecError::InvalidArgument(_))));
    }

    #[test]
    fn test_scale_from_config() {
        let config = CodecConfig {
            scale_x: 200.0,
            scale_y: 100.0,
            ..Default::default()
        };
        assert_eq!(config.scale(), Scale::new(200.0, 100.0));
    }
}
