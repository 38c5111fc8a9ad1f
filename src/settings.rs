//! Startup settings
//!
//! Window size, image paths, and the initial blend mode, loaded from a
//! `settings.json` next to the working directory. A missing file means
//! defaults; a malformed file is fatal. Per-tick frame parameters are
//! never persisted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::BlendMode;
use crate::error::StartupError;

fn default_window_width() -> u32 {
    800
}

fn default_window_height() -> u32 {
    400
}

fn default_background() -> PathBuf {
    PathBuf::from("assets/background.png")
}

fn default_overlay() -> PathBuf {
    PathBuf::from("assets/overlay.png")
}

fn default_layers() -> Vec<PathBuf> {
    vec![
        PathBuf::from("assets/layer1.png"),
        PathBuf::from("assets/layer2.png"),
        PathBuf::from("assets/layer3.png"),
        PathBuf::from("assets/layer4.png"),
    ]
}

/// Application settings loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Initial window width in logical pixels
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Initial window height in logical pixels
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Background image path
    #[serde(default = "default_background")]
    pub background: PathBuf,

    /// Overlay image path (always drawn when layers are blended)
    #[serde(default = "default_overlay")]
    pub overlay: PathBuf,

    /// Extra layer image paths; the stack size is fixed at load time
    #[serde(default = "default_layers")]
    pub layers: Vec<PathBuf>,

    /// Blend mode selected when the app starts
    #[serde(default)]
    pub blend_mode: BlendMode,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            background: default_background(),
            overlay: default_overlay(),
            layers: default_layers(),
            blend_mode: BlendMode::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist. A file that exists but fails to parse is fatal.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(StartupError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|e| StartupError::Settings {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), StartupError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StartupError::Settings {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| StartupError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.window_width, 800);
        assert_eq!(settings.window_height, 400);
        assert_eq!(settings.layers.len(), 4);
        assert_eq!(settings.blend_mode, BlendMode::Alpha);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut settings = AppSettings::default();
        settings.blend_mode = BlendMode::Screen;
        settings.layers.truncate(2);

        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(back.blend_mode, BlendMode::Screen);
        assert_eq!(back.layers.len(), 2);
        assert_eq!(back.window_width, settings.window_width);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"blend_mode":"Additive"}"#).unwrap();
        assert_eq!(settings.blend_mode, BlendMode::Additive);
        assert_eq!(settings.window_width, 800);
        assert_eq!(settings.layers.len(), 4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = AppSettings::load(Path::new("does/not/exist.json")).unwrap();
        assert_eq!(settings.window_width, 800);
    }
}
