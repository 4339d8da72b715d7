//! Application configuration
//!
//! Configuration loaded from a droidscope.toml file.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration loaded from droidscope.toml.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Buffer ceiling while live-tailing. The preserving ceiling is derived
    /// from it as a fixed multiple.
    #[serde(default = "default_normal_max")]
    pub normal_max: usize,
}

fn default_normal_max() -> usize {
    droidscope_logs::DEFAULT_NORMAL_MAX
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            normal_max: default_normal_max(),
        }
    }
}

impl Settings {
    /// Load from CWD first, then the user config directory, or use defaults.
    pub fn load() -> Self {
        for path in candidate_paths() {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            match toml::from_str(&content) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "loaded settings");
                    return settings;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "ignoring unparseable settings");
                }
            }
        }

        tracing::debug!("using default settings");
        Self::default()
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("droidscope.toml")];
    if let Ok(home) = env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("droidscope")
                .join("droidscope.toml"),
        );
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let settings = Settings::default();
        assert_eq!(settings.normal_max, droidscope_logs::DEFAULT_NORMAL_MAX);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.normal_max, droidscope_logs::DEFAULT_NORMAL_MAX);
    }

    #[test]
    fn configured_value_wins() {
        let settings: Settings = toml::from_str("normal_max = 500").unwrap();
        assert_eq!(settings.normal_max, 500);
    }
}
