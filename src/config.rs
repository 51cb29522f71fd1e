use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::QualityTier;
use crate::errors::{AppError, Result};

const ENV_PREFIX: &str = "SOUNDDECK";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub download_path: PathBuf,
    pub source: String,
    pub quality: QualityTier,
    pub search_count: u32,
    pub api_base: String,
    pub media_proxy: Option<String>,
    pub proxy: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub cover_size: u32,
    pub prefer_translated_lyrics: bool,
    pub collision_policy: CollisionPolicy,
    pub metaflac: ToolSetting,
    pub flac: ToolSetting,
}

/// What a folder destination does when a batch produces the same file name twice.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    Overwrite,
    Suffix,
}

/// An external program plus any leading arguments it needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ToolSetting {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolSetting {
    pub fn named(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }
}

impl Default for ToolSetting {
    fn default() -> Self {
        Self::named("")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_path: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            source: "netease".to_string(),
            quality: QualityTier::Kbps320,
            search_count: 20,
            api_base: "https://music-api.gdstudio.xyz/api.php".to_string(),
            media_proxy: None,
            proxy: None,
            request_timeout_secs: 60,
            user_agent: format!("sounddeck/{}", env!("CARGO_PKG_VERSION")),
            cover_size: 500,
            prefer_translated_lyrics: true,
            collision_policy: CollisionPolicy::Suffix,
            metaflac: ToolSetting::named("metaflac"),
            flac: ToolSetting::named("flac"),
        }
    }
}

impl AppConfig {
    /// Loads the user config file, then applies `SOUNDDECK_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.fill_blank_tools();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(config_dir) = path.parent() {
            if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
                std::fs::create_dir_all(config_dir)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Config(config::ConfigError::Message("Could not find config directory".to_string())))?;

        Ok(config_dir.join("sounddeck").join("config.json"))
    }

    // A config file that names only `args` for a tool leaves `program` empty.
    fn fill_blank_tools(&mut self) {
        if self.metaflac.program.trim().is_empty() {
            self.metaflac.program = "metaflac".to_string();
        }
        if self.flac.program.trim().is_empty() {
            self.flac.program = "flac".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.cover_size, 500);
        assert_eq!(config.collision_policy, CollisionPolicy::Suffix);
        assert_eq!(config.metaflac.program, "metaflac");
        assert!(config.prefer_translated_lyrics);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "quality": "999", "collision_policy": "overwrite", "flac": { "args": ["--silent"] } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.quality, QualityTier::Lossless999);
        assert_eq!(config.collision_policy, CollisionPolicy::Overwrite);
        assert_eq!(config.flac.program, "flac");
        assert_eq!(config.flac.args, vec!["--silent"]);
        assert_eq!(config.source, "netease");
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.cover_size = 300;
        config.media_proxy = Some("http://localhost:3000/api/proxy".to_string());
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.cover_size, 300);
        assert_eq!(loaded.media_proxy, config.media_proxy);
    }
}
