use crate::api::KNOWN_SOURCES;
use crate::errors::{AppError, Result};
use std::path::{Component, Path};
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Media and cover URLs must be absolute http(s) URLs with a host.
    pub fn validate_url(&self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(AppError::Validation("URL cannot be empty".to_string()));
        }

        let parsed_url = Url::parse(url.trim())
            .map_err(|e| AppError::Validation(format!("Invalid URL: {}", e)))?;

        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "Unsupported URL scheme: {}",
                parsed_url.scheme()
            )));
        }

        if parsed_url.host_str().map_or(true, str::is_empty) {
            return Err(AppError::Validation("URL must have a host".to_string()));
        }

        Ok(())
    }

    pub fn validate_search_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Search query cannot be empty".to_string()));
        }

        if query.chars().count() > 500 {
            return Err(AppError::Validation("Search query too long (max 500 characters)".to_string()));
        }

        Ok(())
    }

    pub fn validate_source(&self, source: &str) -> Result<()> {
        if KNOWN_SOURCES.contains(&source) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Unknown source: {}. Valid sources: {}",
                source,
                KNOWN_SOURCES.join(", ")
            )))
        }
    }

    pub fn validate_download_path(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(AppError::Validation("Download path cannot be empty".to_string()));
        }

        if path.components().any(|component| matches!(component, Component::ParentDir)) {
            return Err(AppError::Validation("Path traversal detected".to_string()));
        }

        if path.to_string_lossy().contains('\0') {
            return Err(AppError::Validation("Null bytes not allowed in download path".to_string()));
        }

        if path.exists() && !path.is_dir() {
            return Err(AppError::Validation("Download path is not a directory".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_must_be_absolute_http() {
        let validator = InputValidator::new();
        assert!(validator.validate_url("https://m701.music.126.net/a.mp3?x=1").is_ok());
        assert!(validator.validate_url("http://127.0.0.1:8080/a").is_ok());
        assert!(validator.validate_url("").is_err());
        assert!(validator.validate_url("/relative/path.mp3").is_err());
        assert!(validator.validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn search_queries_are_bounded() {
        let validator = InputValidator::new();
        assert!(validator.validate_search_query("周杰伦 晴天").is_ok());
        assert!(validator.validate_search_query("   ").is_err());
        assert!(validator.validate_search_query(&"x".repeat(501)).is_err());
    }

    #[test]
    fn only_known_sources_pass() {
        let validator = InputValidator::new();
        assert!(validator.validate_source("netease").is_ok());
        assert!(validator.validate_source("napster").is_err());
    }

    #[test]
    fn download_paths_reject_traversal() {
        let validator = InputValidator::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(validator.validate_download_path(dir.path()).is_ok());
        assert!(validator.validate_download_path(&dir.path().join("new")).is_ok());
        assert!(validator.validate_download_path(Path::new("music/../..")).is_err());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(validator.validate_download_path(&file).is_err());
    }
}
