//! Loader configuration

use std::env;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Page cache budget; `None` keeps every loaded page
    pub max_cached_pages: Option<NonZeroUsize>,
    /// Reject paths without a `.talya` extension
    pub enforce_extension: bool,
    /// Check page bundle size and sha256 against the page index
    pub verify_checksums: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            max_cached_pages: None,
            enforce_extension: true,
            verify_checksums: false,
        }
    }
}

impl LoaderConfig {
    /// Read overrides from `TALYA_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = LoaderConfig::default();
        LoaderConfig {
            max_cached_pages: env::var("TALYA_MAX_CACHED_PAGES")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .and_then(NonZeroUsize::new),
            enforce_extension: env_flag("TALYA_ENFORCE_EXTENSION")
                .unwrap_or(defaults.enforce_extension),
            verify_checksums: env_flag("TALYA_VERIFY_CHECKSUMS")
                .unwrap_or(defaults.verify_checksums),
        }
    }

    pub fn with_max_cached_pages(mut self, pages: usize) -> Self {
        self.max_cached_pages = NonZeroUsize::new(pages);
        self
    }

    pub fn with_enforce_extension(mut self, enforce: bool) -> Self {
        self.enforce_extension = enforce;
        self
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert!(config.max_cached_pages.is_none());
        assert!(config.enforce_extension);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_builders() {
        let config = LoaderConfig::default()
            .with_max_cached_pages(8)
            .with_enforce_extension(false)
            .with_verify_checksums(true);
        assert_eq!(config.max_cached_pages, NonZeroUsize::new(8));
        assert!(!config.enforce_extension);
        assert!(config.verify_checksums);

        // Zero means unbounded
        assert!(config.with_max_cached_pages(0).max_cached_pages.is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
