//! Environment configuration for the CLI.

use std::path::PathBuf;

/// Settings read from the environment; command line flags override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Upper bound for one ffmpeg render
    pub render_timeout_secs: u64,
    /// Renders allowed to run at once
    pub max_render_parallel: usize,
    /// Default root for collection and aggregation outputs
    pub output_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            render_timeout_secs: 600,
            max_render_parallel: 1,
            output_dir: None,
        }
    }
}

impl CliConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            render_timeout_secs: std::env::var("BLINDPAIR_RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.render_timeout_secs),
            max_render_parallel: std::env::var("BLINDPAIR_MAX_RENDER_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_render_parallel),
            output_dir: std::env::var("BLINDPAIR_OUTPUT_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Output root for a command: flag, then environment, then `fallback`.
    pub fn output_root(&self, flag: Option<PathBuf>, fallback: &str) -> PathBuf {
        flag.or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("BLINDPAIR_RENDER_TIMEOUT_SECS");
        std::env::remove_var("BLINDPAIR_MAX_RENDER_PARALLEL");
        std::env::remove_var("BLINDPAIR_OUTPUT_DIR");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        assert_eq!(CliConfig::from_env(), CliConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("BLINDPAIR_RENDER_TIMEOUT_SECS", "120");
        std::env::set_var("BLINDPAIR_MAX_RENDER_PARALLEL", "0");
        std::env::set_var("BLINDPAIR_OUTPUT_DIR", "/tmp/study");

        let config = CliConfig::from_env();
        assert_eq!(config.render_timeout_secs, 120);
        assert_eq!(config.max_render_parallel, 1);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/study")));
        clear_env();
    }

    #[test]
    fn test_output_root_precedence() {
        let config = CliConfig {
            output_dir: Some(PathBuf::from("env")),
            ..CliConfig::default()
        };
        assert_eq!(config.output_root(Some("flag".into()), "x"), PathBuf::from("flag"));
        assert_eq!(config.output_root(None, "x"), PathBuf::from("env"));
        assert_eq!(CliConfig::default().output_root(None, "x"), PathBuf::from("x"));
    }
}
