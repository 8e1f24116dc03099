use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prompt used by the console shell when none is configured.
pub const DEFAULT_CONSOLE_PROMPT: &str = "game> ";

/// Commands kept in a line discipline's history ring when not configured.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// How long a stopping shell waits for its output pump to drain.
pub const DRAIN_TIMEOUT_MS: u64 = 2_000;

/// Top-level config (termhost.toml + TERMHOST_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermhostConfig {
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Console-shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Prompt string printed before every input line.
    /// Override with env var: TERMHOST_CONSOLE_PROMPT
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

fn default_prompt() -> String {
    DEFAULT_CONSOLE_PROMPT.to_string()
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.termhost/termhost.toml", home)
}

impl TermhostConfig {
    /// Load config from a TOML file with TERMHOST_* env var overrides.
    ///
    /// A missing file is not an error — figment treats it as empty and the
    /// serde defaults apply.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: TermhostConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TERMHOST_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Like [`TermhostConfig::load`], but a failed load falls back to
    /// defaults instead of failing the caller.
    ///
    /// Shells load their prompt through this path so that a corrupt config
    /// file can never prevent a shell from starting.
    pub fn load_or_default(config_path: Option<&str>) -> Self {
        match Self::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_missing() {
        let config = TermhostConfig::load(Some("/nonexistent/termhost.toml")).unwrap();
        assert_eq!(config.console.prompt, DEFAULT_CONSOLE_PROMPT);
    }

    #[test]
    fn prompt_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termhost.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[console]\nprompt = \"lab> \"").unwrap();

        let config = TermhostConfig::load(path.to_str()).unwrap();
        assert_eq!(config.console.prompt, "lab> ");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("termhost.toml");
        std::fs::write(&path, "console = {{{not toml").unwrap();

        assert!(TermhostConfig::load(path.to_str()).is_err());

        let config = TermhostConfig::load_or_default(path.to_str());
        assert_eq!(config.console.prompt, DEFAULT_CONSOLE_PROMPT);
    }
}
