use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "htbnote.toml";
pub const DEFAULT_BASE_URL: &str = "https://www.hackthebox.com";
pub const DEFAULT_ASSET_URL_PREFIX: &str =
    "https://htb-mp-prod-public-storage.s3.eu-central-1.amazonaws.com/avatars/";
pub const DEFAULT_OS_LABEL: &str = "os";
pub const DEFAULT_DIFFICULTY_LABEL: &str = "difficulty";
pub const DEFAULT_USER_AGENT: &str = "htbnote/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct NoteConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub http: HttpSection,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SiteSection {
    pub base_url: Option<String>,
    pub asset_url_prefix: Option<String>,
    pub os_label: Option<String>,
    pub difficulty_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub asset_url_prefix: String,
    pub os_label: String,
    pub difficulty_label: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        NoteConfig::default().resolve_with(|_| None)
    }
}

impl NoteConfig {
    /// Resolve settings: env > config > built-in default.
    pub fn resolve(&self) -> Settings {
        self.resolve_with(|name| env::var(name).ok())
    }

    fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Settings {
        let text = |name: &str, configured: &Option<String>, fallback: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| configured.clone())
                .unwrap_or_else(|| fallback.to_string())
        };
        let timeout_ms = lookup("HTB_HTTP_TIMEOUT_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .or(self.http.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let verbose = lookup("HTB_VERBOSE")
            .and_then(|value| parse_flag(&value))
            .or(self.verbose)
            .unwrap_or(false);

        Settings {
            base_url: text("HTB_BASE_URL", &self.site.base_url, DEFAULT_BASE_URL),
            asset_url_prefix: text(
                "HTB_ASSET_URL_PREFIX",
                &self.site.asset_url_prefix,
                DEFAULT_ASSET_URL_PREFIX,
            ),
            os_label: self
                .site
                .os_label
                .clone()
                .unwrap_or_else(|| DEFAULT_OS_LABEL.to_string()),
            difficulty_label: self
                .site
                .difficulty_label
                .clone()
                .unwrap_or_else(|| DEFAULT_DIFFICULTY_LABEL.to_string()),
            user_agent: text("HTB_USER_AGENT", &self.http.user_agent, DEFAULT_USER_AGENT),
            timeout: Duration::from_millis(timeout_ms),
            verbose,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load and parse a NoteConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<NoteConfig> {
    if !config_path.exists() {
        return Ok(NoteConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: NoteConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn resolve_with_env(config: &NoteConfig, vars: &[(&str, &str)]) -> Settings {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        config.resolve_with(|name| vars.get(name).cloned())
    }

    #[test]
    fn default_settings_point_at_public_site() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.asset_url_prefix, DEFAULT_ASSET_URL_PREFIX);
        assert_eq!(settings.os_label, "os");
        assert_eq!(settings.difficulty_label, "difficulty");
        assert_eq!(settings.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(!settings.verbose);
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/htbnote.toml")).expect("load config");
        assert_eq!(config, NoteConfig::default());
    }

    #[test]
    fn load_config_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
verbose = true

[site]
base_url = "https://mirror.example"
asset_url_prefix = "https://cdn.example/avatars/"
os_label = "machine-os"

[http]
user_agent = "test-agent/1.0"
timeout_ms = 500
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        let settings = resolve_with_env(&config, &[]);
        assert_eq!(settings.base_url, "https://mirror.example");
        assert_eq!(settings.asset_url_prefix, "https://cdn.example/avatars/");
        assert_eq!(settings.os_label, "machine-os");
        assert_eq!(settings.difficulty_label, "difficulty");
        assert_eq!(settings.user_agent, "test-agent/1.0");
        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert!(settings.verbose);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&config_path, "[site\nbase_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_overrides_config_values() {
        let config = NoteConfig {
            site: SiteSection {
                base_url: Some("https://config.example".to_string()),
                ..SiteSection::default()
            },
            http: HttpSection {
                user_agent: Some("config-agent".to_string()),
                timeout_ms: Some(100),
            },
            verbose: Some(false),
        };
        let settings = resolve_with_env(
            &config,
            &[
                ("HTB_BASE_URL", " https://env.example "),
                ("HTB_USER_AGENT", "   "),
                ("HTB_HTTP_TIMEOUT_MS", "250"),
                ("HTB_VERBOSE", "yes"),
            ],
        );
        assert_eq!(settings.base_url, "https://env.example");
        assert_eq!(settings.user_agent, "config-agent");
        assert_eq!(settings.timeout, Duration::from_millis(250));
        assert!(settings.verbose);
    }

    #[test]
    fn unparseable_env_values_fall_back() {
        let settings = resolve_with_env(
            &NoteConfig::default(),
            &[("HTB_HTTP_TIMEOUT_MS", "soon"), ("HTB_VERBOSE", "maybe")],
        );
        assert_eq!(settings.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(!settings.verbose);
    }
}
