use std::path::PathBuf;

use anyhow::{Result, anyhow};

const DEFAULT_SESSION_FILE: &str = ".forum_session.json";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: Option<String>,
    pub session_file: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = get_optional(&lookup, "FORUM_API_URL");
        let session_file = get_optional(&lookup, "FORUM_SESSION_FILE")
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string());
        let log_level = get_optional(&lookup, "LOG_LEVEL")
            .or_else(|| get_optional(&lookup, "RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        if session_file.ends_with('/') {
            return Err(anyhow!("FORUM_SESSION_FILE must point to a file, got {session_file}"));
        }

        Ok(Self {
            api_url,
            session_file: PathBuf::from(session_file),
            log_level,
        })
    }
}

fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = settings_from(&[]).expect("settings");
        assert_eq!(settings.api_url, None);
        assert_eq!(settings.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn log_level_prefers_log_level_over_rust_log() {
        let settings =
            settings_from(&[("LOG_LEVEL", "debug"), ("RUST_LOG", "trace")]).expect("settings");
        assert_eq!(settings.log_level, "debug");

        let settings = settings_from(&[("RUST_LOG", "info")]).expect("settings");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn blank_values_are_treated_as_missing() {
        let settings = settings_from(&[("FORUM_API_URL", "  "), ("FORUM_SESSION_FILE", "")])
            .expect("settings");
        assert_eq!(settings.api_url, None);
        assert_eq!(settings.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
    }

    #[test]
    fn session_file_must_not_be_a_directory() {
        assert!(settings_from(&[("FORUM_SESSION_FILE", "/tmp/")]).is_err());
    }
}
