use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::itinerary::orchestrator::DEFAULT_DAY_PACING;
use crate::itinerary::trip::{DEFAULT_MAX_TRIP_DAYS, DEFAULT_SEARCH_RADIUS_M};
use crate::providers::nominatim::DEFAULT_NOMINATIM_URL;
use crate::providers::overpass::DEFAULT_OVERPASS_URL;
use crate::providers::wikipedia::DEFAULT_GEOSEARCH_URL;

const DEFAULT_MODEL: &str = "o4-mini";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_CONTACT_EMAIL: &str = "dev@example.com";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LOG_DIR: &str = "logs";

/// Optional JSON file at `~/.voyagecraft/voyagecraft.json`. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub planner: PlannerFileConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub search_radius_m: Option<u32>,
    #[serde(default)]
    pub day_pacing_ms: Option<u64>,
    #[serde(default)]
    pub max_trip_days: Option<usize>,
    #[serde(default)]
    pub bind_addr: Option<String>,
    #[serde(default)]
    pub user_agent_email: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerFileConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_nominatim_url")]
    pub nominatim: String,
    #[serde(default = "default_geosearch_url")]
    pub geosearch: String,
    #[serde(default = "default_overpass_url")]
    pub overpass: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            nominatim: default_nominatim_url(),
            geosearch: default_geosearch_url(),
            overpass: default_overpass_url(),
        }
    }
}

impl FileConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config at {}: {}", path.display(), e))?;
        let mut config: FileConfig = serde_json::from_str(&data)
            .map_err(|e| anyhow!("Failed to parse config JSON at {}: {}", path.display(), e))?;

        config.endpoints.nominatim = normalize_url(&config.endpoints.nominatim, default_nominatim_url);
        config.endpoints.geosearch = normalize_url(&config.endpoints.geosearch, default_geosearch_url);
        config.endpoints.overpass = normalize_url(&config.endpoints.overpass, default_overpass_url);
        Ok(config)
    }

    /// A missing file means defaults; an unreadable or invalid one is an error.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }
}

/// Resolved runtime settings: environment first, then the config file, then defaults.
#[derive(Debug, Clone)]
pub struct VoyageConfig {
    pub openai_api_key: String,
    pub openai_org_id: Option<String>,
    pub openai_model: String,
    pub openai_api_base: String,
    pub user_agent_email: String,
    pub search_radius_m: u32,
    pub day_pacing: Duration,
    pub max_trip_days: usize,
    pub bind_addr: String,
    pub log_dir: String,
    pub endpoints: EndpointsConfig,
}

impl VoyageConfig {
    /// Loads `.env` if present, then the config file, then the process environment.
    pub fn load() -> Result<(Self, PathBuf)> {
        dotenvy::dotenv().ok();
        let path = resolve_config_path();
        let file = FileConfig::load_optional(&path)?;
        let config = Self::resolve(file, |key| std::env::var(key).ok())?;
        Ok((config, path))
    }

    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let openai_api_key = var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;
        let openai_org_id = var("OPENAI_ORG_ID");
        let openai_model = var("OPENAI_MODEL")
            .or(file.planner.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let openai_api_base = var("OPENAI_API_BASE")
            .or(file.planner.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let user_agent_email = var("USER_AGENT_EMAIL")
            .or(file.user_agent_email)
            .unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string());

        let search_radius_m = match var("VOYAGECRAFT_SEARCH_RADIUS_M") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("VOYAGECRAFT_SEARCH_RADIUS_M must be a number, got {raw}"))?,
            None => file.search_radius_m.unwrap_or(DEFAULT_SEARCH_RADIUS_M),
        };
        let day_pacing = match var("VOYAGECRAFT_DAY_PACING_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("VOYAGECRAFT_DAY_PACING_MS must be a number, got {raw}"))?,
            ),
            None => file
                .day_pacing_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DAY_PACING),
        };
        let max_trip_days = match var("VOYAGECRAFT_MAX_TRIP_DAYS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("VOYAGECRAFT_MAX_TRIP_DAYS must be a number, got {raw}"))?,
            None => file.max_trip_days.unwrap_or(DEFAULT_MAX_TRIP_DAYS),
        };

        let bind_addr = var("VOYAGECRAFT_BIND_ADDR")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let log_dir = var("VOYAGECRAFT_LOG_DIR")
            .or(file.log_dir)
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        Ok(Self {
            openai_api_key,
            openai_org_id,
            openai_model,
            openai_api_base,
            user_agent_email,
            search_radius_m,
            day_pacing,
            max_trip_days,
            bind_addr,
            log_dir,
            endpoints: file.endpoints,
        })
    }
}

fn normalize_url(value: &str, default: fn() -> String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_nominatim_url() -> String {
    DEFAULT_NOMINATIM_URL.to_string()
}

fn default_geosearch_url() -> String {
    DEFAULT_GEOSEARCH_URL.to_string()
}

fn default_overpass_url() -> String {
    DEFAULT_OVERPASS_URL.to_string()
}

pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("VOYAGECRAFT_CONFIG_PATH") {
        return expand_path(path);
    }

    default_config_path()
}

fn expand_path(input: String) -> PathBuf {
    if let Some(stripped) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(input)
}

fn default_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voyagecraft")
        .join("voyagecraft.json")
}

fn home_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    } else {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = VoyageConfig::resolve(FileConfig::default(), env_of(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.openai_model, "o4-mini");
        assert_eq!(config.openai_api_base, "https://api.openai.com/v1");
        assert_eq!(config.user_agent_email, "dev@example.com");
        assert_eq!(config.search_radius_m, 5000);
        assert_eq!(config.day_pacing, Duration::from_millis(1800));
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.max_trip_days, 30);
        assert_eq!(config.endpoints.overpass, DEFAULT_OVERPASS_URL);
        assert!(config.openai_org_id.is_none());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = VoyageConfig::resolve(FileConfig::default(), env_of(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = FileConfig::default();
        file.planner.model = Some("gpt-4o-mini".to_string());
        file.search_radius_m = Some(3000);
        file.day_pacing_ms = Some(500);
        file.max_trip_days = Some(14);

        let config = VoyageConfig::resolve(
            file,
            env_of(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-5-mini"),
                ("OPENAI_API_BASE", "http://localhost:9999/v1/"),
                ("VOYAGECRAFT_DAY_PACING_MS", "0"),
            ]),
        )
        .unwrap();
        assert_eq!(config.openai_model, "gpt-5-mini");
        assert_eq!(config.openai_api_base, "http://localhost:9999/v1");
        assert_eq!(config.search_radius_m, 3000);
        assert_eq!(config.day_pacing, Duration::ZERO);
        assert_eq!(config.max_trip_days, 14);
    }

    #[test]
    fn test_bad_number_is_reported() {
        let err = VoyageConfig::resolve(
            FileConfig::default(),
            env_of(&[("OPENAI_API_KEY", "sk-test"), ("VOYAGECRAFT_SEARCH_RADIUS_M", "far")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("VOYAGECRAFT_SEARCH_RADIUS_M"));
    }

    #[test]
    fn test_load_file_normalizes_endpoints() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"planner":{{"model":"gpt-4o"}},"endpoints":{{"overpass":"https://overpass.example.org/api/interpreter/","nominatim":"  "}},"bind_addr":"127.0.0.1:8080"}}"#
        )
        .unwrap();

        let config = FileConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.planner.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.endpoints.overpass, "https://overpass.example.org/api/interpreter");
        assert_eq!(config.endpoints.nominatim, DEFAULT_NOMINATIM_URL);
        assert_eq!(config.endpoints.geosearch, DEFAULT_GEOSEARCH_URL);
        assert_eq!(config.bind_addr.as_deref(), Some("127.0.0.1:8080"));
    }

    #[test]
    fn test_missing_file_means_defaults_but_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("voyagecraft.json");
        assert!(FileConfig::load_optional(&missing).unwrap().planner.model.is_none());

        fs::write(&missing, "{not json").unwrap();
        let err = FileConfig::load_optional(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }
}
