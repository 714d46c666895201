//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `-f`), then applies `RECRUITGENIE_DB_PATH`,
//! `RECRUITGENIE_LOG_LEVEL` and `RECRUITGENIE_BIND` env overrides.
//! The model credential is read from `GEMINI_API_KEY` only.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::AppError;
use crate::logger;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Socket address to bind the HTTP listener to.
    pub bind: String,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

/// Gemini provider configuration, from `[llm.gemini]`.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, without the `/models/...` suffix.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"gemini"` or `"dummy"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub gemini: GeminiConfig,
}

/// Sales assistant behaviour, from `[assistant]`.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Model turn seeded into an empty session on first history fetch.
    pub greeting: String,
    /// Reply substituted when the model call or its output fails.
    pub fallback_reply: String,
    /// Replay at most this many stored turns to the model. `None` replays all.
    pub max_history_turns: Option<usize>,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    /// Validated at load time; an unknown level is a config error.
    pub log_level: LevelFilter,
    /// SQLite database file (already expanded, no `~`).
    pub db_path: PathBuf,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub assistant: AssistantConfig,
    /// API key from `GEMINI_API_KEY`. Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

/// Env-sourced values that win over the TOML file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub db_path: Option<String>,
    pub log_level: Option<String>,
    pub bind: Option<String>,
    pub api_key: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("RECRUITGENIE_DB_PATH").ok(),
            log_level: env::var("RECRUITGENIE_LOG_LEVEL").ok(),
            bind: env::var("RECRUITGENIE_BIND").ok(),
            api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    assistant: RawAssistant,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_db_path")]
    db_path: String,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_http_bind")]
    bind: String,
    #[serde(default)]
    cors_allowed_origins: Vec<String>,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { bind: default_http_bind(), cors_allowed_origins: Vec::new() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGeminiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), gemini: RawGeminiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_model")]
    model: String,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default = "default_gemini_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            temperature: None,
            timeout_seconds: default_gemini_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawAssistant {
    #[serde(default = "default_greeting")]
    greeting: String,
    #[serde(default = "default_fallback_reply")]
    fallback_reply: String,
    #[serde(default)]
    max_history_turns: Option<usize>,
}

impl Default for RawAssistant {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            fallback_reply: default_fallback_reply(),
            max_history_turns: None,
        }
    }
}

fn default_name() -> String { "recruitgenie".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_db_path() -> String { "agent_memory.db".to_string() }
fn default_http_bind() -> String { "0.0.0.0:5001".to_string() }
fn default_llm_provider() -> String { "gemini".to_string() }
fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_gemini_timeout_seconds() -> u64 { 60 }

pub fn default_greeting() -> String {
    "Hello! I'm your AI sales assistant from 'RecruitGenie'. How can I help you with your hiring needs today?"
        .to_string()
}

pub fn default_fallback_reply() -> String {
    "I'm having a bit of trouble connecting right now. Could you please try again in a moment?"
        .to_string()
}

/// Load config from `path` (default `config/default.toml`), then apply env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path = Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH));
    load_from(path, Overrides::from_env())
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.service;
    let db_path = expand_home(overrides.db_path.as_deref().unwrap_or(&s.db_path));
    let log_level = logger::parse_level(overrides.log_level.as_deref().unwrap_or(&s.log_level))?;

    if parsed.assistant.max_history_turns == Some(0) {
        return Err(AppError::Config(
            "assistant.max_history_turns must be at least 1 when set".into(),
        ));
    }

    Ok(Config {
        name: s.name,
        log_level,
        db_path,
        http: HttpConfig {
            bind: overrides.bind.unwrap_or(parsed.http.bind),
            cors_allowed_origins: parsed.http.cors_allowed_origins,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url.trim_end_matches('/').to_string(),
                model: parsed.llm.gemini.model,
                temperature: parsed.llm.gemini.temperature,
                timeout_seconds: parsed.llm.gemini.timeout_seconds,
            },
        },
        assistant: AssistantConfig {
            greeting: parsed.assistant.greeting,
            fallback_reply: parsed.assistant.fallback_reply,
            max_history_turns: parsed.assistant.max_history_turns,
        },
        llm_api_key: overrides.api_key,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API key, database under `dir`.
    pub fn test_default(dir: &Path) -> Self {
        Self {
            name: "test".into(),
            log_level: LevelFilter::INFO,
            db_path: dir.join("test_memory.db"),
            http: HttpConfig {
                bind: "127.0.0.1:0".into(),
                cors_allowed_origins: Vec::new(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                gemini: GeminiConfig {
                    api_base_url: "http://127.0.0.1:1/v1beta".into(),
                    model: "test-model".into(),
                    temperature: None,
                    timeout_seconds: 2,
                },
            },
            assistant: AssistantConfig {
                greeting: default_greeting(),
                fallback_reply: default_fallback_reply(),
                max_history_turns: None,
            },
            llm_api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[service]
name = "test-genie"
log_level = "info"
db_path = "~/.recruitgenie/memory.db"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Overrides::default()).unwrap();
        assert_eq!(cfg.name, "test-genie");
        assert_eq!(cfg.log_level, LevelFilter::INFO);
        assert_eq!(cfg.http.bind, "0.0.0.0:5001");
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.gemini.model, "gemini-1.5-flash");
        assert_eq!(cfg.assistant.max_history_turns, None);
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn db_path_tilde_expands() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Overrides::default()).unwrap();
        assert!(cfg.db_path.starts_with(&home));
        assert!(cfg.db_path.ends_with("memory.db"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn relative_path_unchanged() {
        assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), Overrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn overrides_win_over_toml() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(
            f.path(),
            Overrides {
                db_path: Some("/tmp/override.db".into()),
                log_level: Some("debug".into()),
                bind: Some("127.0.0.1:9000".into()),
                api_key: Some("secret".into()),
            },
        )
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/override.db"));
        assert_eq!(cfg.log_level, LevelFilter::DEBUG);
        assert_eq!(cfg.http.bind, "127.0.0.1:9000");
        assert_eq!(cfg.llm_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn llm_and_assistant_sections_parse() {
        let f = write_toml(
            r#"
[service]

[llm]
default = "dummy"

[llm.gemini]
api_base_url = "http://localhost:8080/v1beta/"
model = "gemini-2.0-flash"
temperature = 0.4

[assistant]
max_history_turns = 40
"#,
        );
        let cfg = load_from(f.path(), Overrides::default()).unwrap();
        assert_eq!(cfg.llm.provider, "dummy");
        assert_eq!(cfg.llm.gemini.api_base_url, "http://localhost:8080/v1beta");
        assert_eq!(cfg.llm.gemini.temperature, Some(0.4));
        assert_eq!(cfg.assistant.max_history_turns, Some(40));
        assert_eq!(cfg.assistant.greeting, default_greeting());
    }

    #[test]
    fn zero_history_window_rejected() {
        let f = write_toml("[service]\n[assistant]\nmax_history_turns = 0\n");
        assert!(load_from(f.path(), Overrides::default()).is_err());
    }

    #[test]
    fn invalid_log_level_in_toml_rejected() {
        let f = write_toml("[service]\nlog_level = \"loud\"\n");
        let err = load_from(f.path(), Overrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("loud")), "got {err}");
    }

    #[test]
    fn invalid_log_level_override_rejected() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides { log_level: Some("chatty".into()), ..Overrides::default() };
        assert!(matches!(load_from(f.path(), overrides), Err(AppError::Config(_))));
    }
}
