//! Environment-driven configuration.
//!
//! Unset or empty variables fall back to defaults; values that are present but
//! unparsable are rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::lang::Lang;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MIN_LANGUAGE_CONFIDENCE: f32 = 0.5;
const DEFAULT_GRADE_CONCURRENCY: usize = 4;
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_INDEX_PATH: &str = "heritage_index.json";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_CHAT_MODEL: &str = "aya-expanse:8b";
const DEFAULT_EMBED_MODEL: &str = "paraphrase-multilingual";

const NOT_FOUND_AR: &str = "لم أتمكن من إيجاد معلومات ذات صلة بعد محاولات متعددة.";
const NOT_FOUND_EN: &str = "Could not find relevant information after multiple attempts.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Inconsistent(String),
}

/// Knobs consumed by the workflow controller.
#[derive(Debug, Clone)]
pub struct Settings {
    pub top_k: usize,
    pub max_attempts: u32,
    pub language_set: Vec<Lang>,
    pub default_language: Lang,
    pub min_language_confidence: f32,
    pub not_found_templates: BTreeMap<Lang, String>,
    pub grade_concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            language_set: Lang::ALL.to_vec(),
            default_language: Lang::English,
            min_language_confidence: DEFAULT_MIN_LANGUAGE_CONFIDENCE,
            not_found_templates: BTreeMap::from([
                (Lang::Arabic, NOT_FOUND_AR.to_string()),
                (Lang::English, NOT_FOUND_EN.to_string()),
            ]),
            grade_concurrency: DEFAULT_GRADE_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Inconsistent("top_k must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Inconsistent(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::Inconsistent(
                "call_timeout must be greater than zero".into(),
            ));
        }
        if self.language_set.is_empty() {
            return Err(ConfigError::Inconsistent("language_set is empty".into()));
        }
        if !self.language_set.contains(&self.default_language) {
            return Err(ConfigError::Inconsistent(format!(
                "default language '{}' is not in the language set",
                self.default_language
            )));
        }
        Ok(())
    }

    /// Renders the "no answer found" message for `lang`, substituting
    /// `{question}`. Falls back to the English template when `lang` has none.
    pub fn not_found_message(&self, lang: Lang, question: &str) -> String {
        let template = self
            .not_found_templates
            .get(&lang)
            .or_else(|| self.not_found_templates.get(&Lang::English))
            .map(String::as_str)
            .unwrap_or(NOT_FOUND_EN);
        template.replace("{question}", question)
    }
}

/// Connection settings for the Ollama model server.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embed_model: String,
    pub temperature: Option<f32>,
}

/// Full application configuration.
///
/// Environment variables:
/// - `RAG_TOP_K`, `RAG_MAX_ATTEMPTS`, `RAG_LANGUAGES`, `RAG_DEFAULT_LANGUAGE`,
///   `RAG_MIN_LANGUAGE_CONFIDENCE`, `RAG_NOT_FOUND_AR`, `RAG_NOT_FOUND_EN`,
///   `RAG_GRADE_CONCURRENCY`, `RAG_CALL_TIMEOUT_SECS`, `RAG_INDEX_PATH`
/// - `OLLAMA_BASE_URL`, `OLLAMA_CHAT_MODEL`, `OLLAMA_EMBED_MODEL`,
///   `OLLAMA_TEMPERATURE`
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub ollama: OllamaSettings,
    pub index_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Settings::default();
        let mut not_found_templates = defaults.not_found_templates.clone();
        if let Some(t) = get("RAG_NOT_FOUND_AR") {
            not_found_templates.insert(Lang::Arabic, t);
        }
        if let Some(t) = get("RAG_NOT_FOUND_EN") {
            not_found_templates.insert(Lang::English, t);
        }

        let language_set = match get("RAG_LANGUAGES") {
            Some(raw) => parse_language_set(&raw)?,
            None => defaults.language_set,
        };

        let settings = Settings {
            top_k: parse(&get, "RAG_TOP_K", defaults.top_k)?,
            max_attempts: parse(&get, "RAG_MAX_ATTEMPTS", defaults.max_attempts)?,
            language_set,
            default_language: parse(&get, "RAG_DEFAULT_LANGUAGE", defaults.default_language)?,
            min_language_confidence: parse(
                &get,
                "RAG_MIN_LANGUAGE_CONFIDENCE",
                defaults.min_language_confidence,
            )?,
            not_found_templates,
            grade_concurrency: parse(&get, "RAG_GRADE_CONCURRENCY", defaults.grade_concurrency)?
                .max(1),
            call_timeout: Duration::from_secs(parse(
                &get,
                "RAG_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )?),
        };
        settings.validate()?;

        let temperature = get("OLLAMA_TEMPERATURE")
            .map(|raw| parse_value::<f32>("OLLAMA_TEMPERATURE", raw))
            .transpose()?;

        Ok(Self {
            settings,
            ollama: OllamaSettings {
                base_url: get("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                chat_model: get("OLLAMA_CHAT_MODEL")
                    .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                embed_model: get("OLLAMA_EMBED_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
                temperature,
            },
            index_path: get("RAG_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
        })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => parse_value(key, raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value: raw,
    })
}

fn parse_language_set(raw: &str) -> Result<Vec<Lang>, ConfigError> {
    let mut langs = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let lang = part.parse::<Lang>().map_err(|e| ConfigError::Invalid {
            key: "RAG_LANGUAGES",
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !langs.contains(&lang) {
            langs.push(lang);
        }
    }
    Ok(langs)
}
