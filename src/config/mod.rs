// src/config/mod.rs
// Environment-sourced configuration. Credentials have no defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ChatError, Result};

/// Which delta source answers chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Offline echo backend for demos and tests
    Mock,
    /// OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl FromStr for Provider {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "mock" => Ok(Provider::Mock),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ChatError::Config(format!(
                "AI_PROVIDER must be 'mock' or 'openai', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Mock => write!(f, "mock"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Upstream LLM settings
#[derive(Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

// Hand-written so the key never reaches logs
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// TTS/ASR vendor settings
#[derive(Clone)]
pub struct MediaConfig {
    pub api_key: Option<String>,
    pub tts_url: String,
    pub asr_url: String,
    pub tts_voice: String,
    pub tts_encoding: String,
}

impl fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("tts_url", &self.tts_url)
            .field("asr_url", &self.asr_url)
            .field("tts_voice", &self.tts_voice)
            .field("tts_encoding", &self.tts_encoding)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // ── Chat backend
    pub provider: Provider,
    pub upstream: UpstreamConfig,
    pub mock_char_delay: Duration,
    pub persona_dir: PathBuf,

    // ── Conversation sessions
    pub session_ttl: Duration,
    pub session_history_cap: usize,

    // ── Media proxies
    pub media: MediaConfig,

    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub log_level: String,
}

/// Strip a trailing ` # comment` and whitespace from a raw env value.
///
/// Only a `#` at the start or after whitespace opens a comment, so URL
/// fragments survive.
fn clean_value(raw: &str) -> &str {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|&(i, c)| c == '#' && raw[..i].chars().next_back().is_none_or(char::is_whitespace))
        .map_or(raw.len(), |(i, _)| i);
    raw[..end].trim_end()
}

fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let clean = clean_value(&raw);
            if clean.is_empty() {
                return Ok(default);
            }
            clean
                .parse::<T>()
                .map_err(|_| ChatError::Config(format!("{} has invalid value '{}'", key, clean)))
        }
        None => Ok(default),
    }
}

/// Secrets are taken verbatim (no comment stripping, '#' may be part of a key)
fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        // A missing .env is normal in production
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider: Provider = env_var_or(&lookup, "AI_PROVIDER", Provider::Mock)?;

        let config = Self {
            provider,
            upstream: UpstreamConfig {
                base_url: env_var_or(
                    &lookup,
                    "OPENAI_BASE_URL",
                    "https://api.openai.com/v1".to_string(),
                )?,
                model: env_var_or(&lookup, "OPENAI_MODEL", "gpt-4o-mini".to_string())?,
                api_key: secret(&lookup, "OPENAI_API_KEY"),
            },
            mock_char_delay: Duration::from_millis(env_var_or(&lookup, "MOCK_CHAR_DELAY_MS", 5u64)?),
            persona_dir: PathBuf::from(env_var_or(&lookup, "PERSONA_DIR", "personas".to_string())?),
            session_ttl: Duration::from_secs(env_var_or(&lookup, "SESSION_TTL_SECS", 1800u64)?),
            session_history_cap: env_var_or(&lookup, "SESSION_HISTORY_CAP", 100usize)?,
            media: MediaConfig {
                api_key: secret(&lookup, "MEDIA_API_KEY"),
                tts_url: env_var_or(
                    &lookup,
                    "TTS_URL",
                    "https://openai.qiniu.com/v1/voice/tts".to_string(),
                )?,
                asr_url: env_var_or(
                    &lookup,
                    "ASR_URL",
                    "https://openai.qiniu.com/v1/voice/asr".to_string(),
                )?,
                tts_voice: env_var_or(&lookup, "TTS_VOICE", "qiniu_zh_female_wwxkjx".to_string())?,
                tts_encoding: env_var_or(&lookup, "TTS_ENCODING", "mp3".to_string())?,
            },
            host: env_var_or(&lookup, "HOST", "0.0.0.0".to_string())?,
            port: env_var_or(&lookup, "PORT", 8000u16)?,
            cors_origin: env_var_or(&lookup, "CORS_ORIGIN", "*".to_string())?,
            log_level: env_var_or(&lookup, "LOG_LEVEL", "info".to_string())?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.provider == Provider::OpenAi && self.upstream.api_key.is_none() {
            return Err(ChatError::Config(
                "AI_PROVIDER=openai requires OPENAI_API_KEY".to_string(),
            ));
        }
        if self.session_history_cap == 0 {
            return Err(ChatError::Config(
                "SESSION_HISTORY_CAP must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_select_mock() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.provider, Provider::Mock);
        assert!(config.upstream.api_key.is_none());
        assert!(config.media.api_key.is_none());
        assert_eq!(config.port, 8000);
        assert_eq!(config.mock_char_delay, Duration::from_millis(5));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_openai_requires_key() {
        let err = config_from(&[("AI_PROVIDER", "openai")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_openai_with_key() {
        let config = config_from(&[
            ("AI_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "qwen3-max"),
        ])
        .unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.upstream.model, "qwen3-max");
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = config_from(&[("AI_PROVIDER", "llama")]).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_comments_are_stripped() {
        let config = config_from(&[("PORT", " 9000   # dev port ")]).unwrap();
        assert_eq!(config.port, 9000);

        let config = config_from(&[("PERSONA_DIR", "# unset")]).unwrap();
        assert_eq!(config.persona_dir, PathBuf::from("personas"));
    }

    #[test]
    fn test_url_fragment_is_kept() {
        let config = config_from(&[
            ("TTS_URL", "https://vendor.example/tts#v2"),
            ("ASR_URL", "https://vendor.example/asr#v2  # staging"),
        ])
        .unwrap();
        assert_eq!(config.media.tts_url, "https://vendor.example/tts#v2");
        assert_eq!(config.media.asr_url, "https://vendor.example/asr#v2");
        assert_eq!(clean_value("a#b"), "a#b");
        assert_eq!(clean_value("\t# only a comment"), "");
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = config_from(&[
            ("AI_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-very-secret"),
            ("MEDIA_API_KEY", "media-secret"),
        ])
        .unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-very-secret"));
        assert!(!printed.contains("media-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
