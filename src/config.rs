//! Configuration types.
//!
//! Everything is read once at startup. `AppConfig::from_env()` reads the
//! process environment; `AppConfig::from_lookup()` takes any key lookup so
//! tests can supply values without touching global state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_SENTIMENT_URL: &str = "https://api.apilayer.com/sentiment/analysis";
pub const DEFAULT_CATEGORY_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CATEGORY_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_APILAYER_SPAM_URL: &str = "https://api.apilayer.com/spamchecker";
pub const DEFAULT_NINJA_SPAM_URL: &str = "https://api.api-ninjas.com/v1/spamcheck";
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 10_000;

/// Which spam-check provider to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamProvider {
    ApiLayer,
    Ninja,
}

/// Endpoint settings shared by every classifier client.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Full URL of the classification endpoint.
    pub url: String,
    /// API key, if the provider needs one.
    pub api_key: Option<SecretString>,
    /// HTTP request timeout for this client.
    pub timeout: Duration,
}

/// Category classifier settings.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub endpoint: ClassifierConfig,
    /// Chat model asked to pick the category.
    pub model: String,
}

/// Spam-check settings.
#[derive(Debug, Clone)]
pub struct SpamConfig {
    pub provider: SpamProvider,
    pub endpoint: ClassifierConfig,
    /// Score threshold forwarded to providers that accept one.
    pub threshold: f64,
}

/// The set of classifiers to run, each `None` when disabled.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub sentiment: Option<ClassifierConfig>,
    pub category: Option<CategoryConfig>,
    pub spam: Option<SpamConfig>,
    pub geo: Option<ClassifierConfig>,
    /// Hard deadline applied to every individual classifier call.
    pub call_timeout: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            sentiment: None,
            category: None,
            spam: None,
            geo: None,
            call_timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file path, or `:memory:`.
    pub db_path: PathBuf,
    /// HTTP listen address.
    pub bind_addr: SocketAddr,
    /// Directory for rolling log files. Console-only when unset.
    pub log_dir: Option<PathBuf>,
    pub enrichment: EnrichmentConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let db_path = vars
            .string("COMPLAINTS_DB_PATH")
            .unwrap_or_else(|| "./data/complaints.db".to_string())
            .into();

        let bind_addr = vars
            .string("COMPLAINTS_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_addr = bind_addr.parse().map_err(|e| ConfigError::InvalidValue {
            key: "COMPLAINTS_BIND_ADDR".into(),
            message: format!("{bind_addr:?}: {e}"),
        })?;

        let log_dir = vars.string("COMPLAINTS_LOG_DIR").map(PathBuf::from);

        let call_timeout = Duration::from_millis(
            vars.parse("CLASSIFIER_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_MS),
        );

        let sentiment = {
            let api_key = vars.secret("SENTIMENT_API_KEY");
            if vars.flag("SENTIMENT_ENABLED")?.unwrap_or(api_key.is_some()) {
                Some(ClassifierConfig {
                    url: vars
                        .string("SENTIMENT_API_URL")
                        .unwrap_or_else(|| DEFAULT_SENTIMENT_URL.into()),
                    api_key: Some(require(api_key, "SENTIMENT_API_KEY", "sentiment")?),
                    timeout: call_timeout,
                })
            } else {
                None
            }
        };

        let category = {
            let api_key = vars
                .secret("CATEGORY_API_KEY")
                .or_else(|| vars.secret("OPENAI_API_KEY"));
            if vars.flag("CATEGORY_ENABLED")?.unwrap_or(api_key.is_some()) {
                Some(CategoryConfig {
                    endpoint: ClassifierConfig {
                        url: vars
                            .string("CATEGORY_API_URL")
                            .unwrap_or_else(|| DEFAULT_CATEGORY_URL.into()),
                        api_key: Some(require(api_key, "CATEGORY_API_KEY", "category")?),
                        timeout: call_timeout,
                    },
                    model: vars
                        .string("CATEGORY_MODEL")
                        .unwrap_or_else(|| DEFAULT_CATEGORY_MODEL.into()),
                })
            } else {
                None
            }
        };

        let spam = if vars.flag("SPAM_CHECK_ENABLED")?.unwrap_or(false) {
            let provider = match vars.string("SPAM_PROVIDER").as_deref() {
                None | Some("apilayer") => SpamProvider::ApiLayer,
                Some("ninja") => SpamProvider::Ninja,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        key: "SPAM_PROVIDER".into(),
                        message: format!("unknown provider '{other}' (expected apilayer or ninja)"),
                    });
                }
            };
            let default_url = match provider {
                SpamProvider::ApiLayer => DEFAULT_APILAYER_SPAM_URL,
                SpamProvider::Ninja => DEFAULT_NINJA_SPAM_URL,
            };
            Some(SpamConfig {
                provider,
                endpoint: ClassifierConfig {
                    url: vars.string("SPAM_API_URL").unwrap_or_else(|| default_url.into()),
                    api_key: Some(require(vars.secret("SPAM_API_KEY"), "SPAM_API_KEY", "spam check")?),
                    timeout: call_timeout,
                },
                threshold: vars.parse("SPAM_THRESHOLD")?.unwrap_or(2.0),
            })
        } else {
            None
        };

        let geo = if vars.flag("GEO_ENABLED")?.unwrap_or(false) {
            Some(ClassifierConfig {
                url: vars.string("GEO_API_URL").unwrap_or_else(|| DEFAULT_GEO_URL.into()),
                api_key: None,
                timeout: call_timeout,
            })
        } else {
            None
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_dir,
            enrichment: EnrichmentConfig {
                sentiment,
                category,
                spam,
                geo,
                call_timeout,
            },
        })
    }
}

/// Thin typed accessor over a key lookup.
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty, trimmed value.
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn secret(&self, key: &str) -> Option<SecretString> {
        self.string(key).map(SecretString::from)
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(key)
            .map(|raw| {
                raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{raw:?}: {e}"),
                })
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.string(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{raw:?} is not a boolean"),
                }),
            })
            .transpose()
    }
}

fn require(
    value: Option<SecretString>,
    key: &str,
    capability: &str,
) -> Result<SecretString, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingRequired {
        key: key.to_string(),
        hint: format!("The {capability} classifier is enabled but has no API key."),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_with_empty_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("./data/complaints.db"));
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.log_dir.is_none());
        assert_eq!(config.enrichment.call_timeout, Duration::from_secs(10));
        assert!(config.enrichment.sentiment.is_none());
        assert!(config.enrichment.category.is_none());
        assert!(config.enrichment.spam.is_none());
        assert!(config.enrichment.geo.is_none());
    }

    #[test]
    fn api_key_enables_primary_classifiers() {
        let config = config_from(&[
            ("SENTIMENT_API_KEY", "s-key"),
            ("OPENAI_API_KEY", "sk-test"),
            ("CLASSIFIER_TIMEOUT_MS", "2500"),
        ])
        .unwrap();

        let sentiment = config.enrichment.sentiment.unwrap();
        assert_eq!(sentiment.url, DEFAULT_SENTIMENT_URL);
        assert_eq!(sentiment.timeout, Duration::from_millis(2500));

        let category = config.enrichment.category.unwrap();
        assert_eq!(category.model, DEFAULT_CATEGORY_MODEL);
        assert_eq!(category.endpoint.url, DEFAULT_CATEGORY_URL);
    }

    #[test]
    fn explicit_disable_wins_over_present_key() {
        let config = config_from(&[
            ("SENTIMENT_API_KEY", "s-key"),
            ("SENTIMENT_ENABLED", "off"),
        ])
        .unwrap();
        assert!(config.enrichment.sentiment.is_none());
    }

    #[test]
    fn enabled_classifier_without_key_is_rejected() {
        let err = config_from(&[("SPAM_CHECK_ENABLED", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "SPAM_API_KEY"));
    }

    #[test]
    fn spam_provider_selection() {
        let config = config_from(&[
            ("SPAM_CHECK_ENABLED", "yes"),
            ("SPAM_PROVIDER", "ninja"),
            ("SPAM_API_KEY", "n-key"),
        ])
        .unwrap();
        let spam = config.enrichment.spam.unwrap();
        assert_eq!(spam.provider, SpamProvider::Ninja);
        assert_eq!(spam.endpoint.url, DEFAULT_NINJA_SPAM_URL);
        assert!((spam.threshold - 2.0).abs() < f64::EPSILON);

        let err = config_from(&[
            ("SPAM_CHECK_ENABLED", "1"),
            ("SPAM_PROVIDER", "carrier-pigeon"),
            ("SPAM_API_KEY", "k"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn geo_needs_no_key() {
        let config = config_from(&[("GEO_ENABLED", "true")]).unwrap();
        let geo = config.enrichment.geo.unwrap();
        assert_eq!(geo.url, DEFAULT_GEO_URL);
        assert!(geo.api_key.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            config_from(&[("GEO_ENABLED", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("CLASSIFIER_TIMEOUT_MS", "soon")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("COMPLAINTS_BIND_ADDR", "not-an-addr")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
