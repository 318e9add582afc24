//! External classification services.
//!
//! Every provider implements [`Classifier`]: one HTTP call per invocation,
//! no retries, and any transport, status, or decoding problem comes back as
//! a [`ClassifierError`]. Fallback policy lives in the enrichment
//! orchestrator, not here.

pub mod category;
pub mod geo;
pub mod sentiment;
pub mod spam;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;

use crate::config::{ClassifierConfig, EnrichmentConfig, SpamProvider};
use crate::error::ClassifierError;

pub use category::ChatCategoryClassifier;
pub use geo::{GeoLocation, IpApiLocator};
pub use sentiment::ApiLayerSentiment;
pub use spam::{ApiLayerSpamChecker, NinjaSpamChecker, SpamVerdict};

/// A single external classification capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// What a successful call yields.
    type Output: Send;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Classify `input` (complaint text, or a client IP for geolocation).
    async fn classify(&self, input: &str) -> Result<Self::Output, ClassifierError>;
}

/// Classifier producing a raw text label (sentiment, category).
pub type LabelClassifier = Arc<dyn Classifier<Output = String>>;
pub type SpamClassifier = Arc<dyn Classifier<Output = SpamVerdict>>;
pub type GeoClassifier = Arc<dyn Classifier<Output = GeoLocation>>;

/// The enabled classifiers, one slot per capability.
#[derive(Clone, Default)]
pub struct ClassifierSet {
    pub sentiment: Option<LabelClassifier>,
    pub category: Option<LabelClassifier>,
    pub spam: Option<SpamClassifier>,
    pub geo: Option<GeoClassifier>,
}

impl ClassifierSet {
    /// Build HTTP clients for every capability enabled in `config`.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, ClassifierError> {
        let sentiment = match &config.sentiment {
            Some(c) => Some(Arc::new(ApiLayerSentiment::new(c)?) as LabelClassifier),
            None => None,
        };
        let category = match &config.category {
            Some(c) => Some(Arc::new(ChatCategoryClassifier::new(&c.endpoint, &c.model)?) as LabelClassifier),
            None => None,
        };
        let spam = match &config.spam {
            Some(c) => Some(match c.provider {
                SpamProvider::ApiLayer => {
                    Arc::new(ApiLayerSpamChecker::new(&c.endpoint, c.threshold)?) as SpamClassifier
                }
                SpamProvider::Ninja => Arc::new(NinjaSpamChecker::new(&c.endpoint)?) as SpamClassifier,
            }),
            None => None,
        };
        let geo = match &config.geo {
            Some(c) => Some(Arc::new(IpApiLocator::new(c)?) as GeoClassifier),
            None => None,
        };

        Ok(Self {
            sentiment,
            category,
            spam,
            geo,
        })
    }

    pub fn with_sentiment(mut self, classifier: LabelClassifier) -> Self {
        self.sentiment = Some(classifier);
        self
    }

    pub fn with_category(mut self, classifier: LabelClassifier) -> Self {
        self.category = Some(classifier);
        self
    }

    pub fn with_spam(mut self, classifier: SpamClassifier) -> Self {
        self.spam = Some(classifier);
        self
    }

    pub fn with_geo(mut self, classifier: GeoClassifier) -> Self {
        self.geo = Some(classifier);
        self
    }

    /// Names of the enabled classifiers, for startup logging.
    pub fn enabled(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(c) = &self.sentiment {
            names.push(c.name());
        }
        if let Some(c) = &self.category {
            names.push(c.name());
        }
        if let Some(c) = &self.spam {
            names.push(c.name());
        }
        if let Some(c) = &self.geo {
            names.push(c.name());
        }
        names
    }
}

// ── Shared HTTP helpers ─────────────────────────────────────────────

/// Build a reqwest client with the configured per-request timeout.
pub(crate) fn http_client(name: &str, timeout: Duration) -> Result<reqwest::Client, ClassifierError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClassifierError::ClientBuild {
            classifier: name.to_string(),
            reason: e.to_string(),
        })
}

/// Pull the API key out of an endpoint config, failing if it is absent.
pub(crate) fn api_key(name: &str, config: &ClassifierConfig) -> Result<SecretString, ClassifierError> {
    config.api_key.clone().ok_or_else(|| ClassifierError::ClientBuild {
        classifier: name.to_string(),
        reason: "missing API key".into(),
    })
}

pub(crate) fn transport_error(name: &str, e: reqwest::Error) -> ClassifierError {
    ClassifierError::RequestFailed {
        classifier: name.to_string(),
        reason: e.to_string(),
    }
}

/// Check the status line and decode the JSON body into `T`.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    name: &str,
    response: reqwest::Response,
) -> Result<T, ClassifierError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClassifierError::HttpStatus {
            classifier: name.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| transport_error(name, e))?;
    serde_json::from_str(&body).map_err(|e| ClassifierError::InvalidResponse {
        classifier: name.to_string(),
        reason: format!("{e}; body: {}", body.chars().take(200).collect::<String>()),
    })
}
