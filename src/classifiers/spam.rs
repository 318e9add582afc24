//! Spam-check clients.
//!
//! Two providers with different wire formats sit behind the same
//! [`Classifier`] output, so the orchestrator never knows which one runs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Classifier, api_key, decode_json, http_client, transport_error};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

/// Spam judgement for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpamVerdict {
    pub is_spam: bool,
    /// Provider score. Scales differ between providers.
    pub score: f64,
}

// ── APILayer ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiLayerResponse {
    is_spam: bool,
    #[serde(default)]
    score: f64,
}

/// APILayer spamchecker: JSON body, `threshold` query parameter, `apikey` header.
pub struct ApiLayerSpamChecker {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    threshold: f64,
}

impl ApiLayerSpamChecker {
    const NAME: &'static str = "spam_apilayer";

    pub fn new(config: &ClassifierConfig, threshold: f64) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout)?,
            url: config.url.clone(),
            api_key: api_key(Self::NAME, config)?,
            threshold,
        })
    }
}

#[async_trait]
impl Classifier for ApiLayerSpamChecker {
    type Output = SpamVerdict;

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn classify(&self, input: &str) -> Result<SpamVerdict, ClassifierError> {
        let response = self
            .client
            .post(&self.url)
            .header("apikey", self.api_key.expose_secret())
            .query(&[("threshold", self.threshold)])
            .json(&serde_json::json!({ "text": input }))
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;

        let body: ApiLayerResponse = decode_json(Self::NAME, response).await?;
        Ok(SpamVerdict {
            is_spam: body.is_spam,
            score: body.score,
        })
    }
}

// ── API Ninjas ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NinjaResponse {
    is_spam: bool,
    #[serde(default)]
    spam_score: f64,
}

/// API Ninjas spamcheck: form-encoded body, `X-Api-Key` header.
pub struct NinjaSpamChecker {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
}

impl NinjaSpamChecker {
    const NAME: &'static str = "spam_ninja";

    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(Self::NAME, config.timeout)?,
            url: config.url.clone(),
            api_key: api_key(Self::NAME, config)?,
        })
    }
}

#[async_trait]
impl Classifier for NinjaSpamChecker {
    type Output = SpamVerdict;

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn classify(&self, input: &str) -> Result<SpamVerdict, ClassifierError> {
        let response = self
            .client
            .post(&self.url)
            .header("X-Api-Key", self.api_key.expose_secret())
            .form(&[("text", input)])
            .send()
            .await
            .map_err(|e| transport_error(Self::NAME, e))?;

        let body: NinjaResponse = decode_json(Self::NAME, response).await?;
        Ok(SpamVerdict {
            is_spam: body.is_spam,
            score: body.spam_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_string_contains, header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn endpoint(server: &MockServer) -> ClassifierConfig {
        ClassifierConfig {
            url: format!("{}/spamcheck", server.uri()),
            api_key: Some(SecretString::from("spam-key".to_string())),
            timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn apilayer_sends_threshold_and_parses_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("apikey", "spam-key"))
            .and(query_param("threshold", "2.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_spam": true,
                "score": 7.1,
                "result": "This is spam",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checker = ApiLayerSpamChecker::new(&endpoint(&server), 2.5).unwrap();
        let verdict = checker.classify("WIN A FREE PHONE").await.unwrap();
        assert!(verdict.is_spam);
        assert!((verdict.score - 7.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ninja_posts_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Api-Key", "spam-key"))
            .and(body_string_contains("text=refund+issue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_spam": false,
                "spam_score": 0.12,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checker = NinjaSpamChecker::new(&endpoint(&server)).unwrap();
        let verdict = checker.classify("refund issue").await.unwrap();
        assert_eq!(
            verdict,
            SpamVerdict {
                is_spam: false,
                score: 0.12
            }
        );
    }

    #[tokio::test]
    async fn non_object_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["spam"])))
            .mount(&server)
            .await;

        let checker = NinjaSpamChecker::new(&endpoint(&server)).unwrap();
        let err = checker.classify("hello").await.unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidResponse { .. }));
    }
}
