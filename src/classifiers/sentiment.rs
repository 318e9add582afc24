//! APILayer sentiment analysis client.
//!
//! `POST {url}` with `{"text": ...}` and an `apikey` header; the response
//! carries a `sentiment` label. The raw label is returned untouched; mapping
//! it into [`Sentiment`](crate::enrichment::Sentiment) is the orchestrator's job.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{Classifier, api_key, decode_json, http_client, transport_error};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

const NAME: &str = "sentiment";

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    sentiment: String,
}

pub struct ApiLayerSentiment {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
}

impl ApiLayerSentiment {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            url: config.url.clone(),
            api_key: api_key(NAME, config)?,
        })
    }
}

#[async_trait]
impl Classifier for ApiLayerSentiment {
    type Output = String;

    fn name(&self) -> &str {
        NAME
    }

    async fn classify(&self, input: &str) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(&self.url)
            .header("apikey", self.api_key.expose_secret())
            .json(&serde_json::json!({ "text": input }))
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        let body: SentimentResponse = decode_json(NAME, response).await?;
        debug!(label = %body.sentiment, "Sentiment classified");
        Ok(body.sentiment)
    }
}
