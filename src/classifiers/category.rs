//! Category classifier backed by an OpenAI-compatible chat completions API.
//!
//! The model is asked for a single word; whatever it answers is returned as
//! the raw label. Folding that label into a [`Category`](crate::enrichment::Category)
//! bucket happens in [`crate::enrichment::mapping`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{Classifier, api_key, decode_json, http_client, transport_error};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

const NAME: &str = "category";

/// Longest complaint excerpt sent to the model.
const MAX_PROMPT_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCategoryClassifier {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    model: String,
}

impl ChatCategoryClassifier {
    pub fn new(config: &ClassifierConfig, model: &str) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            url: config.url.clone(),
            api_key: api_key(NAME, config)?,
            model: model.to_string(),
        })
    }
}

fn build_prompt(text: &str) -> String {
    let excerpt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
    format!(
        "Classify this customer complaint into exactly one category.\n\
         Options: technical, payment, other.\n\
         Answer with one word only.\n\n\
         Complaint: \"{excerpt}\""
    )
}

#[async_trait]
impl Classifier for ChatCategoryClassifier {
    type Output = String;

    fn name(&self) -> &str {
        NAME
    }

    async fn classify(&self, input: &str) -> Result<String, ClassifierError> {
        let payload = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "user", "content": build_prompt(input) }
            ],
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        let body: ChatResponse = decode_json(NAME, response).await?;
        let label = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ClassifierError::InvalidResponse {
                classifier: NAME.into(),
                reason: "no message content in first choice".into(),
            })?;

        debug!(model = %self.model, label = %label, "Category classified");
        Ok(label)
    }
}
