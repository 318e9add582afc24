//! Enrichment orchestrator — fans a complaint out to the classifiers.
//!
//! **Core invariant: classifier failure never fails enrichment.**
//! Once the text passes validation, every field either gets a real value or
//! its documented fallback:
//! - sentiment → `unknown`
//! - category → `other`
//! - spam / geo → omitted
//!
//! Flow:
//! 1. Validate text (the only hard failure)
//! 2. Start every enabled classifier call, each under its own deadline
//! 3. Join them in this task (dropping the future abandons in-flight calls)
//! 4. Reconcile each outcome into the result

use std::time::Duration;

use futures::future::OptionFuture;
use tracing::{debug, info, warn};

use super::mapping::CategoryMapper;
use super::types::{Category, EnrichmentResult, Sentiment};
use crate::classifiers::{Classifier, ClassifierSet};
use crate::error::{ClassifierError, ComplaintError};

/// Reject blank complaint text.
pub fn validate_text(text: &str) -> Result<(), ComplaintError> {
    if text.trim().is_empty() {
        return Err(ComplaintError::InvalidInput(
            "complaint text must not be empty".into(),
        ));
    }
    Ok(())
}

pub struct EnrichmentOrchestrator {
    classifiers: ClassifierSet,
    mapper: CategoryMapper,
    call_timeout: Duration,
}

impl EnrichmentOrchestrator {
    pub fn new(classifiers: ClassifierSet, call_timeout: Duration) -> Self {
        Self {
            classifiers,
            mapper: CategoryMapper::default_rules(),
            call_timeout,
        }
    }

    /// Enrich `text` with no origin information (geolocation is skipped).
    pub async fn enrich(&self, text: &str) -> Result<EnrichmentResult, ComplaintError> {
        self.enrich_with_origin(text, None).await
    }

    /// Enrich `text`; `origin_ip` feeds the geolocation classifier if enabled.
    ///
    /// Performs fresh classification on every call; no caching, no retries.
    pub async fn enrich_with_origin(
        &self,
        text: &str,
        origin_ip: Option<&str>,
    ) -> Result<EnrichmentResult, ComplaintError> {
        validate_text(text)?;

        let deadline = self.call_timeout;
        let sentiment_call: OptionFuture<_> = self
            .classifiers
            .sentiment
            .as_deref()
            .map(|c| call_with_deadline(c, text, deadline))
            .into();
        let category_call: OptionFuture<_> = self
            .classifiers
            .category
            .as_deref()
            .map(|c| call_with_deadline(c, text, deadline))
            .into();
        let spam_call: OptionFuture<_> = self
            .classifiers
            .spam
            .as_deref()
            .map(|c| call_with_deadline(c, text, deadline))
            .into();
        let geo_call: OptionFuture<_> = self
            .classifiers
            .geo
            .as_deref()
            .zip(origin_ip)
            .map(|(c, ip)| call_with_deadline(c, ip, deadline))
            .into();

        let (sentiment, category, spam, geo) =
            tokio::join!(sentiment_call, category_call, spam_call, geo_call);

        let result = EnrichmentResult {
            sentiment: self.reconcile_sentiment(sentiment),
            category: self.reconcile_category(category),
            spam: supplementary("spam", spam),
            geo: supplementary("geo", geo),
        };

        info!(
            sentiment = %result.sentiment,
            category = %result.category,
            spam = ?result.spam.map(|s| s.is_spam),
            geo = result.geo.is_some(),
            "Enrichment complete"
        );
        Ok(result)
    }

    fn reconcile_sentiment(&self, outcome: Option<Result<String, ClassifierError>>) -> Sentiment {
        match outcome {
            None => Sentiment::Unknown,
            Some(Ok(label)) => Sentiment::from_label(&label).unwrap_or_else(|| {
                warn!(label = %label, "Unrecognized sentiment label, using unknown");
                Sentiment::Unknown
            }),
            Some(Err(e)) => {
                warn!(error = %e, "Sentiment unavailable, using unknown");
                Sentiment::Unknown
            }
        }
    }

    fn reconcile_category(&self, outcome: Option<Result<String, ClassifierError>>) -> Category {
        match outcome {
            None => Category::Other,
            Some(Ok(label)) => self.mapper.map(&label),
            Some(Err(e)) => {
                warn!(error = %e, "Category unavailable, using other");
                Category::Other
            }
        }
    }
}

/// Optional signals are dropped on failure rather than defaulted.
fn supplementary<T>(field: &str, outcome: Option<Result<T, ClassifierError>>) -> Option<T> {
    match outcome {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(ClassifierError::Skipped { reason, .. })) => {
            debug!(field, reason = %reason, "Supplementary classifier skipped");
            None
        }
        Some(Err(e)) => {
            warn!(field, error = %e, "Supplementary classifier failed, omitting field");
            None
        }
    }
}

/// Run one classifier call under a hard deadline. Expiry is just another error.
async fn call_with_deadline<C>(
    classifier: &C,
    input: &str,
    deadline: Duration,
) -> Result<C::Output, ClassifierError>
where
    C: Classifier + ?Sized,
{
    match tokio::time::timeout(deadline, classifier.classify(input)).await {
        Ok(result) => result,
        Err(_) => Err(ClassifierError::Timeout {
            classifier: classifier.name().to_string(),
            timeout: deadline,
        }),
    }
}
