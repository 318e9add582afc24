//! Application assembly: store, classifiers, services and router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing::info;

use crate::classifiers::ClassifierSet;
use crate::complaints::{IntakeService, QueryService, complaint_routes};
use crate::config::AppConfig;
use crate::enrichment::EnrichmentOrchestrator;
use crate::error::Result;
use crate::store::{ComplaintStore, LibSqlBackend};

/// Open the configured store, build the enabled classifiers, and wire the router.
pub async fn build_app(config: &AppConfig) -> Result<Router> {
    let store: Arc<dyn ComplaintStore> = Arc::new(LibSqlBackend::open(&config.db_path).await?);
    let classifiers = ClassifierSet::from_config(&config.enrichment)?;

    info!(
        db = %config.db_path.display(),
        classifiers = ?classifiers.enabled(),
        timeout_ms = config.enrichment.call_timeout.as_millis() as u64,
        "Complaint desk assembled"
    );
    Ok(build_router(store, classifiers, config.enrichment.call_timeout))
}

/// Wire services over an existing store and classifier set.
pub fn build_router(
    store: Arc<dyn ComplaintStore>,
    classifiers: ClassifierSet,
    call_timeout: Duration,
) -> Router {
    let orchestrator = Arc::new(EnrichmentOrchestrator::new(classifiers, call_timeout));
    let intake = Arc::new(IntakeService::new(orchestrator, Arc::clone(&store)));
    let query = Arc::new(QueryService::new(store));
    complaint_routes(intake, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::error::Error;

    #[tokio::test]
    async fn builds_with_in_memory_store_and_no_classifiers() {
        let config = AppConfig::from_lookup(|key| match key {
            "COMPLAINTS_DB_PATH" => Some(":memory:".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(build_app(&config).await.is_ok());
    }

    #[tokio::test]
    async fn classifier_without_key_fails_assembly() {
        let mut config = AppConfig::from_lookup(|key| match key {
            "COMPLAINTS_DB_PATH" => Some(":memory:".to_string()),
            _ => None,
        })
        .unwrap();
        config.enrichment.sentiment = Some(ClassifierConfig {
            url: "http://127.0.0.1:9/sentiment".into(),
            api_key: None,
            timeout: Duration::from_secs(1),
        });

        let err = build_app(&config).await.unwrap_err();
        assert!(matches!(err, Error::Classifier(_)));
    }
}
