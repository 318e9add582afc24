//! Intake service — the single write path for new complaints.
//!
//! Enrichment runs to completion (or to its deadlines) before anything is
//! written, so a dropped request never leaves a half-built record behind.

use std::sync::Arc;

use tracing::info;

use super::model::Complaint;
use crate::enrichment::EnrichmentOrchestrator;
use crate::error::ComplaintError;
use crate::store::ComplaintStore;

pub struct IntakeService {
    orchestrator: Arc<EnrichmentOrchestrator>,
    store: Arc<dyn ComplaintStore>,
}

impl IntakeService {
    pub fn new(orchestrator: Arc<EnrichmentOrchestrator>, store: Arc<dyn ComplaintStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }

    /// Enrich and persist a complaint with no known origin.
    pub async fn submit(&self, text: &str) -> Result<Complaint, ComplaintError> {
        self.submit_from(text, None).await
    }

    /// Enrich and persist a complaint sent from `origin_ip`.
    pub async fn submit_from(
        &self,
        text: &str,
        origin_ip: Option<&str>,
    ) -> Result<Complaint, ComplaintError> {
        let enrichment = self.orchestrator.enrich_with_origin(text, origin_ip).await?;
        let complaint = self.store.create(text, &enrichment).await?;

        info!(
            id = complaint.id,
            sentiment = %complaint.sentiment,
            category = %complaint.category,
            "Complaint accepted"
        );
        Ok(complaint)
    }
}
