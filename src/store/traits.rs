//! `ComplaintStore` trait, the single persistence seam for complaints.

use async_trait::async_trait;

use crate::complaints::model::{Complaint, ComplaintFilter, ComplaintStatus};
use crate::enrichment::EnrichmentResult;
use crate::error::{ComplaintError, DatabaseError};

/// Backend-agnostic complaint storage.
///
/// Implementations own id assignment: ids are unique, strictly increasing
/// and never reused. `create` and `update_status` must be serialized with
/// respect to each other.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Apply pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Persist a new open complaint stamped with the current UTC time.
    async fn create(
        &self,
        text: &str,
        enrichment: &EnrichmentResult,
    ) -> Result<Complaint, ComplaintError>;

    async fn get(&self, id: i64) -> Result<Option<Complaint>, ComplaintError>;

    /// All complaints matching every supplied filter, ordered by id ascending.
    async fn get_by_filter(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, ComplaintError>;

    /// Move a complaint to `new_status`.
    ///
    /// Errors with `NotFound` for an unknown id and `InvalidTransition`
    /// unless the move is open → closed.
    async fn update_status(
        &self,
        id: i64,
        new_status: ComplaintStatus,
    ) -> Result<Complaint, ComplaintError>;
}
