//! Complaints: the record model, intake and query services, and their HTTP surface.

pub mod intake;
pub mod model;
pub mod query;
pub mod routes;

pub use intake::IntakeService;
pub use model::{Complaint, ComplaintFilter, ComplaintStatus};
pub use query::QueryService;
pub use routes::complaint_routes;
