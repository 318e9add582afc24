//! Complaint Desk: complaint intake with concurrent third-party enrichment.

pub mod classifiers;
pub mod complaints;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod server;
pub mod store;
