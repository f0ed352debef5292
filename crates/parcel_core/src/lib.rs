//! Parcel persistence core.
//! Stores shipment records, gates address changes and deletion on the
//! `registered` status, and keeps an append-only history of every change.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{default_log_level, AuditFailurePolicy, LoggingConfig, StoreOptions};
pub use logging::{init_logging, logging_status};
pub use model::history::ParcelHistory;
pub use model::parcel::{
    next_status, ClientId, Parcel, ParcelNumber, ParcelValidationError, PARCEL_STATUS_DELIVERED,
    PARCEL_STATUS_REGISTERED, PARCEL_STATUS_SENT,
};
pub use repo::parcel_repo::{ParcelRepository, ParcelStore, RepoError, RepoResult};
pub use service::parcel_service::{describe_parcel, ParcelService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
