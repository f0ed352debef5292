//! Parcel record and status lifecycle.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned parcel identifier.
pub type ParcelNumber = i64;

/// Opaque owning-client identifier.
pub type ClientId = i64;

pub const PARCEL_STATUS_REGISTERED: &str = "registered";
pub const PARCEL_STATUS_SENT: &str = "sent";
pub const PARCEL_STATUS_DELIVERED: &str = "delivered";

/// One shipment record.
///
/// `status` is kept as free text: the store gates only on `registered` and
/// writes any other value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Assigned by the store on insert; `0` until then.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: String,
    pub address: String,
    /// RFC3339 UTC timestamp, set once at creation.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved `registered` parcel stamped with the current time.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self {
            number: 0,
            client,
            status: PARCEL_STATUS_REGISTERED.to_string(),
            address: address.into(),
            created_at: now_rfc3339(),
        }
    }

    /// Checks the stored field contract before insert.
    ///
    /// Only `created_at` is constrained; `client`, `status` and `address`
    /// are stored as given.
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        if DateTime::parse_from_rfc3339(&self.created_at).is_err() {
            return Err(ParcelValidationError::InvalidCreatedAt(
                self.created_at.clone(),
            ));
        }
        Ok(())
    }
}

/// Returns the status that follows `status` in the forward lifecycle.
///
/// `delivered` is terminal and unknown values have no successor.
pub fn next_status(status: &str) -> Option<&'static str> {
    match status {
        PARCEL_STATUS_REGISTERED => Some(PARCEL_STATUS_SENT),
        PARCEL_STATUS_SENT => Some(PARCEL_STATUS_DELIVERED),
        _ => None,
    }
}

/// Current UTC time in RFC3339 with second precision and a `Z` suffix.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Rejected parcel input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValidationError {
    /// Raised by `ParcelService::register`; the store accepts blank addresses.
    EmptyAddress,
    InvalidCreatedAt(String),
}

impl Display for ParcelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAddress => write!(f, "parcel address cannot be empty"),
            Self::InvalidCreatedAt(value) => {
                write!(f, "parcel created_at `{value}` is not an RFC3339 timestamp")
            }
        }
    }
}

impl Error for ParcelValidationError {}
