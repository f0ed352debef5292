//! Append-only parcel audit record.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber};
use serde::{Deserialize, Serialize};

/// Snapshot of a parcel taken when it was created or mutated.
///
/// `parcel_number` is not a live reference; the row survives parcel deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelHistory {
    pub id: i64,
    pub parcel_number: ParcelNumber,
    pub client: ClientId,
    pub address: String,
    pub status: String,
    /// RFC3339 UTC timestamp of when the event was recorded.
    pub changed_at: String,
}

impl ParcelHistory {
    /// Returns whether this snapshot matches the parcel's current fields.
    pub fn matches(&self, parcel: &Parcel) -> bool {
        self.parcel_number == parcel.number
            && self.client == parcel.client
            && self.address == parcel.address
            && self.status == parcel.status
    }
}
