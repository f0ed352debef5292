//! Parcel lifecycle service.
//!
//! # Responsibility
//! - Register parcels, advance their status, change addresses and delete.
//! - Delegate all persistence to a `ParcelRepository`.
//!
//! # Invariants
//! - Status only moves forward through registered -> sent -> delivered.
//! - Service layer remains storage-agnostic.

use crate::model::history::ParcelHistory;
use crate::model::parcel::{
    next_status, ClientId, Parcel, ParcelNumber, ParcelValidationError, PARCEL_STATUS_DELIVERED,
};
use crate::repo::parcel_repo::{ParcelRepository, RepoError, RepoResult};
use log::info;

/// Use-case wrapper around a parcel repository.
pub struct ParcelService<R: ParcelRepository> {
    repo: R,
}

impl<R: ParcelRepository> ParcelService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a `registered` parcel for `client` stamped with the current time.
    ///
    /// Returns the stored parcel including its assigned number. A blank
    /// address is `RepoError::Validation` and nothing is written.
    pub fn register(&self, client: ClientId, address: impl Into<String>) -> RepoResult<Parcel> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(ParcelValidationError::EmptyAddress.into());
        }
        let mut parcel = Parcel::new(client, address);
        parcel.number = self.repo.add(&parcel)?;
        info!(
            "event=parcel_register module=service status=ok number={} client={}",
            parcel.number, client
        );
        Ok(parcel)
    }

    pub fn client_parcels(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.repo.get_by_client(client)
    }

    /// Moves the parcel one step forward and returns its resulting status.
    ///
    /// # Contract
    /// - `delivered` parcels are left untouched.
    /// - Any status outside the lifecycle is `RepoError::InvalidData`.
    pub fn next_status(&self, number: ParcelNumber) -> RepoResult<String> {
        let parcel = self.repo.get(number)?;
        if parcel.status == PARCEL_STATUS_DELIVERED {
            return Ok(parcel.status);
        }

        let next = next_status(&parcel.status).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "parcel {number} has status `{}` outside the lifecycle",
                parcel.status
            ))
        })?;
        self.repo.set_status(number, next)?;
        info!("event=parcel_next_status module=service status=ok number={number} to={next}");
        Ok(next.to_string())
    }

    /// Changes the delivery address; a no-op once the parcel has left
    /// `registered`.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        self.repo.set_address(number, address)
    }

    /// Deletes the parcel; a no-op once it has left `registered`.
    pub fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        self.repo.delete(number)
    }

    pub fn client_history(&self, client: ClientId) -> RepoResult<Vec<ParcelHistory>> {
        self.repo.get_history_by_client(client)
    }
}

/// One-line summary of a parcel for console output.
pub fn describe_parcel(parcel: &Parcel) -> String {
    format!(
        "parcel #{} client={} status={} address={} created_at={}",
        parcel.number, parcel.client, parcel.status, parcel.address, parcel.created_at
    )
}
