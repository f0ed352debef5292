//! Parcel domain model.
//!
//! # Responsibility
//! - Define the parcel record and its append-only history snapshot.
//! - Name the status literals shared with consuming applications.
//!
//! # Invariants
//! - `address` may change only while status is `registered`.
//! - A parcel may be deleted only while status is `registered`.
//! - History rows are immutable once written.

pub mod history;
pub mod parcel;
