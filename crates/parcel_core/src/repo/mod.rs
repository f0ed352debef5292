//! Parcel persistence.
//!
//! # Responsibility
//! - Define the parcel data-access contract.
//! - Keep SQL inside the core persistence boundary.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Business-rule refusals are successes that change nothing.

pub mod parcel_repo;
