//! Parcel use-case services.
//!
//! # Responsibility
//! - Turn repository calls into client-facing parcel workflows.
//! - Keep CLI callers decoupled from storage details.

pub mod parcel_service;
