//! Back-office domain layer for a property marketplace.
//!
//! The crate decides whether a submitted listing may be published, tracks it through its
//! lifecycle, mediates broker takeovers and ranks published listings against buyer
//! preferences. Storage and payments are reached through the collaborator traits in
//! [`marketplace::repository`].

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
