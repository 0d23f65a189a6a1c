//! SmartStore Core - shared domain types.
//!
//! This crate provides the types shared between the dashboard service and its
//! tests:
//! - [`types`] - the flat order record and product catalog shapes
//! - [`merge`] - reconciliation of fetched order batches into a record set
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything that talks to the network lives in the dashboard crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod merge;
pub mod types;

pub use merge::*;
pub use types::*;
