//! Core types and trait definitions for the water temperature log.
//!
//! This crate is deliberately free of database and UI dependencies. Storage
//! backends implement [`store::MeasurementStore`]; the sync layer talks to them
//! through [`repository::MeasurementRepository`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod measurement;
pub mod repository;
pub mod store;

pub use error::{Error, MissingFields, Result};
pub use measurement::{DRAFT_ID, Measurement};
pub use repository::MeasurementRepository;
pub use store::MeasurementStore;
