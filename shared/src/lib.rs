//! Shared types and models for the Bodega inventory platform
//!
//! This crate contains the domain types and the pure stock arithmetic shared
//! between the backend, the browser front end (via WASM), and the tests.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
