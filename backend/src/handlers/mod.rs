//! HTTP handlers

pub mod health;
pub mod movement;
pub mod stock;
pub mod warehouse;

pub use health::{health_check, root};
