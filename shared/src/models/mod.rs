//! Domain models for the Bodega inventory platform

mod audit;
mod catalog;
mod movement;
mod stock;

pub use audit::*;
pub use catalog::*;
pub use movement::*;
pub use stock::*;
