//! Core business logic for fedipress.

pub mod bus;
pub mod services;

pub use bus::EventBus;
pub use services::*;
