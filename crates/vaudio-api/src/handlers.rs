//! Request handlers.

pub mod conversion;
pub mod health;

pub use conversion::*;
pub use health::*;
