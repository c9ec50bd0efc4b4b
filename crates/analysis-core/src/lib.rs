//! Shared domain types, errors and provider traits for the BVMT assistant.

pub mod adaptive;
pub mod error;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
