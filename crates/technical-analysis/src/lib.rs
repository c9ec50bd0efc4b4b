pub mod indicators;
pub mod signal;

#[cfg(test)]
mod indicators_tests;

pub use indicators::*;
pub use signal::*;
