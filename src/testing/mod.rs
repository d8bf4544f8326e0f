//! Testing utilities and mock implementations
//!
//! Lets the client and session layers be exercised without a broker.

pub mod mocks;

pub use mocks::*;
