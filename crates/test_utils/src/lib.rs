//! Test Utilities Crate
//!
//! Shared test infrastructure for the payment ledger test suite.
//!
//! # Modules
//!
//! - `builders`: builder patterns for ledger/account test data
//! - `memory`: in-memory adapters for every port
//! - `harness`: a fully wired in-memory payment context

pub mod builders;
pub mod memory;
pub mod harness;

pub use builders::*;
pub use memory::*;
pub use harness::*;
