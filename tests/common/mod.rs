//! Common test utilities for feeling-images integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod mock_api;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_api::*;
