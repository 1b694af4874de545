pub mod abi;
pub mod decode;
pub mod gas;
pub mod position_client;
pub mod providers;
pub mod reader;
pub mod retry;

/// Test double for `ChainReader`, shared by unit and integration tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
