pub mod harness;
pub mod mock_workers;

pub use harness::*;
pub use mock_workers::*;
