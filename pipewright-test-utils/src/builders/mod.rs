//! Builders for test scenarios

mod temp_root;

pub use temp_root::{TempRoot, TempRootBuilder};
