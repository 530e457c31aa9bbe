//! Domain Models

pub mod topic;

pub use topic::*;
