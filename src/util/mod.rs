//! Utility modules: client cache and retry.

pub mod cache;
pub mod retry;
