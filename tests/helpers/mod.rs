//! Shared integration test utilities
#![allow(dead_code)]

pub mod database_helper;
pub mod provider_mock;
pub mod test_data;
