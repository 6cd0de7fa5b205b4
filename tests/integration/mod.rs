//! Integration test modules.

mod cache_test;
mod engine_test;
mod partial_failure_test;
mod sqlite_test;
