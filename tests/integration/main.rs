//! Integration tests for Auto-Alert
//!
//! These tests use wiremock to stand in for the classifieds catalog and
//! tempfile databases, and drive whole monitoring cycles end-to-end.

mod common;
mod monitor_tests;
mod storage_tests;
