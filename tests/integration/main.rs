//! Integration tests for Regex-Sweep
//!
//! These tests use wiremock to stand up mock HTTP servers and drive the
//! public engine API end to end.

mod engine_tests;
mod fetch_tests;
