//! End-to-end API tests.
//!
//! Each test builds the full router over a fresh in-memory SQLite database,
//! authenticates through proxy identity headers, and points the completion
//! client at a wiremock server.
