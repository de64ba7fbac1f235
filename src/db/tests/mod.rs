//! Shared database repository test infrastructure
//!
//! The same test logic runs against both SQLite and PostgreSQL:
//!
//! - **SQLite**: fast in-memory tests that run with every `cargo test`
//! - **PostgreSQL**: testcontainers-backed tests, run with `cargo test -- --ignored`
//!
//! Each repository has a module of shared `async fn test_*` functions taking
//! repository trait objects, plus `sqlite_tests` / `postgres_tests` submodules
//! that instantiate them per backend.
