//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Project identifier used by configuration fixtures.
pub const PROJECT_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Environment variables the provider reads; cleared before spawning the
/// binary so a developer's own credentials never leak into a test.
pub const SCW_ENV_VARS: &[&str] = &[
    "SCW_ACCESS_KEY",
    "SCW_SECRET_KEY",
    "SCW_DEFAULT_PROJECT_ID",
    "SCW_DEFAULT_ORGANIZATION_ID",
    "SCW_DEFAULT_REGION",
    "SCW_DEFAULT_ZONE",
    "SCW_API_URL",
    "SCW_WAIT_RETRY_INTERVAL_SECS",
    "SCW_TIMEOUT_MINUTES",
    "SCW_CONFIG_PATH",
];
