//! Shared test fixtures
//!
//! Every builder returns a compliant resource for the default
//! `ScannerConfig`; tests break the one property they care about.
