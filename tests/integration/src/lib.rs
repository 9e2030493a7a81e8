//! Integration test crate for CertVault. The tests live in `tests/`.
