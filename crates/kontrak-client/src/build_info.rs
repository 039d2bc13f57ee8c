//! Commit and build date stamped by `build.rs`.

use serde::Serialize;

/// Build provenance of this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Latest commit (`%h %ad %d`), or `unknown` outside a git checkout.
    pub commit: &'static str,
    /// RFC 3339 build timestamp.
    pub build_date: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Build provenance of this binary.
#[must_use]
pub const fn build_info() -> BuildInfo {
    BuildInfo {
        commit: env!("BUILD_COMMIT"),
        build_date: env!("BUILD_DATE"),
        version: env!("CARGO_PKG_VERSION"),
    }
}
