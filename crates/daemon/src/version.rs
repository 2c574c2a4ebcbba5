use std::fmt;

use serde::{Deserialize, Serialize};

/// Compile-time build metadata, filled in by `build.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub repo_version: String,
    pub build_profile: String,
    pub build_timestamp: String,
    pub build_target: String,
    pub rust_version: String,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        repo_version: env!("REPO_VERSION").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_target: env!("BUILD_TARGET").to_string(),
        rust_version: env!("RUST_VERSION").to_string(),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "studyshelf {} ({}, {} build for {}, built {} with {})",
            self.version,
            self.repo_version,
            self.build_profile,
            self.build_target,
            self.build_timestamp,
            self.rust_version
        )
    }
}
