//! Dev-mode environment selection.

use std::path::Path;

use extpack_manifest::paths::posix_path;

/// Environment variable selecting the local convention.
pub const LOCAL_ENV_VAR: &str = "EXTPACK_LOCAL";

/// Reload server port when extpack is consumed as a dependency.
pub const DEFAULT_PORT: u16 = 3000;

/// Reload server port while developing extpack itself.
pub const LOCAL_PORT: u16 = 8080;

/// Package name stamped into the generated client.
pub const PACKAGE_NAME: &str = "extpack";

/// Port and package name shared by the reload server and its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevEnvironment {
    pub port: u16,
    pub package: String,
}

impl DevEnvironment {
    /// Reads [`LOCAL_ENV_VAR`] from the process environment.
    pub fn from_env(root: &Path) -> Self {
        Self::select(std::env::var(LOCAL_ENV_VAR).ok().as_deref(), root)
    }

    /// Selects the convention for a raw variable value.
    ///
    /// Only the exact value `true` selects the local convention, whose
    /// package name is the project root itself.
    pub fn select(value: Option<&str>, root: &Path) -> Self {
        if value == Some("true") {
            Self {
                port: LOCAL_PORT,
                package: posix_path(root),
            }
        } else {
            Self {
                port: DEFAULT_PORT,
                package: PACKAGE_NAME.to_string(),
            }
        }
    }
}
