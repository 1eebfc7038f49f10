// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the loader pipeline

use crate::compiler::TransformFailure;
use crate::context::ModuleFormat;
use std::path::Path;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Machine-readable code for "required an ES module from CommonJS"
pub const ERR_REQUIRE_ESM: &str = "ERR_REQUIRE_ESM";

/// Machine-readable code for a failed module lookup
pub const MODULE_NOT_FOUND: &str = "MODULE_NOT_FOUND";

/// Errors that can occur in the loader pipeline
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Malformed descriptor, unreadable descriptor or invalid forced format
    #[error("{message}")]
    Config {
        /// Prefixed human-readable message
        message: String,
        /// Underlying read or parse failure, when there is one
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Module not found
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// A `.ts` file governed by the ESM format was fed to `require()`
    #[error("{message}")]
    RequireEsm {
        /// Prefixed human-readable message
        message: String,
    },

    /// The compiler rejected a source file
    #[error("{message}")]
    Transpile {
        /// Prefixed human-readable message
        message: String,
        /// The structured compiler failure
        #[source]
        cause: TransformFailure,
    },

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the `[ts-loader|cjs|pid=1234]` message prefix the original loader
/// stamps on every fatal error.
fn prefix(mode: Option<ModuleFormat>, message: &str) -> String {
    let tag = match mode {
        Some(ModuleFormat::CommonJs) => "cjs",
        Some(ModuleFormat::Esm) => "esm",
        None => "---",
    };
    format!("[ts-loader|{}|pid={}] {}", tag, std::process::id(), message)
}

impl LoaderError {
    /// Create a fatal configuration error tagged with the loading mode
    pub fn config(mode: ModuleFormat, message: impl AsRef<str>) -> Self {
        Self::Config {
            message: prefix(Some(mode), message.as_ref()),
            cause: None,
        }
    }

    /// Create a fatal configuration error carrying its originating cause
    pub fn config_with(
        mode: ModuleFormat,
        message: impl AsRef<str>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: prefix(Some(mode), message.as_ref()),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create the distinguished "must import, cannot require" error
    pub fn require_esm(path: &Path) -> Self {
        Self::RequireEsm {
            message: prefix(
                Some(ModuleFormat::CommonJs),
                &format!("Must use import to load ES module: {}", path.display()),
            ),
        }
    }

    /// Create a transpile failure wrapping the compiler's structured messages
    pub fn transpile(mode: ModuleFormat, path: &Path, cause: TransformFailure) -> Self {
        Self::Transpile {
            message: prefix(
                Some(mode),
                &format!("Error transpiling \"{}\"", path.display()),
            ),
            cause,
        }
    }

    /// Create a module not found error
    pub fn module_not_found(specifier: impl Into<String>) -> Self {
        Self::ModuleNotFound(specifier.into())
    }

    /// The machine-readable error code, for errors that carry one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::RequireEsm { .. } => Some(ERR_REQUIRE_ESM),
            Self::ModuleNotFound(_) => Some(MODULE_NOT_FOUND),
            _ => None,
        }
    }

    /// Whether this error is the recoverable "module not found" class
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModuleNotFound(_))
    }
}
