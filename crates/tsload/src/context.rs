// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared loader state: module formats and the process-wide forced format

use crate::error::{LoaderError, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Environment variable carrying a forced module format
pub const FORCE_TYPE_ENV: &str = "__TS_LOADER_FORCE_TYPE";

/// The two module formats a file can be compiled and loaded as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModuleFormat {
    /// CommonJS module (require/module.exports)
    #[serde(rename = "commonjs")]
    CommonJs,
    /// ECMAScript module (import/export)
    #[serde(rename = "module")]
    Esm,
}

impl ModuleFormat {
    /// Parse a `package.json` style format string
    pub fn from_type_field(value: &str) -> Option<Self> {
        match value {
            "commonjs" => Some(ModuleFormat::CommonJs),
            "module" => Some(ModuleFormat::Esm),
            _ => None,
        }
    }

    /// The `package.json` spelling for this format
    pub fn as_type_field(&self) -> &'static str {
        match self {
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Esm => "module",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFormat::CommonJs => write!(f, "cjs"),
            ModuleFormat::Esm => write!(f, "esm"),
        }
    }
}

/// Shared state threaded through every resolver, transpiler and hook call.
///
/// The forced format is the only cross-call mutable state in the pipeline:
/// set at most once while startup flags are consumed, read on every load.
pub struct LoaderContext {
    /// Forced module format, when one was requested
    forced: RwLock<Option<ModuleFormat>>,
    /// Cached result of the descriptor walk, valid until re-forced
    cached: RwLock<Option<ModuleFormat>>,
    /// Directory the descriptor walk starts from
    cwd: PathBuf,
}

impl LoaderContext {
    /// Create a context rooted at the current working directory, honoring
    /// the environment override when one is present.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::with_cwd(cwd)
    }

    /// Create a context rooted at an explicit directory
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let forced = match std::env::var(FORCE_TYPE_ENV) {
            Ok(value) => match ModuleFormat::from_type_field(&value) {
                Some(format) => {
                    tracing::debug!(%format, "Forcing type from environment");
                    Some(format)
                }
                None => {
                    return Err(LoaderError::config(
                        ModuleFormat::CommonJs,
                        format!("Invalid type \"{}\"", value),
                    ));
                }
            },
            Err(_) => None,
        };

        Ok(Self {
            forced: RwLock::new(forced),
            cached: RwLock::new(None),
            cwd,
        })
    }

    /// Force the effective module format for the rest of the process.
    ///
    /// Only called while startup flags are processed; a later call replaces
    /// the previous value and invalidates the cached descriptor walk.
    pub fn force_format(&self, format: ModuleFormat) {
        *self.forced.write() = Some(format);
        *self.cached.write() = None;
    }

    /// The forced format, if one was set
    pub fn forced(&self) -> Option<ModuleFormat> {
        *self.forced.read()
    }

    /// The cached descriptor-walk result, if one was computed
    pub(crate) fn cached(&self) -> Option<ModuleFormat> {
        *self.cached.read()
    }

    /// Record the descriptor-walk result for later lookups
    pub(crate) fn set_cached(&self, format: ModuleFormat) {
        *self.cached.write() = Some(format);
    }

    /// Directory the descriptor walk starts from
    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }
}
