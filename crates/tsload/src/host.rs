// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Integration seams provided by the embedding runtime
//!
//! The loader does not implement a module system of its own; it participates
//! in the host runtime's. These traits are the four points where the host
//! plugs in: terminal ESM resolution and loading (the end of the hook
//! chain), classic filename resolution, and the classic compile-and-execute
//! step for a module record.

use crate::error::Result;
use crate::hooks::esm::{LoadContext, LoadOutcome, Resolution, ResolveContext};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Terminal stage of the ESM resolve chain: the host's own specifier
/// resolution, reached when every hook has delegated.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `specifier` to a module URL
    async fn resolve(&self, specifier: &str, context: &ResolveContext) -> Result<Resolution>;
}

/// Terminal stage of the ESM load chain: the host's own module loading.
#[async_trait]
pub trait HostLoader: Send + Sync {
    /// Load the module at `url`
    async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadOutcome>;
}

/// The host's built-in specifier-to-filename resolution for the classic
/// module system. Any override registered in its place must be fully
/// substitutable for it.
pub trait ClassicResolver: Send + Sync {
    /// Resolve a require request to an absolute filename
    fn resolve_filename(&self, request: &str, parent: Option<&ModuleRecord>) -> Result<PathBuf>;
}

/// The host's compile-and-execute step for a classic module record.
pub trait ClassicHost: Send + Sync {
    /// Compile `source` into `module` and execute it
    fn compile_classic(&self, module: &mut ModuleRecord, source: &str) -> Result<()>;
}

/// A classic module record, as handed to extension handlers
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Absolute filename of the module
    pub filename: PathBuf,
    /// Whether the module has finished loading
    pub loaded: bool,
}

impl ModuleRecord {
    /// Create a fresh, unloaded module record
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            loaded: false,
        }
    }

    /// The directory containing the module
    pub fn dirname(&self) -> &Path {
        self.filename.parent().unwrap_or(Path::new("."))
    }
}
