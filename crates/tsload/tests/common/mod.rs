// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared test doubles: a counting type-stripping compiler and minimal host
//! implementations backed by the real file system.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tsload::compiler::{Compiler, TransformFailure, TransformOptions, TransformOutput};
use tsload::error::{LoaderError, Result};
use tsload::hooks::esm::{LoadContext, LoadFormat, LoadOutcome, ModuleSource, Resolution, ResolveContext};
use tsload::host::{ClassicHost, ClassicResolver, HostLoader, HostResolver, ModuleRecord};
use url::Url;

/// Compiler double that strips the annotations used in test fixtures and
/// records every file it was asked to transform.
pub struct CountingCompiler {
    pub transformed: Mutex<Vec<String>>,
}

impl CountingCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            transformed: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.transformed.lock().len()
    }
}

impl Compiler for CountingCompiler {
    fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> std::result::Result<TransformOutput, TransformFailure> {
        self.transformed.lock().push(options.source_file.clone());
        let mut code = source.replace(": number", "").replace(": string", "");
        if let Some(banner) = &options.banner {
            code = format!("{}\n{}", banner, code);
        }
        Ok(TransformOutput {
            code,
            warnings: vec![],
        })
    }
}

/// Terminal ESM resolver: joins the specifier against the parent URL and
/// fails like the host would when the file is not on disk.
pub struct FsResolver;

#[async_trait]
impl HostResolver for FsResolver {
    async fn resolve(&self, specifier: &str, context: &ResolveContext) -> Result<Resolution> {
        let url = match &context.parent_url {
            Some(parent) => parent
                .join(specifier)
                .map_err(|_| LoaderError::module_not_found(specifier))?,
            None => Url::parse(specifier)
                .map_err(|_| LoaderError::module_not_found(specifier))?,
        };

        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| LoaderError::module_not_found(specifier))?;
            if !path.is_file() {
                return Err(LoaderError::module_not_found(specifier));
            }
        }

        Ok(Resolution {
            url,
            format: None,
            short_circuit: false,
        })
    }
}

/// Terminal ESM loader: reads the file as-is.
pub struct FsLoader;

#[async_trait]
impl HostLoader for FsLoader {
    async fn load(&self, url: &Url, _context: &LoadContext) -> Result<LoadOutcome> {
        let path = url
            .to_file_path()
            .map_err(|_| LoaderError::module_not_found(url.as_str()))?;
        let source = std::fs::read_to_string(&path)?;
        Ok(LoadOutcome {
            format: LoadFormat::Module,
            source: Some(ModuleSource::Text(source)),
            short_circuit: false,
        })
    }
}

/// Classic resolver double: resolves relative requests against the parent
/// directory, succeeding only on exact on-disk matches.
pub struct ClassicFsResolver;

impl ClassicResolver for ClassicFsResolver {
    fn resolve_filename(&self, request: &str, parent: Option<&ModuleRecord>) -> Result<PathBuf> {
        let path = if Path::new(request).is_absolute() {
            PathBuf::from(request)
        } else {
            match parent {
                Some(parent) => parent.dirname().join(request),
                None => return Err(LoaderError::module_not_found(request)),
            }
        };

        if path.is_file() {
            Ok(path)
        } else {
            Err(LoaderError::module_not_found(request))
        }
    }
}

/// Classic host double that records every compiled module body.
pub struct ExecutingHost {
    pub executed: Mutex<Vec<(PathBuf, String)>>,
}

impl ExecutingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            executed: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.executed.lock().len()
    }
}

impl ClassicHost for ExecutingHost {
    fn compile_classic(&self, module: &mut ModuleRecord, source: &str) -> Result<()> {
        self.executed
            .lock()
            .push((module.filename.clone(), source.to_string()));
        Ok(())
    }
}

/// Install the process-wide log subscriber, honoring `RUST_LOG`. Later
/// calls are no-ops, so every test can call this unconditionally.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tsload=warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Convenience: file URL for a path
pub fn file_url(path: &Path) -> Url {
    Url::from_file_path(path).unwrap()
}

/// Convenience: write a fixture file, creating parent directories
pub fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}
