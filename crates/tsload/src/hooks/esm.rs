// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The ESM hook chain: resolve and load stages
//!
//! An ordered middleware chain over the host's module system. Each hook may
//! short-circuit with its own result or delegate to the next stage; the
//! terminal stages are the host's own resolver and loader.
//!
//! The TypeScript hooks registered here never fabricate module content at
//! the resolve stage: resolution only rewrites the *spelling* of a request
//! (extension-less imports, deliberately `.js`-suffixed imports of `.ts`
//! sources) and hands it on. The load stage is where `.ts`/`.mts` sources
//! are transpiled; `.cts` and CommonJS-mode `.ts` files are flagged for the
//! classic extension handlers instead, since the classic format cannot carry
//! inline source through this channel.

use crate::context::{LoaderContext, ModuleFormat};
use crate::error::{LoaderError, Result};
use crate::format::resolve_format;
use crate::host::{HostLoader, HostResolver};
use crate::transpiler::Transpiler;
use crate::typescript::{is_directory, is_file, is_typescript_file, rewrite_compiled_suffix};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/* ========================================================================= *
 * CHAIN DATA MODEL                                                          *
 * ========================================================================= */

/// Context handed to every resolve hook
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// URL of the importing module, when there is one
    pub parent_url: Option<Url>,
    /// Export conditions in effect for this resolution
    pub conditions: Vec<String>,
}

impl ResolveContext {
    /// Context for an import issued by the module at `parent_url`
    pub fn with_parent(parent_url: Url) -> Self {
        Self {
            parent_url: Some(parent_url),
            conditions: Vec::new(),
        }
    }

    /// Context for a top-level resolution with no importer
    pub fn top_level() -> Self {
        Self {
            parent_url: None,
            conditions: Vec::new(),
        }
    }
}

/// Result of the resolve stage
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The resolved module URL
    pub url: Url,
    /// Module format, when resolution already determined it
    pub format: Option<ModuleFormat>,
    /// Whether later hooks were skipped
    pub short_circuit: bool,
}

/// Context handed to every load hook
#[derive(Debug, Clone, Default)]
pub struct LoadContext {
    /// Export conditions in effect for this load
    pub conditions: Vec<String>,
    /// Format hint carried over from resolution
    pub format: Option<ModuleFormat>,
}

/// Format of a loaded module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFormat {
    /// Host built-in module; the host supplies the content
    Builtin,
    /// CommonJS module; compiled by the classic extension handlers
    CommonJs,
    /// JSON module, carried as text
    Json,
    /// ECMAScript module, carried as text
    Module,
    /// WebAssembly module, carried as raw bytes
    Wasm,
}

/// Module content carried by a load outcome
#[derive(Debug, Clone)]
pub enum ModuleSource {
    /// Textual source
    Text(String),
    /// Raw binary content
    Bytes(Vec<u8>),
}

/// Result of the load stage
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Format the module must be executed as
    pub format: LoadFormat,
    /// Module content; presence is constrained by the format
    pub source: Option<ModuleSource>,
    /// Whether later hooks were skipped
    pub short_circuit: bool,
}

impl LoadOutcome {
    /// A short-circuiting CommonJS outcome. Carries no content: the classic
    /// extension handlers compile the file themselves.
    pub fn common_js() -> Self {
        Self {
            format: LoadFormat::CommonJs,
            source: None,
            short_circuit: true,
        }
    }

    /// A short-circuiting ESM outcome carrying compiled source text
    pub fn module(source: String) -> Self {
        Self {
            format: LoadFormat::Module,
            source: Some(ModuleSource::Text(source)),
            short_circuit: true,
        }
    }

    /// A short-circuiting JSON outcome carrying the raw text
    pub fn json(source: String) -> Self {
        Self {
            format: LoadFormat::Json,
            source: Some(ModuleSource::Text(source)),
            short_circuit: true,
        }
    }

    /// A built-in module outcome; the host supplies the content
    pub fn builtin() -> Self {
        Self {
            format: LoadFormat::Builtin,
            source: None,
            short_circuit: true,
        }
    }

    /// A WebAssembly outcome carrying raw bytes
    pub fn wasm(bytes: Vec<u8>) -> Self {
        Self {
            format: LoadFormat::Wasm,
            source: Some(ModuleSource::Bytes(bytes)),
            short_circuit: true,
        }
    }

    /// Enforce the format/content constraints: CommonJS and built-in
    /// outcomes must not carry content, module/JSON outcomes must carry
    /// text, WebAssembly outcomes must carry bytes.
    pub fn validate(&self) -> Result<()> {
        let ok = match self.format {
            LoadFormat::CommonJs | LoadFormat::Builtin => self.source.is_none(),
            LoadFormat::Module | LoadFormat::Json => {
                matches!(self.source, Some(ModuleSource::Text(_)))
            }
            LoadFormat::Wasm => matches!(self.source, Some(ModuleSource::Bytes(_))),
        };
        if ok {
            Ok(())
        } else {
            Err(LoaderError::config(
                ModuleFormat::Esm,
                format!("Invalid load outcome for format {:?}", self.format),
            ))
        }
    }
}

/* ========================================================================= *
 * HOOK TRAITS AND CHAIN                                                     *
 * ========================================================================= */

/// Remaining resolve stages after the current hook
pub struct NextResolve<'a> {
    hooks: &'a [Arc<dyn ResolveHook>],
    terminal: &'a dyn HostResolver,
}

impl NextResolve<'_> {
    /// Invoke the next resolve stage with a possibly revised specifier
    pub async fn call(&self, specifier: &str, context: &ResolveContext) -> Result<Resolution> {
        match self.hooks.split_first() {
            Some((hook, rest)) => {
                let next = NextResolve {
                    hooks: rest,
                    terminal: self.terminal,
                };
                hook.resolve(specifier, context, next).await
            }
            None => self.terminal.resolve(specifier, context).await,
        }
    }
}

/// Remaining load stages after the current hook
pub struct NextLoad<'a> {
    hooks: &'a [Arc<dyn LoadHook>],
    terminal: &'a dyn HostLoader,
}

impl NextLoad<'_> {
    /// Invoke the next load stage
    pub async fn call(&self, url: &Url, context: &LoadContext) -> Result<LoadOutcome> {
        match self.hooks.split_first() {
            Some((hook, rest)) => {
                let next = NextLoad {
                    hooks: rest,
                    terminal: self.terminal,
                };
                hook.load(url, context, next).await
            }
            None => self.terminal.load(url, context).await,
        }
    }
}

/// A participant in the resolve stage of the chain
#[async_trait]
pub trait ResolveHook: Send + Sync {
    /// Resolve `specifier`, either with an own result or by delegating to
    /// `next` (possibly with a revised specifier).
    async fn resolve(
        &self,
        specifier: &str,
        context: &ResolveContext,
        next: NextResolve<'_>,
    ) -> Result<Resolution>;
}

/// A participant in the load stage of the chain
#[async_trait]
pub trait LoadHook: Send + Sync {
    /// Load `url`, either with an own result or by delegating to `next`.
    async fn load(&self, url: &Url, context: &LoadContext, next: NextLoad<'_>)
        -> Result<LoadOutcome>;
}

/// The ordered hook chain over the host's resolver and loader
pub struct HookChain {
    resolve_hooks: Vec<Arc<dyn ResolveHook>>,
    load_hooks: Vec<Arc<dyn LoadHook>>,
    resolver: Arc<dyn HostResolver>,
    loader: Arc<dyn HostLoader>,
}

impl HookChain {
    /// Create a chain terminating at the host's own resolver and loader
    pub fn new(resolver: Arc<dyn HostResolver>, loader: Arc<dyn HostLoader>) -> Self {
        Self {
            resolve_hooks: Vec::new(),
            load_hooks: Vec::new(),
            resolver,
            loader,
        }
    }

    /// Register a resolve hook; hooks run in registration order
    pub fn register_resolve(&mut self, hook: Arc<dyn ResolveHook>) {
        self.resolve_hooks.push(hook);
    }

    /// Register a load hook; hooks run in registration order
    pub fn register_load(&mut self, hook: Arc<dyn LoadHook>) {
        self.load_hooks.push(hook);
    }

    /// Drive the full resolve stage for one import
    pub async fn resolve(&self, specifier: &str, context: &ResolveContext) -> Result<Resolution> {
        let next = NextResolve {
            hooks: &self.resolve_hooks,
            terminal: self.resolver.as_ref(),
        };
        next.call(specifier, context).await
    }

    /// Drive the full load stage for one module
    pub async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadOutcome> {
        let next = NextLoad {
            hooks: &self.load_hooks,
            terminal: self.loader.as_ref(),
        };
        let outcome = next.call(url, context).await?;
        outcome.validate()?;
        Ok(outcome)
    }
}

/* ========================================================================= *
 * TYPESCRIPT HOOKS                                                          *
 * ========================================================================= */

/// Resolve-stage hook that redirects extension-less or `.js`-suffixed
/// relative imports issued from TypeScript sources to the real `.ts` file
/// on disk.
pub struct TsResolveHook;

impl TsResolveHook {
    /// Whether this request is one the heuristics apply to: a relative
    /// specifier imported from a local TypeScript file.
    fn applies(specifier: &str, context: &ResolveContext) -> Option<std::path::PathBuf> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            return None;
        }
        let parent = context.parent_url.as_ref()?;
        if parent.scheme() != "file" {
            return None;
        }
        let parent_path = parent.to_file_path().ok()?;
        if !is_typescript_file(&parent_path) {
            return None;
        }
        let candidate = parent.join(specifier).ok()?.to_file_path().ok()?;
        Some(candidate)
    }
}

#[async_trait]
impl ResolveHook for TsResolveHook {
    async fn resolve(
        &self,
        specifier: &str,
        context: &ResolveContext,
        next: NextResolve<'_>,
    ) -> Result<Resolution> {
        let Some(candidate) = Self::applies(specifier, context) else {
            return next.call(specifier, context).await;
        };

        // Exact match always wins: the file the import names is really there.
        if is_file(&candidate) {
            return next.call(specifier, context).await;
        }

        // A compiled-looking suffix may name a source file that only exists
        // in its TypeScript spelling.
        if let (Some(specifier_ts), Some(candidate_ts)) = (
            rewrite_compiled_suffix(specifier),
            rewrite_compiled_suffix(&candidate.to_string_lossy()),
        ) {
            if is_file(Path::new(&candidate_ts)) {
                tracing::debug!(
                    target: "tsload",
                    from = specifier,
                    to = %specifier_ts,
                    "Resolved import via suffix substitution",
                );
                return next.call(&specifier_ts, context).await;
            }
        }

        // Extension-less import of a sibling source file.
        let appended = format!("{}.ts", candidate.to_string_lossy());
        if is_file(Path::new(&appended)) {
            let specifier_ts = format!("{}.ts", specifier);
            tracing::debug!(
                target: "tsload",
                from = specifier,
                to = %specifier_ts,
                "Resolved import by appending source suffix",
            );
            return next.call(&specifier_ts, context).await;
        }

        // Directory import with a TypeScript index file.
        if is_directory(&candidate) && is_file(&candidate.join("index.ts")) {
            let specifier_ts = format!("{}/index.ts", specifier.trim_end_matches('/'));
            tracing::debug!(
                target: "tsload",
                from = specifier,
                to = %specifier_ts,
                "Resolved import to directory index",
            );
            return next.call(&specifier_ts, context).await;
        }

        // Nothing matched: let the host report its own resolution error.
        next.call(specifier, context).await
    }
}

/// Load-stage hook that transpiles TypeScript sources on demand.
pub struct TsLoadHook {
    ctx: Arc<LoaderContext>,
    transpiler: Arc<Transpiler>,
}

impl TsLoadHook {
    /// Create the load hook over the shared context and transpiler
    pub fn new(ctx: Arc<LoaderContext>, transpiler: Arc<Transpiler>) -> Self {
        Self { ctx, transpiler }
    }
}

#[async_trait]
impl LoadHook for TsLoadHook {
    async fn load(
        &self,
        url: &Url,
        context: &LoadContext,
        next: NextLoad<'_>,
    ) -> Result<LoadOutcome> {
        if url.scheme() != "file" {
            return next.call(url, context).await;
        }
        let Ok(path) = url.to_file_path() else {
            return next.call(url, context).await;
        };

        match path.extension().and_then(|e| e.to_str()) {
            // Always CommonJS: flag it for the classic extension handlers.
            Some("cts") => Ok(LoadOutcome::common_js()),

            Some("ts") => {
                if resolve_format(&self.ctx, ModuleFormat::Esm)? == ModuleFormat::CommonJs {
                    return Ok(LoadOutcome::common_js());
                }
                let code = self.transpiler.transpile(&path, ModuleFormat::Esm)?;
                Ok(LoadOutcome::module(code))
            }

            Some("mts") => {
                let code = self.transpiler.transpile(&path, ModuleFormat::Esm)?;
                Ok(LoadOutcome::module(code))
            }

            _ => next.call(url, context).await,
        }
    }
}
