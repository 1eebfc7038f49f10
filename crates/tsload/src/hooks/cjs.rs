// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The CommonJS integration surface
//!
//! Two responsibilities registered against the classic module system: file
//! extension handlers for `.ts` and `.cts` (the `require.extensions`
//! analogue), and an override of the host's filename resolution that retries
//! a failed `.js`-suffixed lookup with the matching TypeScript suffix.

use crate::context::{LoaderContext, ModuleFormat};
use crate::error::Result;
use crate::format::resolve_format;
use crate::host::{ClassicHost, ClassicResolver, ModuleRecord};
use crate::transpiler::Transpiler;
use crate::typescript::rewrite_compiled_suffix;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A handler compiling files of one extension into a classic module record
pub trait ExtensionHandler: Send + Sync {
    /// Compile the file at `filename` into `module`
    fn compile(&self, module: &mut ModuleRecord, filename: &Path) -> Result<()>;
}

/// Registry of extension handlers, keyed by extension without the dot
#[derive(Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<String, Arc<dyn ExtensionHandler>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an extension (`"ts"`, not `".ts"`)
    pub fn register(&mut self, extension: impl Into<String>, handler: Arc<dyn ExtensionHandler>) {
        self.handlers.insert(extension.into(), handler);
    }

    /// The handler for an extension, if one is registered
    pub fn get(&self, extension: &str) -> Option<Arc<dyn ExtensionHandler>> {
        self.handlers.get(extension).cloned()
    }

    /// Dispatch a module to the handler for its filename extension
    pub fn handle(&self, module: &mut ModuleRecord, filename: &Path) -> Result<bool> {
        let Some(extension) = filename.extension().and_then(|e| e.to_str()) else {
            return Ok(false);
        };
        match self.get(extension) {
            Some(handler) => {
                handler.compile(module, filename)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// The TypeScript extension handler, serving both `.ts` and `.cts`
pub struct TsExtensionHandler {
    ctx: Arc<LoaderContext>,
    transpiler: Arc<Transpiler>,
    host: Arc<dyn ClassicHost>,
}

impl TsExtensionHandler {
    /// Create the handler over the shared context, transpiler and host
    pub fn new(
        ctx: Arc<LoaderContext>,
        transpiler: Arc<Transpiler>,
        host: Arc<dyn ClassicHost>,
    ) -> Self {
        Self {
            ctx,
            transpiler,
            host,
        }
    }

    /// Register this handler for the `.ts` and `.cts` extensions
    pub fn install(self: Arc<Self>, registry: &mut ExtensionRegistry) {
        registry.register("ts", self.clone());
        registry.register("cts", self);
    }
}

impl ExtensionHandler for TsExtensionHandler {
    fn compile(&self, module: &mut ModuleRecord, filename: &Path) -> Result<()> {
        // A plain .ts file governed by the ESM format cannot come through
        // require(); reject before any compile attempt so callers can detect
        // the condition by its code.
        if filename.extension().and_then(|e| e.to_str()) == Some("ts")
            && resolve_format(&self.ctx, ModuleFormat::CommonJs)? == ModuleFormat::Esm
        {
            return Err(crate::error::LoaderError::require_esm(filename));
        }

        let code = self.transpiler.transpile(filename, ModuleFormat::CommonJs)?;

        // Execution errors surface here with the module record possibly
        // partially initialized; log them instead of unwinding the require.
        match self.host.compile_classic(module, &code) {
            Ok(()) => {
                module.loaded = true;
                Ok(())
            }
            Err(error) => {
                tracing::error!(
                    target: "tsload",
                    file = %filename.display(),
                    %error,
                    "Error executing compiled module",
                );
                Ok(())
            }
        }
    }
}

/// Override of the host's filename resolution.
///
/// Fully substitutable for the wrapped resolver: the original resolution is
/// always tried first, and its error is what callers see whenever the retry
/// does not pan out.
pub struct ResolveOverride {
    inner: Arc<dyn ClassicResolver>,
}

impl ResolveOverride {
    /// Wrap the host's built-in resolver
    pub fn new(inner: Arc<dyn ClassicResolver>) -> Self {
        Self { inner }
    }
}

impl ClassicResolver for ResolveOverride {
    fn resolve_filename(&self, request: &str, parent: Option<&ModuleRecord>) -> Result<PathBuf> {
        let original = match self.inner.resolve_filename(request, parent) {
            Ok(path) => return Ok(path),
            Err(error) => error,
        };

        if parent.is_some() && original.is_not_found() {
            if let Some(rewritten) = rewrite_compiled_suffix(request) {
                if let Ok(path) = self.inner.resolve_filename(&rewritten, parent) {
                    tracing::debug!(
                        target: "tsload",
                        from = request,
                        to = %rewritten,
                        "Resolved require via suffix substitution",
                    );
                    return Ok(path);
                }
            }
        }

        // The retry's failure is intentionally discarded: the original error
        // is what the caller asked about.
        Err(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Compiler, TransformFailure, TransformOptions, TransformOutput};
    use crate::error::{LoaderError, ERR_REQUIRE_ESM};
    use parking_lot::Mutex;

    struct StripCompiler {
        calls: Mutex<usize>,
    }

    impl StripCompiler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(0),
            })
        }
    }

    impl Compiler for StripCompiler {
        fn transform(
            &self,
            source: &str,
            _options: &TransformOptions,
        ) -> std::result::Result<TransformOutput, TransformFailure> {
            *self.calls.lock() += 1;
            Ok(TransformOutput {
                code: source.to_string(),
                warnings: vec![],
            })
        }
    }

    /// Classic host double that records or rejects compilation
    struct FakeHost {
        fail: bool,
        compiled: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                compiled: Mutex::new(Vec::new()),
            })
        }
    }

    impl ClassicHost for FakeHost {
        fn compile_classic(&self, _module: &mut ModuleRecord, source: &str) -> Result<()> {
            if self.fail {
                return Err(LoaderError::module_not_found("exploded during execution"));
            }
            self.compiled.lock().push(source.to_string());
            Ok(())
        }
    }

    /// Resolver double backed by a fixed table
    struct TableResolver {
        known: Vec<(String, PathBuf)>,
    }

    impl ClassicResolver for TableResolver {
        fn resolve_filename(
            &self,
            request: &str,
            _parent: Option<&ModuleRecord>,
        ) -> Result<PathBuf> {
            self.known
                .iter()
                .find(|(k, _)| k == request)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| LoaderError::module_not_found(request))
        }
    }

    fn handler_in(dir: &Path, compiler: Arc<StripCompiler>, host: Arc<FakeHost>) -> TsExtensionHandler {
        let ctx = Arc::new(LoaderContext::with_cwd(dir.to_path_buf()).unwrap());
        TsExtensionHandler::new(ctx, Arc::new(Transpiler::new(compiler)), host)
    }

    #[test]
    fn test_require_esm_rejected_before_compile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{ "type": "module" }"#).unwrap();
        let file = dir.path().join("lib.ts");
        std::fs::write(&file, "export const x = 1\n").unwrap();

        let compiler = StripCompiler::new();
        let handler = handler_in(dir.path(), compiler.clone(), FakeHost::new(false));

        let mut module = ModuleRecord::new(&file);
        let error = handler.compile(&mut module, &file).unwrap_err();
        assert_eq!(error.code(), Some(ERR_REQUIRE_ESM));
        assert_eq!(*compiler.calls.lock(), 0);
        assert!(!module.loaded);
    }

    #[test]
    fn test_cts_compiles_even_in_esm_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{ "type": "module" }"#).unwrap();
        let file = dir.path().join("tool.cts");
        std::fs::write(&file, "const x: number = 1\n").unwrap();

        let host = FakeHost::new(false);
        let handler = handler_in(dir.path(), StripCompiler::new(), host.clone());

        let mut module = ModuleRecord::new(&file);
        handler.compile(&mut module, &file).unwrap();
        assert!(module.loaded);
        assert_eq!(host.compiled.lock().len(), 1);
    }

    #[test]
    fn test_execution_error_logged_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.ts");
        std::fs::write(&file, "const x = 1\n").unwrap();

        let handler = handler_in(dir.path(), StripCompiler::new(), FakeHost::new(true));

        let mut module = ModuleRecord::new(&file);
        // The host blew up executing the compiled text; compile() swallows it.
        handler.compile(&mut module, &file).unwrap();
        assert!(!module.loaded);
    }

    #[test]
    fn test_registry_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.ts");
        std::fs::write(&file, "const x = 1\n").unwrap();

        let handler = Arc::new(handler_in(dir.path(), StripCompiler::new(), FakeHost::new(false)));
        let mut registry = ExtensionRegistry::new();
        handler.install(&mut registry);

        assert!(registry.get("ts").is_some());
        assert!(registry.get("cts").is_some());
        assert!(registry.get("js").is_none());

        let mut module = ModuleRecord::new(&file);
        assert!(registry.handle(&mut module, &file).unwrap());
        assert!(!registry
            .handle(&mut module, Path::new("/app/plain.js"))
            .unwrap());
    }

    #[test]
    fn test_override_retries_rewritten_suffix() {
        let resolver = ResolveOverride::new(Arc::new(TableResolver {
            known: vec![("./lib.ts".to_string(), PathBuf::from("/app/lib.ts"))],
        }));

        let parent = ModuleRecord::new("/app/main.ts");
        let path = resolver.resolve_filename("./lib.js", Some(&parent)).unwrap();
        assert_eq!(path, PathBuf::from("/app/lib.ts"));
    }

    #[test]
    fn test_override_reraises_original_error() {
        let resolver = ResolveOverride::new(Arc::new(TableResolver { known: vec![] }));

        let parent = ModuleRecord::new("/app/main.ts");
        let error = resolver
            .resolve_filename("./gone.js", Some(&parent))
            .unwrap_err();
        // The retry for ./gone.ts also failed; the original request's error
        // is the one surfaced.
        match error {
            LoaderError::ModuleNotFound(request) => assert_eq!(request, "./gone.js"),
            other => panic!("expected ModuleNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_override_without_parent_does_not_retry() {
        let resolver = ResolveOverride::new(Arc::new(TableResolver {
            known: vec![("./lib.ts".to_string(), PathBuf::from("/app/lib.ts"))],
        }));

        let error = resolver.resolve_filename("./lib.js", None).unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_override_ignores_non_compiled_suffix() {
        let resolver = ResolveOverride::new(Arc::new(TableResolver {
            known: vec![("./data.ts".to_string(), PathBuf::from("/app/data.ts"))],
        }));

        let parent = ModuleRecord::new("/app/main.ts");
        let error = resolver
            .resolve_filename("./data.json", Some(&parent))
            .unwrap_err();
        assert!(error.is_not_found());
    }

    #[test]
    fn test_override_passes_through_success() {
        let resolver = ResolveOverride::new(Arc::new(TableResolver {
            known: vec![("./lib.js".to_string(), PathBuf::from("/app/lib.js"))],
        }));

        let parent = ModuleRecord::new("/app/main.ts");
        let path = resolver.resolve_filename("./lib.js", Some(&parent)).unwrap();
        assert_eq!(path, PathBuf::from("/app/lib.js"));
    }
}
