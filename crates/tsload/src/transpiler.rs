// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Transpile invocation and format-specific output shaping

use crate::compiler::{Compiler, OutputFormat, SourceMapKind, TransformOptions};
use crate::context::ModuleFormat;
use crate::diagnostics::{self, MessageKind};
use crate::error::{LoaderError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Drives the black-box compiler with deterministic, format-derived options.
///
/// Transpilation is synchronous and never caches: every load recompiles the
/// file, and the file on disk is never modified.
pub struct Transpiler {
    compiler: Arc<dyn Compiler>,
}

impl Transpiler {
    /// Create a transpiler over the given compiler
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self { compiler }
    }

    /// Transpile the file at `path` to the requested module format.
    pub fn transpile(&self, path: &Path, format: ModuleFormat) -> Result<String> {
        tracing::debug!(
            target: "tsload",
            file = %path.display(),
            %format,
            "Transpiling",
        );

        let options = self.options_for(path, format);
        let source = std::fs::read_to_string(path)?;

        let output = match self.compiler.transform(&source, &options) {
            Ok(output) => output,
            Err(failure) => {
                diagnostics::report(MessageKind::Error, &failure.errors);
                diagnostics::report(MessageKind::Warning, &failure.warnings);
                return Err(LoaderError::transpile(format, path, failure));
            }
        };

        if diagnostics::debug_enabled() {
            diagnostics::report(MessageKind::Warning, &output.warnings);
        }

        Ok(output.code)
    }

    /// Build compiler options for one invocation.
    ///
    /// CommonJS output references the current file via `__filename`, ESM via
    /// `import.meta.url`; either is substituted for the `__fileurl` macro.
    fn options_for(&self, path: &Path, format: ModuleFormat) -> TransformOptions {
        let (output, fileurl) = match format {
            ModuleFormat::CommonJs => (OutputFormat::Cjs, "__filename"),
            ModuleFormat::Esm => (OutputFormat::Esm, "import.meta.url"),
        };

        let mut define = HashMap::new();
        define.insert("__fileurl".to_string(), fileurl.to_string());

        // Announce each loaded file on the debug stream. The banner uses the
        // dialect of the output format so it runs in either module system.
        let banner = if diagnostics::debug_enabled() {
            Some(match format {
                ModuleFormat::Esm => {
                    format!(";console.debug('[esm] Loaded \"%s\"', {});", fileurl)
                }
                ModuleFormat::CommonJs => {
                    format!(";console.debug('[cjs] Loaded \"%s\"', {});", fileurl)
                }
            })
        } else {
            None
        };

        TransformOptions {
            source_file: path.display().to_string(),
            format: output,
            source_map: SourceMapKind::Inline,
            sources_content: false,
            minify_whitespace: true,
            target: format!("node{}", crate::NODE_API_VERSION),
            define,
            banner,
        }
    }
}
