// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The source-to-source compiler interface
//!
//! The actual TypeScript-to-JavaScript compiler is an external collaborator;
//! the loader only depends on this trait. Input is source text plus transform
//! options, output is transpiled text or a structured failure carrying
//! diagnostic messages.

use std::collections::HashMap;
use std::fmt;

/// Output dialect requested from the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// CommonJS output (`require`/`module.exports`)
    Cjs,
    /// ECMAScript module output (`import`/`export`)
    Esm,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Cjs => write!(f, "cjs"),
            OutputFormat::Esm => write!(f, "esm"),
        }
    }
}

/// Source map emission requested from the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMapKind {
    /// No source map
    None,
    /// Source map appended inline to the compiled output
    Inline,
}

/// Options for a single transform invocation
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Original filename of the source being transformed
    pub source_file: String,
    /// Output dialect
    pub format: OutputFormat,
    /// Source map emission
    pub source_map: SourceMapKind,
    /// Whether the source map embeds the original source text
    pub sources_content: bool,
    /// Whether insignificant whitespace is stripped from the output
    pub minify_whitespace: bool,
    /// Target runtime version, e.g. `node20.0.0`
    pub target: String,
    /// Compile-time identifier substitutions
    pub define: HashMap<String, String>,
    /// Text prepended verbatim to the compiled output
    pub banner: Option<String>,
}

/// Where in the source a compiler message points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLocation {
    /// Source file the message refers to
    pub file: String,
    /// One-based line number
    pub line: u32,
    /// Zero-based column number
    pub column: u32,
}

/// A single diagnostic message reported by the compiler
#[derive(Debug, Clone)]
pub struct CompilerMessage {
    /// Human-readable message text
    pub text: String,
    /// Source location, when the compiler could attribute one
    pub location: Option<MessageLocation>,
}

impl CompilerMessage {
    /// Create a message without a source location
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// Create a message pointing at a source location
    pub fn at(text: impl Into<String>, file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            text: text.into(),
            location: Some(MessageLocation {
                file: file.into(),
                line,
                column,
            }),
        }
    }
}

/// Successful transform result
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The compiled text, with any requested inline source map appended
    pub code: String,
    /// Non-fatal messages produced while compiling
    pub warnings: Vec<CompilerMessage>,
}

/// Structured transform failure
#[derive(Debug, Clone)]
pub struct TransformFailure {
    /// Fatal messages
    pub errors: Vec<CompilerMessage>,
    /// Non-fatal messages produced before the failure
    pub warnings: Vec<CompilerMessage>,
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) => write!(f, "Transform failed: {}", first.text),
            None => write!(f, "Transform failed"),
        }
    }
}

impl std::error::Error for TransformFailure {}

/// The black-box source compiler
pub trait Compiler: Send + Sync {
    /// Transform `source` according to `options`, synchronously.
    fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> std::result::Result<TransformOutput, TransformFailure>;
}
