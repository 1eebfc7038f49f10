// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! TypeScript file extensions and on-disk probing helpers

use std::path::Path;

/// TypeScript source extensions handled by the loader
pub const TS_EXTENSIONS: &[&str] = &[".ts", ".mts", ".cts"];

/// Compiled-looking extensions that may be rewritten to their source form
pub const COMPILED_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs"];

/// Check if a path carries a TypeScript source extension.
///
/// Returns `true` for `.ts`, `.mts` and `.cts` files.
pub fn is_typescript_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts")
    )
}

/// Rewrite a compiled-looking suffix to its TypeScript source counterpart.
///
/// `./lib.js` becomes `./lib.ts`, `.mjs` maps to `.mts` and `.cjs` to
/// `.cts`. Returns `None` when the specifier does not end in a compiled
/// extension.
pub fn rewrite_compiled_suffix(specifier: &str) -> Option<String> {
    for (compiled, source) in [(".js", ".ts"), (".mjs", ".mts"), (".cjs", ".cts")] {
        if let Some(stem) = specifier.strip_suffix(compiled) {
            return Some(format!("{}{}", stem, source));
        }
    }
    None
}

/// Whether the given path exists and is a regular file
pub fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Whether the given path exists and is a directory
pub fn is_directory(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
