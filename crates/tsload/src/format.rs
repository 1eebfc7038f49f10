// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Effective module format resolution
//!
//! Decides whether plain `.ts` files compile as CommonJS or ESM: a forced
//! format always wins, otherwise the nearest `package.json` above the
//! working directory declares the default via its `"type"` field.

use crate::context::{LoaderContext, ModuleFormat};
use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;

/// Minimal `package.json` structure for format detection
#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(rename = "type")]
    type_field: Option<String>,
}

/// Resolve the effective module format for the process.
///
/// `mode` tags log lines and errors with the module system asking for the
/// answer. The descriptor walk is cached on the context: the result is a
/// pure function of the forced format and the file tree, so two lookups
/// within one process agree unless the format is re-forced.
pub fn resolve_format(ctx: &LoaderContext, mode: ModuleFormat) -> Result<ModuleFormat> {
    if let Some(forced) = ctx.forced() {
        tracing::debug!(target: "tsload", %mode, %forced, "Using forced module format");
        return Ok(forced);
    }

    if let Some(cached) = ctx.cached() {
        return Ok(cached);
    }

    let format = walk_descriptors(ctx.cwd(), mode)?;
    ctx.set_cached(format);
    Ok(format)
}

/// Walk upward from `start`, returning the first recognized `"type"` field.
fn walk_descriptors(start: &Path, mode: ModuleFormat) -> Result<ModuleFormat> {
    let mut directory = start;

    loop {
        let descriptor = directory.join("package.json");

        match std::fs::read_to_string(&descriptor) {
            Ok(data) => {
                let parsed: PackageJson = serde_json::from_str(&data).map_err(|cause| {
                    LoaderError::config_with(
                        mode,
                        format!("Unable to read or parse \"{}\"", descriptor.display()),
                        cause,
                    )
                })?;

                match parsed.type_field.as_deref() {
                    None => {
                        tracing::debug!(
                            target: "tsload",
                            %mode,
                            descriptor = %descriptor.display(),
                            "Descriptor does not declare a default type",
                        );
                        return Ok(ModuleFormat::CommonJs);
                    }
                    Some(value) => match ModuleFormat::from_type_field(value) {
                        Some(format) => {
                            tracing::debug!(
                                target: "tsload",
                                %mode,
                                descriptor = %descriptor.display(),
                                %format,
                                "Descriptor declares default type",
                            );
                            return Ok(format);
                        }
                        None => {
                            tracing::debug!(
                                target: "tsload",
                                %mode,
                                descriptor = %descriptor.display(),
                                value,
                                "Descriptor specifies unknown type",
                            );
                            return Ok(ModuleFormat::CommonJs);
                        }
                    },
                }
            }
            // A missing descriptor means "ask the parent directory"; hitting
            // a directory named package.json is treated the same way.
            Err(error) if matches!(error.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {}
            Err(cause) => {
                return Err(LoaderError::config_with(
                    mode,
                    format!("Unable to read or parse \"{}\"", descriptor.display()),
                    cause,
                ));
            }
        }

        match directory.parent() {
            Some(parent) => directory = parent,
            None => {
                tracing::debug!(target: "tsload", %mode, "Module format defaulted to \"commonjs\"");
                return Ok(ModuleFormat::CommonJs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn context_at(dir: &Path) -> LoaderContext {
        LoaderContext::with_cwd(dir.to_path_buf()).unwrap()
    }

    fn write_descriptor(dir: &Path, body: &str) {
        std::fs::write(dir.join("package.json"), body).unwrap();
    }

    #[test]
    fn test_defaults_to_commonjs_without_descriptors() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = context_at(&nested);
        let format = resolve_format(&ctx, ModuleFormat::Esm).unwrap();
        assert_eq!(format, ModuleFormat::CommonJs);
    }

    #[test]
    fn test_reads_nearest_descriptor() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("pkg/src");
        std::fs::create_dir_all(&nested).unwrap();
        write_descriptor(&root.path().join("pkg"), r#"{ "type": "module" }"#);

        let ctx = context_at(&nested);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::CommonJs).unwrap(),
            ModuleFormat::Esm
        );
    }

    #[test]
    fn test_nearest_descriptor_shadows_ancestors() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("pkg");
        std::fs::create_dir_all(&nested).unwrap();
        write_descriptor(root.path(), r#"{ "type": "module" }"#);
        write_descriptor(&nested, r#"{ "type": "commonjs" }"#);

        let ctx = context_at(&nested);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::CommonJs
        );
    }

    #[test]
    fn test_unknown_type_defaults_to_commonjs() {
        let root = tempfile::tempdir().unwrap();
        write_descriptor(root.path(), r#"{ "type": "umd" }"#);

        let ctx = context_at(root.path());
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::CommonJs
        );
    }

    #[test]
    fn test_missing_type_field_defaults_to_commonjs() {
        let root = tempfile::tempdir().unwrap();
        write_descriptor(root.path(), r#"{ "name": "thing", "type": "module" }"#);
        let child = root.path().join("sub");
        std::fs::create_dir_all(&child).unwrap();
        write_descriptor(&child, r#"{ "name": "sub" }"#);

        // The nearest descriptor answers even without a "type" field.
        let ctx = context_at(&child);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::CommonJs
        );
    }

    #[test]
    fn test_malformed_descriptor_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        write_descriptor(root.path(), "{ not json");

        let ctx = context_at(root.path());
        let error = resolve_format(&ctx, ModuleFormat::CommonJs).unwrap_err();
        assert!(matches!(error, LoaderError::Config { .. }));
    }

    #[test]
    fn test_forced_format_wins_over_descriptors() {
        let root = tempfile::tempdir().unwrap();
        write_descriptor(root.path(), r#"{ "type": "commonjs" }"#);

        let ctx = context_at(root.path());
        ctx.force_format(ModuleFormat::Esm);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::CommonJs).unwrap(),
            ModuleFormat::Esm
        );
    }

    #[test]
    fn test_result_is_cached_per_process() {
        let root = tempfile::tempdir().unwrap();
        write_descriptor(root.path(), r#"{ "type": "module" }"#);

        let ctx = context_at(root.path());
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::Esm
        );

        // Rewriting the descriptor after the first lookup must not change
        // the answer within the same process.
        write_descriptor(root.path(), r#"{ "type": "commonjs" }"#);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::Esm
        );
    }

    #[test]
    fn test_package_json_directory_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("pkg");
        std::fs::create_dir_all(nested.join("package.json")).unwrap();
        write_descriptor(root.path(), r#"{ "type": "module" }"#);

        let ctx = context_at(&nested);
        assert_eq!(
            resolve_format(&ctx, ModuleFormat::Esm).unwrap(),
            ModuleFormat::Esm
        );
    }

    #[test]
    fn test_walk_ignores_cwd_helper() {
        // walk_descriptors is relative to the provided directory, not the
        // process working directory
        let format = walk_descriptors(&PathBuf::from("/"), ModuleFormat::CommonJs).unwrap();
        assert_eq!(format, ModuleFormat::CommonJs);
    }
}
