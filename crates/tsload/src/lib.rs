// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tsload
//!
//! On-demand TypeScript loading for Node-compatible runtimes.
//!
//! TypeScript sources run directly, with no precompilation step: the loader
//! intercepts the host runtime's module loading, transpiles matching files
//! on demand through a black-box compiler, and feeds the result back into
//! the normal module-execution path. Both of the runtime's module systems
//! are served:
//!
//! - **ESM** via an ordered resolve/load hook chain (`hooks::esm`), where
//!   `.ts` and `.mts` files are transpiled inline and extension-less or
//!   `.js`-suffixed imports are redirected to the real source file
//! - **CommonJS** via extension handlers and a filename-resolution override
//!   (`hooks::cjs`), where `.ts` and `.cts` files are compiled into the
//!   host's module records
//!
//! Whether a plain `.ts` file loads as CommonJS or ESM is decided once per
//! process: a forced format (CLI flag or environment) wins outright,
//! otherwise the nearest `package.json` above the working directory
//! declares the default.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tsload::{bootstrap, LoaderContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Arc::new(LoaderContext::new().expect("loader context"));
//!     let args = bootstrap::consume_force_flags(std::env::args().skip(1).collect(), &ctx);
//!
//!     let code = match bootstrap::select_strategy(host_supports_hooks()) {
//!         bootstrap::Strategy::InProcess => {
//!             bootstrap::boot(ctx, compiler(), bindings(), |hooks| run(hooks, args)).await
//!         }
//!         bootstrap::Strategy::Respawn => bootstrap::respawn(&ctx, &args),
//!     };
//!     std::process::exit(code);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod compiler;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod hooks;
pub mod host;
pub mod transpiler;
pub mod typescript;

// Re-exports
pub use context::{LoaderContext, ModuleFormat, FORCE_TYPE_ENV};
pub use error::{LoaderError, Result, ERR_REQUIRE_ESM, MODULE_NOT_FOUND};
pub use format::resolve_format;
pub use transpiler::Transpiler;
pub use typescript::{is_typescript_file, COMPILED_EXTENSIONS, TS_EXTENSIONS};

/// Version of the tsload crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Node.js API version the transpiler targets
pub const NODE_API_VERSION: &str = "20.0.0";
