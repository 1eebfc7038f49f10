// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-integration surfaces
//!
//! Two surfaces, one per module system: an ordered resolve/load hook chain
//! for ESM, and extension handlers plus a filename-resolution override for
//! CommonJS.

pub mod cjs;
pub mod esm;

pub use cjs::{ExtensionHandler, ExtensionRegistry, ResolveOverride, TsExtensionHandler};
pub use esm::{
    HookChain, LoadContext, LoadFormat, LoadHook, LoadOutcome, ModuleSource, NextLoad,
    NextResolve, Resolution, ResolveContext, ResolveHook, TsLoadHook, TsResolveHook,
};
