// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bootstrap: install the hooks before any user file loads
//!
//! Two terminal branches. When the host supports in-process hook
//! registration, the ESM chain and the classic handlers are wired into the
//! current process and the user callback runs under a crash guard. When it
//! does not, the process re-invokes itself with hook-enabling flags and the
//! parent becomes a minimal lifecycle proxy for the child: exit code
//! propagated verbatim, signal termination and spawn errors mapped to a
//! failure code.

use crate::compiler::Compiler;
use crate::context::{LoaderContext, ModuleFormat};
use crate::error::Result;
use crate::hooks::cjs::{ExtensionRegistry, ResolveOverride, TsExtensionHandler};
use crate::hooks::esm::{HookChain, TsLoadHook, TsResolveHook};
use crate::host::{ClassicHost, ClassicResolver, HostLoader, HostResolver};
use crate::transpiler::Transpiler;
use std::future::Future;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for a failed callback, child error or signal termination
pub const EXIT_FAILURE: i32 = 1;
/// Exit code used by the watchdog when the process lingers after a failure
pub const EXIT_WATCHDOG: i32 = 2;

/// Grace period before the watchdog forcibly terminates the process
pub const WATCHDOG_GRACE: Duration = Duration::from_secs(5);

/// Flag forcing the CommonJS module format
pub const FLAG_FORCE_CJS: &str = "--force-cjs";
/// Flag forcing the ESM module format
pub const FLAG_FORCE_ESM: &str = "--force-esm";

/// Flag enabling the ESM hook chain in a respawned child
pub const FLAG_REGISTER_ESM: &str = "--register-esm-hooks";
/// Flag preloading the classic hooks in a respawned child
pub const FLAG_PRELOAD_CJS: &str = "--preload-cjs-hooks";

/// Environment marker for the parent/child control channel
pub const CONTROL_CHANNEL_ENV: &str = "__TS_LOADER_IPC";

/// How hooks can be installed in this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Hooks can be registered in the current process
    InProcess,
    /// The process must relaunch itself with hook-enabling flags
    Respawn,
}

/// Pick the bootstrap branch from the host's capability probe
pub fn select_strategy(in_process_hooks_available: bool) -> Strategy {
    if in_process_hooks_available {
        Strategy::InProcess
    } else {
        Strategy::Respawn
    }
}

/// Strip any force flags from `args`, translating each into the forced
/// format before user code runs. Returns the remaining arguments.
pub fn consume_force_flags(args: Vec<String>, ctx: &LoaderContext) -> Vec<String> {
    args.into_iter()
        .filter(|arg| match arg.as_str() {
            FLAG_FORCE_CJS => {
                ctx.force_format(ModuleFormat::CommonJs);
                false
            }
            FLAG_FORCE_ESM => {
                ctx.force_format(ModuleFormat::Esm);
                false
            }
            _ => true,
        })
        .collect()
}

/// Arguments that enable the hooks in a spawned child, including the
/// forced-format flag when one is in effect, so children stay consistent
/// with this process.
pub fn hook_args(ctx: &LoaderContext) -> Vec<String> {
    let mut args = vec![FLAG_REGISTER_ESM.to_string(), FLAG_PRELOAD_CJS.to_string()];
    match ctx.forced() {
        Some(ModuleFormat::CommonJs) => args.push(FLAG_FORCE_CJS.to_string()),
        Some(ModuleFormat::Esm) => args.push(FLAG_FORCE_ESM.to_string()),
        None => {}
    }
    args
}

/// The host seams the bootstrap wires the hooks into
pub struct HostBindings {
    /// Terminal ESM resolution
    pub esm_resolver: Arc<dyn HostResolver>,
    /// Terminal ESM loading
    pub esm_loader: Arc<dyn HostLoader>,
    /// Built-in classic filename resolution
    pub classic_resolver: Arc<dyn ClassicResolver>,
    /// Classic compile-and-execute step
    pub classic_host: Arc<dyn ClassicHost>,
}

/// The installed hook surfaces, handed to the user callback
pub struct LoaderHooks {
    /// The ESM resolve/load chain
    pub chain: HookChain,
    /// The classic extension handlers
    pub extensions: ExtensionRegistry,
    /// The classic filename-resolution override
    pub resolver: ResolveOverride,
}

/// Wire the ESM hook chain and the classic hooks (bootstrap branch 1).
pub fn install(
    ctx: Arc<LoaderContext>,
    compiler: Arc<dyn Compiler>,
    host: HostBindings,
) -> LoaderHooks {
    let transpiler = Arc::new(Transpiler::new(compiler));

    let mut chain = HookChain::new(host.esm_resolver, host.esm_loader);
    chain.register_resolve(Arc::new(TsResolveHook));
    chain.register_load(Arc::new(TsLoadHook::new(ctx.clone(), transpiler.clone())));

    let mut extensions = ExtensionRegistry::new();
    Arc::new(TsExtensionHandler::new(
        ctx,
        transpiler,
        host.classic_host,
    ))
    .install(&mut extensions);

    let resolver = ResolveOverride::new(host.classic_resolver);

    tracing::debug!(target: "tsload", "Loader hooks installed");

    LoaderHooks {
        chain,
        extensions,
        resolver,
    }
}

/// Run the user callback with hooks installed in-process.
///
/// On an uncaught failure from the callback the error is logged, the
/// watchdog is armed, and the failure exit code is returned; if the process
/// has not exited naturally within the grace period the watchdog terminates
/// it with the escalation code. Normal exit cancels the watchdog implicitly.
pub async fn boot<F, Fut>(
    ctx: Arc<LoaderContext>,
    compiler: Arc<dyn Compiler>,
    host: HostBindings,
    callback: F,
) -> i32
where
    F: FnOnce(LoaderHooks) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let hooks = install(ctx, compiler, host);

    match callback(hooks).await {
        Ok(()) => EXIT_OK,
        Err(error) => {
            tracing::error!(target: "tsload", %error, "Uncaught error from main callback");
            arm_watchdog(WATCHDOG_GRACE);
            EXIT_FAILURE
        }
    }
}

/// Relaunch the current executable with hook-enabling flags and supervise
/// the child (bootstrap branch 2). Returns the exit code the parent should
/// terminate with.
pub fn respawn(ctx: &LoaderContext, args: &[String]) -> i32 {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(error) => {
            tracing::error!(target: "tsload", %error, "Unable to locate current executable");
            return EXIT_FAILURE;
        }
    };

    let mut command = Command::new(exe);
    command
        .args(hook_args(ctx))
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .env(CONTROL_CHANNEL_ENV, "1");

    supervise(command)
}

/// Run a prepared child command to completion and map its termination to
/// the exit code the parent should terminate with: the child's own exit
/// code verbatim, the failure code when the child was killed by a signal
/// or could not be spawned at all.
pub fn supervise(mut command: Command) -> i32 {
    match command.status() {
        Ok(status) => match status.code() {
            Some(code) => code,
            None => {
                #[cfg(unix)]
                {
                    use std::os::unix::process::ExitStatusExt;
                    tracing::error!(
                        target: "tsload",
                        signal = status.signal().unwrap_or_default(),
                        "Child process terminated by signal",
                    );
                }
                EXIT_FAILURE
            }
        },
        Err(error) => {
            tracing::error!(target: "tsload", %error, "Unable to spawn child process");
            EXIT_FAILURE
        }
    }
}

/// Arm the post-failure watchdog: terminate the process with the escalation
/// code if it is still alive once the grace period elapses.
fn arm_watchdog(grace: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(grace);
        eprintln!(
            "[ts-loader|---|pid={}] Process did not exit within {:?}, terminating",
            std::process::id(),
            grace,
        );
        std::process::exit(EXIT_WATCHDOG);
    });
}
