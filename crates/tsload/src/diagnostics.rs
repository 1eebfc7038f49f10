// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Rendering of compiler-reported errors and warnings

use crate::compiler::CompilerMessage;
use owo_colors::OwoColorize;
use std::io::Write;

/// Severity of a rendered compiler message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Fatal compiler error
    Error,
    /// Non-fatal compiler warning
    Warning,
}

/// Whether loader debug logging is enabled.
///
/// Gates the optional output of the pipeline: transpile warnings and the
/// per-file "Loaded" banner are only emitted in debug mode.
pub fn debug_enabled() -> bool {
    tracing::enabled!(target: "tsload", tracing::Level::DEBUG)
}

/// Render compiler messages to the error stream, colorized on a TTY.
pub fn report(kind: MessageKind, messages: &[CompilerMessage]) {
    if messages.is_empty() {
        return;
    }

    let stderr = std::io::stderr();
    let color = atty::is(atty::Stream::Stderr);
    let mut out = stderr.lock();

    for message in messages {
        let _ = writeln!(out, "{}", format_message(kind, message, color));
    }
}

fn format_message(kind: MessageKind, message: &CompilerMessage, color: bool) -> String {
    let label = match (kind, color) {
        (MessageKind::Error, true) => "error".red().bold().to_string(),
        (MessageKind::Error, false) => "error".to_string(),
        (MessageKind::Warning, true) => "warning".yellow().bold().to_string(),
        (MessageKind::Warning, false) => "warning".to_string(),
    };

    match &message.location {
        Some(loc) => {
            let place = format!("{}:{}:{}", loc.file, loc.line, loc.column);
            if color {
                format!("{}: {}: {}", place.dimmed(), label, message.text)
            } else {
                format!("{}: {}: {}", place, label, message.text)
            }
        }
        None => format!("{}: {}", label, message.text),
    }
}
